use crate::ContentArgs;
use crate::commands::stack;
use crate::context::Context;
use crate::flash::Flash;
use anyhow::Context as _;
use colored::Colorize;
use stackport_cloud::{ContentSource, SiteDetails, SiteKind, SiteParams};
use std::process::ExitCode;

pub async fn list(ctx: &Context, owner: Option<&str>, json: bool) -> anyhow::Result<ExitCode> {
    stack::list(ctx, &SiteKind, owner, json).await
}

pub async fn show(ctx: &Context, name: &str) -> anyhow::Result<ExitCode> {
    stack::show(ctx, &SiteKind, name).await
}

pub async fn delete(ctx: &Context, name: &str) -> anyhow::Result<ExitCode> {
    stack::delete(ctx, &SiteKind, name).await
}

pub async fn create(
    ctx: &Context,
    name: &str,
    args: ContentArgs,
    owner: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let Some(source) = content_source(args).await? else {
        anyhow::bail!("Site content is required: pass --content, --content-file or --content-url");
    };

    let content = match ctx.fetcher().resolve(&source).await {
        Ok(content) => content,
        Err(e) => return Ok(Flash::failure("Site", &e).print()),
    };

    println!("{}", format!("Creating site '{}'...", name).yellow());
    let flash = match ctx
        .orchestrator()
        .create(&SiteKind, name, &SiteParams::new(content), owner)
        .await
    {
        Ok(summary) => Flash::success(format!(
            "Site '{}' created at {}",
            name,
            summary.url.as_deref().unwrap_or("-")
        )),
        Err(e) => Flash::failure("Site", &e),
    };
    Ok(flash.print())
}

pub async fn update(
    ctx: &Context,
    name: &str,
    args: ContentArgs,
    owner: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let content = match content_source(args).await? {
        Some(source) => match ctx.fetcher().resolve(&source).await {
            Ok(content) => content,
            Err(e) => return Ok(Flash::failure("Site", &e).print()),
        },
        // Re-apply the last content
        None => match ctx.orchestrator().show(&SiteKind, name).await {
            Ok(details) => match last_content(details) {
                Some(content) => content,
                None => {
                    return Ok(Flash::Danger(format!(
                        "Site '{}' has no recorded content: pass --content, --content-file or --content-url",
                        name
                    ))
                    .print());
                }
            },
            Err(e) => return Ok(Flash::failure("Site", &e).print()),
        },
    };

    println!("{}", format!("Updating site '{}'...", name).yellow());
    let flash = match ctx
        .orchestrator()
        .update(&SiteKind, name, &SiteParams::new(content), owner)
        .await
    {
        Ok(_) => Flash::success(format!("Site '{}' updated", name)),
        Err(e) => Flash::failure("Site", &e),
    };
    Ok(flash.print())
}

/// Content to re-apply when an update gives none
fn last_content(details: SiteDetails) -> Option<String> {
    details.content.filter(|c| !c.trim().is_empty())
}

/// Turn the content flags into a source; `None` when no flag was given
async fn content_source(args: ContentArgs) -> anyhow::Result<Option<ContentSource>> {
    let inline = match (args.content, args.content_file) {
        (Some(content), _) => Some(content),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    if inline.is_none() && args.content_url.is_none() {
        return Ok(None);
    }
    Ok(Some(ContentSource::from_form(inline, args.content_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_content_requires_recorded_content() {
        let details = |content: Option<&str>| SiteDetails {
            content: content.map(str::to_string),
            website_url: Some("demo.s3-website.example.com".to_string()),
        };

        assert_eq!(
            last_content(details(Some("<h1>v1</h1>"))).as_deref(),
            Some("<h1>v1</h1>")
        );
        assert!(last_content(details(None)).is_none());
        assert!(last_content(details(Some("  "))).is_none());
    }

    #[tokio::test]
    async fn test_content_source_none() {
        let source = content_source(ContentArgs::default()).await.unwrap();
        assert!(source.is_none());
    }

    #[tokio::test]
    async fn test_content_source_url_wins() {
        let args = ContentArgs {
            content: Some("<p>inline</p>".to_string()),
            content_url: Some("https://example.com/".to_string()),
            ..Default::default()
        };

        let source = content_source(args).await.unwrap();
        assert_eq!(
            source,
            Some(ContentSource::Url("https://example.com/".to_string()))
        );
    }

    #[tokio::test]
    async fn test_content_source_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.html");
        std::fs::write(&path, "<h1>from file</h1>").unwrap();

        let args = ContentArgs {
            content_file: Some(path),
            ..Default::default()
        };

        let source = content_source(args).await.unwrap();
        assert_eq!(
            source,
            Some(ContentSource::Inline("<h1>from file</h1>".to_string()))
        );
    }

    #[tokio::test]
    async fn test_content_source_missing_file() {
        let args = ContentArgs {
            content_file: Some("/nonexistent/index.html".into()),
            ..Default::default()
        };

        let err = content_source(args).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/index.html"));
    }
}
