use crate::VmArgs;
use crate::commands::stack;
use crate::context::Context;
use crate::flash::Flash;
use anyhow::Context as _;
use colored::Colorize;
use stackport_cloud::VmParams;
use std::process::ExitCode;

pub async fn list(ctx: &Context, owner: Option<&str>, json: bool) -> anyhow::Result<ExitCode> {
    stack::list(ctx, ctx.vm_kind(), owner, json).await
}

pub async fn show(ctx: &Context, name: &str) -> anyhow::Result<ExitCode> {
    stack::show(ctx, ctx.vm_kind(), name).await
}

pub async fn delete(ctx: &Context, name: &str) -> anyhow::Result<ExitCode> {
    stack::delete(ctx, ctx.vm_kind(), name).await
}

pub async fn create(
    ctx: &Context,
    name: &str,
    args: VmArgs,
    owner: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let public_key = public_key(&args).await?.unwrap_or_default();
    let instance_type = args
        .instance_type
        .unwrap_or_else(|| ctx.default_instance_type().to_string());
    let params = VmParams::new(public_key, instance_type);

    println!(
        "{}",
        format!("Creating VM '{}' ({})...", name, params.instance_type).yellow()
    );
    let flash = match ctx
        .orchestrator()
        .create(ctx.vm_kind(), name, &params, owner)
        .await
    {
        Ok(summary) => Flash::success(format!(
            "VM '{}' created, connect with: ssh ec2-user@{}",
            name,
            summary.dns_name.as_deref().unwrap_or("-")
        )),
        Err(e) => Flash::failure("VM", &e),
    };
    Ok(flash.print())
}

pub async fn update(
    ctx: &Context,
    name: &str,
    args: VmArgs,
    owner: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let mut public_key = public_key(&args).await?;
    let mut instance_type = args.instance_type;

    // Keep whatever was not given from the last apply
    if public_key.is_none() || instance_type.is_none() {
        match ctx.orchestrator().show(ctx.vm_kind(), name).await {
            Ok(details) => {
                public_key = public_key.or(details.public_key);
                instance_type = instance_type.or(details.instance_type);
            }
            Err(e) => return Ok(Flash::failure("VM", &e).print()),
        }
    }

    let params = VmParams::new(
        public_key.unwrap_or_default(),
        instance_type.unwrap_or_else(|| ctx.default_instance_type().to_string()),
    );

    println!("{}", format!("Updating VM '{}'...", name).yellow());
    let flash = match ctx
        .orchestrator()
        .update(ctx.vm_kind(), name, &params, owner)
        .await
    {
        Ok(_) => Flash::success(format!("VM '{}' updated", name)),
        Err(e) => Flash::failure("VM", &e),
    };
    Ok(flash.print())
}

async fn public_key(args: &VmArgs) -> anyhow::Result<Option<String>> {
    match (&args.public_key, &args.public_key_file) {
        (Some(key), _) => Ok(Some(key.trim().to_string())),
        (None, Some(path)) => {
            let key = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(key.trim().to_string()))
        }
        (None, None) => Ok(None),
    }
}
