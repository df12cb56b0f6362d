//! Pulumi YAML project files
//!
//! Each program is rendered as a `Pulumi.yaml` with `runtime: yaml`, so the
//! engine can run it without a language host.

use crate::error::Result;
use serde::Serialize;
use stackport_cloud::Program;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const PROJECT_FILE: &str = "Pulumi.yaml";

#[derive(Serialize)]
struct ProjectFile<'a> {
    name: &'a str,
    runtime: &'static str,
    #[serde(flatten)]
    program: &'a Program,
}

/// Render `program` as the YAML document of project `project`
pub fn render(project: &str, program: &Program) -> Result<String> {
    let file = ProjectFile {
        name: project,
        runtime: "yaml",
        program,
    };
    Ok(serde_yaml::to_string(&file)?)
}

/// Write the project file into `dir`, creating the directory if needed
pub async fn write(dir: &Path, project: &str, program: &Program) -> Result<PathBuf> {
    if !fs::try_exists(dir).await? {
        fs::create_dir_all(dir).await?;
        tracing::debug!("Created project directory: {}", dir.display());
    }

    let path = dir.join(PROJECT_FILE);
    fs::write(&path, render(project, program)?).await?;
    Ok(path)
}
