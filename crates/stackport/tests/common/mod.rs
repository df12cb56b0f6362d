#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated working directory with its own config, cache and engine dirs
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Self { root };
        project.write_config(
            "project: stackport-test\n\
             organization: acme\n\
             pulumi_binary: stackport-test-missing-pulumi\n\
             instance_types: [t2.micro, t3.small]\n",
        );
        project
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("stackport.yaml"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// `stackport` running inside the project, isolated from the host environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stackport").unwrap();
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env("STACKPORT_CACHE_DIR", self.path().join("cache"))
            .env("STACKPORT_WORK_DIR", self.path().join("work"))
            .env_remove("STACKPORT_CONFIG_PATH")
            .env_remove("STACKPORT_OWNER")
            .env_remove("STACKPORT_REGION")
            .env_remove("PROJECT_NAME")
            .env_remove("PULUMI_ORG")
            .env_remove("RUST_LOG");
        cmd
    }
}
