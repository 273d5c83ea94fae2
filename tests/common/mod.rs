#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub const API_KEY: &str = "test-key";
pub const WORKSPACE: &str = "acme";

/// Isolated home, config file, and cache directory for one test.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Config pointing at `base_url` with the cache rooted inside the temp dir.
    pub fn write_config(&self, base_url: &str) {
        let content = format!(
            "base_url = '{}'\napi_key = '{}'\nworkspace = '{}'\n\n[cache]\ndirectory = '{}'\n",
            base_url,
            API_KEY,
            WORKSPACE,
            self.cache_dir().display()
        );
        std::fs::write(self.config_path(), content).unwrap();
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("planecli"));
        cmd.env_remove("PLANE_BASE_URL")
            .env_remove("PLANE_API_KEY")
            .env_remove("PLANE_WORKSPACE")
            .env_remove("PLANECLI_NO_CACHE")
            .env_remove("PLANECLI_LOG_FILE")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg-config"))
            .env("XDG_CACHE_HOME", self.dir.path().join("xdg-cache"))
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}
