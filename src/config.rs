use crate::error::{PlaneError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "planecli";
const CONFIG_FILE: &str = "config.toml";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Overrides the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            directory: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub workspace: Option<String>,
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
    pub workspace: String,
}

impl PlaneConfig {
    /// `<config dir>/planecli/config.toml` for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Flag and environment values win over the file.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url;
        }
        if overrides.api_key.is_some() {
            self.api_key = overrides.api_key;
        }
        if overrides.workspace.is_some() {
            self.workspace = overrides.workspace;
        }
        self
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let base_url = required(&self.base_url, "base URL", "PLANE_BASE_URL")?;
        let api_key = required(&self.api_key, "API key", "PLANE_API_KEY")?;
        let workspace = required(&self.workspace, "workspace", "PLANE_WORKSPACE")?;
        Ok(Credentials {
            base_url: normalize_base_url(base_url)?,
            api_key: api_key.to_string(),
            workspace: workspace.to_string(),
        })
    }

    /// Directory for the API cache, or `None` if caching is turned off.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if !self.cache.enabled {
            return None;
        }
        self.cache.directory.clone().or_else(crate::cache::cache_dir)
    }
}

fn required<'a>(value: &'a Option<String>, what: &str, env: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlaneError::Auth(format!("No {} configured (set {}).", what, env)))
}

/// Validate an instance URL and strip any trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| PlaneError::Config(format!("Invalid base URL '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PlaneError::Config(format!(
            "Invalid base URL '{}': expected http or https",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn full() -> PlaneConfig {
        PlaneConfig {
            base_url: Some("https://plane.example.com/".to_string()),
            api_key: Some("secret".to_string()),
            workspace: Some("acme".to_string()),
            cache: CacheSettings::default(),
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = PlaneConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, PlaneConfig::default());
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        full().save(&path).unwrap();
        assert_eq!(PlaneConfig::load(&path).unwrap(), full());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_parse_cache_table() {
        let config: PlaneConfig = toml::from_str(
            r#"
base_url = "https://plane.example.com"
workspace = "acme"

[cache]
enabled = false
"#,
        )
        .unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache_dir(), None);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = full().with_overrides(Overrides {
            workspace: Some("other".to_string()),
            ..Overrides::default()
        });
        let creds = config.credentials().unwrap();
        assert_eq!(creds.workspace, "other");
        assert_eq!(creds.api_key, "secret");
        assert_eq!(creds.base_url, "https://plane.example.com");
    }

    #[test]
    fn test_missing_credentials_is_auth_error() {
        let mut config = full();
        config.api_key = Some("  ".to_string());
        let err = config.credentials().unwrap_err();
        assert!(matches!(err, PlaneError::Auth(_)));
        assert!(err.to_string().contains("PLANE_API_KEY"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.plane.so/").unwrap(),
            "https://api.plane.so"
        );
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("ftp://plane.example.com").is_err());
    }

    #[test]
    fn test_custom_cache_directory() {
        let mut config = full();
        config.cache.directory = Some(PathBuf::from("/tmp/plane-cache"));
        assert_eq!(config.cache_dir(), Some(PathBuf::from("/tmp/plane-cache")));
    }
}
