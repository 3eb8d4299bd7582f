use anyhow::{anyhow, bail, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use url::Url;

pub const DEFAULT_UPSTREAM_API_URL: &str = "https://www.tikwm.com/api/";
pub const DEFAULT_UPSTREAM_ORIGIN: &str = "https://www.tikwm.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_TITLE: &str = "TikTok Video";

/// The structure of our configuration file (config.toml)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Endpoint that receives the form-encoded `url` field.
    pub upstream_api_url: String,
    /// Prefixed to links the upstream returns as bare paths.
    pub upstream_origin: String,
    pub timeout_secs: u64,
    /// Used when the upstream reports no title.
    pub default_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upstream_api_url: DEFAULT_UPSTREAM_API_URL.to_string(),
            upstream_origin: DEFAULT_UPSTREAM_ORIGIN.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects settings the resolver cannot work with.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream_api_url)
            .map_err(|e| anyhow!("upstream_api_url '{}' is not an absolute URL: {}", self.upstream_api_url, e))?;
        Url::parse(&self.upstream_origin)
            .map_err(|e| anyhow!("upstream_origin '{}' is not an absolute URL: {}", self.upstream_origin, e))?;
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        if self.default_title.trim().is_empty() {
            bail!("default_title cannot be empty");
        }
        Ok(())
    }
}

/// Returns the path of the configuration file, creating its directory if needed.
/// An explicit path wins over the per-user default location.
pub async fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let project_dirs = ProjectDirs::from("com", "TikTokAgent", "tiktok-agent")
                .ok_or_else(|| anyhow!("Could not find a valid home directory to store config"))?;
            project_dirs.config_dir().join("config.toml")
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    Ok(path)
}

/// Loads the configuration from the file, or creates a default one if it doesn't exist.
pub async fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "No config file found. Creating a default one at: {}",
            path.display()
        );
        let default_config = Config::default();
        save_config(path, &default_config).await?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(path).await?;
    let config: Config = toml::from_str(&config_content)
        .map_err(|e| anyhow!("Failed to parse config file at {}: {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid config file at {}: {}", path.display(), e))?;

    Ok(config)
}

/// Saves the provided configuration object to the file.
pub async fn save_config(path: &Path, config: &Config) -> Result<()> {
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(Some(dir.path().join("nested").join("config.toml")))
            .await
            .unwrap();

        let config = load_config(&path).await.unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("https://www.tikwm.com/api/"));
    }

    #[tokio::test]
    async fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = 5\ndefault_title = \"Clip\"\n").unwrap();

        let config = load_config(&path).await.unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.default_title, "Clip");
        assert_eq!(config.upstream_origin, DEFAULT_UPSTREAM_ORIGIN);
    }

    #[tokio::test]
    async fn invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "upstream_origin = \"www.tikwm.com\"\n").unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("upstream_origin"));
    }

    #[test]
    fn validate_rejects_zero_timeout_and_blank_title() {
        let zero_timeout = Config { timeout_secs: 0, ..Config::default() };
        assert!(zero_timeout.validate().is_err());

        let blank_title = Config { default_title: "  ".to_string(), ..Config::default() };
        assert!(blank_title.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
