use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// discord_token = "..."
/// mapbox_token = "pk...."
/// health_addr = "0.0.0.0:8080"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot token from the Discord developer portal.
    pub discord_token: Option<String>,

    /// Mapbox public token for the static map image; optional.
    pub mapbox_token: Option<String>,

    /// Address the health-check page listens on.
    pub health_addr: String,

    pub geocoding_base_url: String,
    pub forecast_base_url: String,

    /// Language for geocoding results.
    pub language: String,

    /// Timeout for every outbound HTTP call.
    pub timeout_secs: u64,

    /// Budget for an autocomplete lookup before giving up with no suggestions.
    pub suggestion_timeout_secs: u64,

    /// Inactivity window after which dashboard buttons stop working.
    pub session_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: None,
            mapbox_token: None,
            health_addr: "0.0.0.0:8080".to_string(),
            geocoding_base_url: "https://geocoding-api.open-meteo.com/v1".to_string(),
            forecast_base_url: "https://api.open-meteo.com/v1".to_string(),
            language: "en".to_string(),
            timeout_secs: 10,
            suggestion_timeout_secs: 2,
            session_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Return the Discord token, or explain how to set one.
    pub fn discord_token(&self) -> Result<&str> {
        self.discord_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No Discord bot token configured.\n\
                     Hint: run `skydash configure` or set DISCORD_TOKEN."
                )
            })
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skydash", "skydash")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override file values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// `DISCORD_TOKEN`, `MAPBOX_TOKEN` and `PORT` (binds all interfaces) win over the file.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("DISCORD_TOKEN") {
            self.discord_token = Some(token);
        }
        if let Some(token) = non_empty("MAPBOX_TOKEN") {
            self.mapbox_token = Some(token);
        }
        if let Some(port) = non_empty("PORT") {
            self.health_addr = format!("0.0.0.0:{}", port.trim());
        }
    }
}
