use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".LinearDay";
const CONFIG_FILE: &str = "config.json";
pub const API_KEY_ENV: &str = "LINEARDAY_AI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub ai_enabled: bool,
    pub ai_api_key: Option<String>,
    pub ai_api_base_url: String,
    pub ai_model: String,
    pub ai_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_root_dir().join("db").join("linearday.db"),
            api_port: 7891,
            ai_enabled: true,
            ai_api_key: None,
            ai_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ai_model: "gemini-2.5-flash".to_string(),
            ai_timeout_seconds: 20,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reads the config file, writing defaults first when none exists yet.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }

        let config = Self::default();
        config.save_to(&path)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        set_mode_600(path)?;

        Ok(())
    }

    /// API key from the environment first, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.ai_api_key
                    .clone()
                    .filter(|value| !value.trim().is_empty())
            })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value.trim());
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "ai_enabled" => {
                self.ai_enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("ai_enabled must be true/false"))?;
            }
            "ai_api_key" => {
                self.ai_api_key = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "ai_api_base_url" => {
                self.ai_api_base_url = value.trim().trim_end_matches('/').to_string();
            }
            "ai_model" => {
                self.ai_model = value.trim().to_string();
            }
            "ai_timeout_seconds" => {
                self.ai_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("ai_timeout_seconds must be a number"))?
                    .max(5);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_port|api.port, ai_enabled|ai.enabled, ai_api_key|ai.api_key, ai_api_base_url|ai.base_url, ai_model|ai.model, ai_timeout_seconds|ai.timeout_seconds"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "ai_enabled" => Some(self.ai_enabled.to_string()),
            "ai_api_key" => Some(
                self.ai_api_key
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "ai_api_base_url" => Some(self.ai_api_base_url.clone()),
            "ai_model" => Some(self.ai_model.clone()),
            "ai_timeout_seconds" => Some(self.ai_timeout_seconds.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "ai_enabled" | "ai.enabled" => "ai_enabled",
        "ai_api_key" | "ai.api_key" => "ai_api_key",
        "ai_api_base_url" | "ai.base_url" => "ai_api_base_url",
        "ai_model" | "ai.model" => "ai_model",
        "ai_timeout_seconds" | "ai.timeout_seconds" => "ai_timeout_seconds",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get_with_aliases() {
        let mut config = Config::default();

        config.set_value("ai.model", " gemini-2.0-flash ").unwrap();
        config.set_value("api.port", "9000").unwrap();
        config
            .set_value("ai.base_url", "http://localhost:8080/v1beta/")
            .unwrap();

        assert_eq!(config.get_value("ai_model").as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.get_value("api_port").as_deref(), Some("9000"));
        assert_eq!(
            config.ai_api_base_url,
            "http://localhost:8080/v1beta"
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();

        assert!(config.set_value("api.port", "seventy").is_err());
        assert!(config.set_value("ai.enabled", "maybe").is_err());
        assert!(config.set_value("report.time", "23:30").is_err());
        assert!(config.get_value("report.time").is_none());
    }

    #[test]
    fn test_timeout_has_floor() {
        let mut config = Config::default();
        config.set_value("ai.timeout_seconds", "1").unwrap();

        assert_eq!(config.ai_timeout_seconds, 5);
    }

    #[test]
    fn test_api_key_is_masked() {
        let mut config = Config::default();
        assert_eq!(config.get_value("ai.api_key").as_deref(), Some("not_set"));

        config.set_value("ai.api_key", "secret").unwrap();
        assert_eq!(config.get_value("ai.api_key").as_deref(), Some("***set***"));

        config.set_value("ai.api_key", "  ").unwrap();
        assert!(config.ai_api_key.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.set_value("db.path", "/tmp/journal.db").unwrap();
        config.set_value("ai.enabled", "false").unwrap();

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.db_path, PathBuf::from("/tmp/journal.db"));
        assert!(!loaded.ai_enabled);
        assert_eq!(loaded.ai_model, config.ai_model);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_port": 8123}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.api_port, 8123);
        assert!(loaded.ai_enabled);
        assert_eq!(loaded.ai_timeout_seconds, 20);
    }
}
