use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content with comments
const DEFAULT_CONFIG: &str = r#"# db2db-report configuration file
# This file is auto-generated on first run. All fields are optional.

# Directory the run log is appended to, one file per center and day
# Supports ~ for home directory
# Default: ~/.local/state/db2db/logs
log_folder = "~/.local/state/db2db/logs"

# Name of the center being migrated; prefixes the log file name
# Default: "center"
center_name = "center"
"#;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_folder")]
    pub log_folder: String,

    #[serde(default = "default_center_name")]
    pub center_name: String,
}

fn default_log_folder() -> String {
    "~/.local/state/db2db/logs".to_string()
}

fn default_center_name() -> String {
    "center".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_folder: default_log_folder(),
            center_name: default_center_name(),
        }
    }
}

impl Config {
    /// Get the default config file path
    /// Always uses ~/.config for consistency across platforms
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".config")
            .join("db2db-report")
            .join("config.toml")
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path.clone().unwrap_or_else(Self::default_path);

        if path.exists() {
            Self::load(&path)
        } else {
            Self::create_default(&path)?;
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn create_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write default config: {}", path.display()))?;

        Ok(())
    }

    /// Expand ~ in log_folder to actual home directory
    pub fn expanded_log_folder(&self) -> PathBuf {
        expand_tilde(&self.log_folder)
    }
}

/// Known top-level config keys (for detecting missing options)
const KNOWN_KEYS: &[&str] = &["log_folder", "center_name"];

/// Check for missing config options and return a list of missing keys
pub fn check_missing_options(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    KNOWN_KEYS
        .iter()
        .filter(|key| !table.contains_key(**key))
        .map(|key| key.to_string())
        .collect()
}

/// Expand ~ to home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_commented_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let config = Config::load_or_create(&Some(path.clone())).unwrap();
        assert_eq!(config.center_name, "center");
        assert!(path.exists());

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.log_folder, default_log_folder());
        assert!(check_missing_options(&path).is_empty());
    }

    #[test]
    fn missing_keys_fall_back_and_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "center_name = \"nysgrc\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.center_name, "nysgrc");
        assert_eq!(config.log_folder, default_log_folder());
        assert_eq!(check_missing_options(&path), vec!["log_folder".to_string()]);
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "center_name = [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn tilde_is_expanded_only_at_start() {
        assert_eq!(expand_tilde("/var/log/db2db"), PathBuf::from("/var/log/db2db"));
        assert_eq!(expand_tilde("logs/~"), PathBuf::from("logs/~"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs"), home.join("logs"));
        }
    }
}
