use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use taskdeck_core::PicklistMode;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub project_id: String,
    pub public_key: String,
    pub timeout_secs: u64,
    /// Reject unknown picklist labels instead of falling back to the default.
    pub strict_picklists: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            project_id: String::new(),
            public_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_picklists: false,
        }
    }
}

impl Config {
    pub fn picklist_mode(&self) -> PicklistMode {
        if self.strict_picklists {
            PicklistMode::Strict
        } else {
            PicklistMode::Lenient
        }
    }

    /// Fails when a setting needed to reach the backend is missing.
    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("backend_url", &self.backend_url),
            ("project_id", &self.project_id),
            ("public_key", &self.public_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            bail!(
                "missing configuration: {} (set them in {} or via TASKDECK_* variables)",
                missing.join(", "),
                default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".into())
            );
        }
        Ok(())
    }

    /// Applies `TASKDECK_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("TASKDECK_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(project) = lookup("TASKDECK_PROJECT_ID") {
            self.project_id = project;
        }
        if let Some(key) = lookup("TASKDECK_PUBLIC_KEY") {
            self.public_key = key;
        }
        if let Some(secs) = lookup("TASKDECK_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("TASKDECK_TIMEOUT_SECS is not a number: {secs}"))?;
        }
        if let Some(strict) = lookup("TASKDECK_STRICT_PICKLISTS") {
            self.strict_picklists = parse_flag(&strict)
                .with_context(|| format!("TASKDECK_STRICT_PICKLISTS is not a boolean: {strict}"))?;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Returns the base taskdeck config directory, e.g. ~/.config/taskdeck/
pub fn base_dir() -> Result<PathBuf> {
    let config = dirs::config_dir().context("could not determine config directory")?;
    Ok(config.join("taskdeck"))
}

pub fn default_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("config.toml"))
}

/// Load config from `path` (or return defaults if it doesn't exist)
pub fn load_file(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Loads the file at `path`, or the default location, then applies the
/// process environment.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_path()?,
    };
    let mut config = load_file(&path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    tracing::debug!(path = %path.display(), backend = %config.backend_url, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.picklist_mode(), PicklistMode::Lenient);
    }

    #[test]
    fn reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "backend_url = \"https://records.example.com\"\nproject_id = \"p-1\"\nstrict_picklists = true\n",
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.backend_url, "https://records.example.com");
        assert_eq!(config.project_id, "p-1");
        assert!(config.public_key.is_empty());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.picklist_mode(), PicklistMode::Strict);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config {
            backend_url: "https://file.example.com".into(),
            ..Config::default()
        };
        config
            .apply_env(env(&[
                ("TASKDECK_BACKEND_URL", "https://env.example.com"),
                ("TASKDECK_PUBLIC_KEY", "pk_123"),
                ("TASKDECK_TIMEOUT_SECS", "5"),
                ("TASKDECK_STRICT_PICKLISTS", "yes"),
            ]))
            .unwrap();

        assert_eq!(config.backend_url, "https://env.example.com");
        assert_eq!(config.public_key, "pk_123");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.strict_picklists);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("TASKDECK_TIMEOUT_SECS", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("TASKDECK_TIMEOUT_SECS"));
    }

    #[test]
    fn incomplete_config_names_missing_settings() {
        let config = Config {
            backend_url: "https://records.example.com".into(),
            ..Config::default()
        };
        let err = config.ensure_complete().unwrap_err().to_string();
        assert!(err.contains("project_id"));
        assert!(err.contains("public_key"));
        assert!(!err.contains("backend_url,"));
    }
}
