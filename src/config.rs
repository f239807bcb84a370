use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Directory holding the notes record, the config file and the logs.
pub fn data_dir() -> PathBuf {
    std::env::var_os("SCRIBBY_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".scribby"))
}

/// Creates the data directory. Failure is reported, not fatal: the notes
/// then live in memory for the session.
pub fn ensure_data_dir(dir: &Path) -> Option<String> {
    fs::create_dir_all(dir)
        .err()
        .map(|err| format!("cannot create data directory {}: {err}", dir.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title_debounce_ms: u64,
    pub assistant_delay_ms: u64,
    pub assistant_timeout_ms: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title_debounce_ms: 500,
            assistant_delay_ms: 1000,
            assistant_timeout_ms: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn title_debounce(&self) -> Duration {
        Duration::from_millis(self.title_debounce_ms)
    }

    pub fn assistant_delay(&self) -> Duration {
        Duration::from_millis(self.assistant_delay_ms)
    }

    pub fn assistant_timeout(&self) -> Duration {
        Duration::from_millis(self.assistant_timeout_ms)
    }

    /// Reads `config.json` from `dir`. A missing file yields the defaults.
    pub fn load_from(dir: &Path) -> AppResult<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read(&path)?;
        let config: Self = serde_json::from_slice(&data)
            .map_err(|err| AppError::Config(format!("{}: {err}", path.display())))?;
        if config.assistant_timeout_ms == 0 {
            return Err(AppError::Config(format!(
                "{}: assistant_timeout_ms must be positive",
                path.display()
            )));
        }
        if config.assistant_delay_ms >= config.assistant_timeout_ms {
            return Err(AppError::Config(format!(
                "{}: assistant_delay_ms must be below assistant_timeout_ms",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Like [`AppConfig::load_from`], but falls back to the defaults and
    /// returns the problem as a warning.
    pub fn load_or_default(dir: &Path) -> (Self, Option<String>) {
        match Self::load_from(dir) {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_data_dir, AppConfig};
    use std::fs;
    use std::time::Duration;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = AppConfig::load_from(dir.path()).expect("missing file is not an error");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.title_debounce(), Duration::from_millis(500));
        assert_eq!(config.assistant_delay(), Duration::from_secs(1));
    }

    #[test]
    fn partial_config_keeps_defaults_for_absent_fields() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("config.json"), r#"{"title_debounce_ms": 250}"#)
            .expect("config fixture should write");

        let config = AppConfig::load_from(dir.path()).expect("partial config should load");
        assert_eq!(config.title_debounce_ms, 250);
        assert_eq!(config.assistant_delay_ms, 1000);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn malformed_config_falls_back_with_warning() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("config.json"), "{ not json").expect("fixture should write");

        let (config, warning) = AppConfig::load_or_default(dir.path());
        assert_eq!(config, AppConfig::default());
        let warning = warning.expect("malformed config should warn");
        assert!(warning.starts_with("CONFIG_INVALID"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("config.json"), r#"{"assistant_timeout_ms": 0}"#)
            .expect("fixture should write");

        let error = AppConfig::load_from(dir.path()).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("assistant_timeout_ms"));
    }

    #[test]
    fn delay_not_below_timeout_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(
            dir.path().join("config.json"),
            r#"{"assistant_delay_ms": 2000, "assistant_timeout_ms": 2000}"#,
        )
        .expect("fixture should write");

        let error = AppConfig::load_from(dir.path()).expect_err("delay >= timeout should fail");
        assert!(error.to_string().starts_with("CONFIG_INVALID"));
        assert!(error.to_string().contains("assistant_delay_ms"));
    }

    #[test]
    fn unwritable_data_dir_is_a_warning() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").expect("fixture should write");

        let warning = ensure_data_dir(&blocker.join("scribby")).expect("creation should fail");
        assert!(warning.contains("cannot create data directory"));
        assert!(ensure_data_dir(&dir.path().join("fresh")).is_none());
        assert!(dir.path().join("fresh").is_dir());
    }
}
