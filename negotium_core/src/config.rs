use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "negotium_config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    // Negotiation backend (serves /negotiate, /analyze and /sessions)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // Session countdown
    #[serde(default = "default_session_duration_secs")]
    pub session_duration_secs: u64,
    #[serde(default)]
    pub enforce_time_limit: bool,

    // History listing
    #[serde(default = "default_session_list_limit")]
    pub session_list_limit: usize,

    // First counterpart line shown before the user says anything
    #[serde(default = "default_opening_message")]
    pub opening_message: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_session_duration_secs() -> u64 {
    900
}

fn default_session_list_limit() -> usize {
    10
}

fn default_opening_message() -> String {
    "Hello. I understand you wanted to discuss your compensation today. What's on your mind?"
        .to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            session_duration_secs: default_session_duration_secs(),
            enforce_time_limit: false,
            session_list_limit: default_session_list_limit(),
            opening_message: default_opening_message(),
        }
    }
}

impl ClientConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Path to negotium_config.toml next to the executable
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Load config next to the executable, falling back to defaults + env vars.
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config.with_env_overrides();
                }
                Err(e) => {
                    tracing::error!("Failed to load {:?}: {:#}", path, e);
                }
            }
        }

        tracing::warn!("No usable config file found, using defaults + env vars");
        Self::from_env()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str::<ClientConfig>(&contents)
            .with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Save config to file (next to executable)
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Environment variables win over file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("NEGOTIUM_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend_url = url;
            }
        }

        if let Ok(timeout) = env::var("NEGOTIUM_REQUEST_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse() {
                self.request_timeout_secs = seconds;
            }
        }

        if let Ok(duration) = env::var("NEGOTIUM_SESSION_DURATION_SECS") {
            if let Ok(seconds) = duration.parse() {
                self.session_duration_secs = seconds;
            }
        }

        if let Ok(enabled) = env::var("NEGOTIUM_ENFORCE_TIME_LIMIT") {
            self.enforce_time_limit = parse_flag(&enabled);
        }

        if let Ok(limit) = env::var("NEGOTIUM_SESSION_LIST_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.session_list_limit = limit;
            }
        }

        if let Ok(opening) = env::var("NEGOTIUM_OPENING_MESSAGE") {
            if !opening.trim().is_empty() {
                self.opening_message = opening;
            }
        }

        self
    }

    /// `None` disables the timeout entirely.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_duration_secs)
    }
}

fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("1") || raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field() {
        let config = ClientConfig::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.session_duration(), Duration::from_secs(900));
        assert_eq!(config.session_list_limit, 10);
        assert!(!config.enforce_time_limit);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: ClientConfig = toml::from_str(
            r#"
            backend_url = "http://10.0.0.2:9000"
            enforce_time_limit = true
            "#,
        )
        .expect("parse partial config");
        assert_eq!(parsed.backend_url, "http://10.0.0.2:9000");
        assert!(parsed.enforce_time_limit);
        assert_eq!(parsed.session_duration_secs, 900);
        assert!(parsed.opening_message.starts_with("Hello."));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            backend_url: "http://127.0.0.1:8123".to_string(),
            session_duration_secs: 600,
            ..ClientConfig::default()
        };

        config.save_to(&path).expect("save config");
        let loaded = ClientConfig::load_from(&path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "session_duration_secs = \"soon\"").expect("write config");

        let err = ClientConfig::load_from(&path).expect_err("invalid config");
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn parses_boolean_flags() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }
}
