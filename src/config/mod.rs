use crate::core::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default location looked up by [`Config::load`] when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "vidsniff.toml";

/// Upper bound on download attempts accepted by [`Config::validate`].
pub const MAX_RETRIES: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub accept_language: String,
    pub primary_timeout_secs: u64,
    pub frame_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub external_timeout_secs: u64,
    /// Upper bound on secondary fetches in flight for one extraction.
    pub max_secondary_fetches: usize,
    pub min_url_length: usize,
    pub strategies: Vec<StrategyKind>,
    /// Binary invoked by the external extractor strategy.
    pub external_extractor: PathBuf,
    pub retries: usize,
    /// Hosts the CLI will hand to the extractor. Empty means any host.
    pub allowed_domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            primary_timeout_secs: 15,
            frame_timeout_secs: 10,
            probe_timeout_secs: 5,
            external_timeout_secs: 120,
            max_secondary_fetches: 4,
            min_url_length: 10,
            strategies: StrategyKind::DEFAULT.to_vec(),
            external_extractor: PathBuf::from("yt-dlp"),
            retries: 3,
            allowed_domains: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists. Falls back to defaults when no file is found at the default
    /// location; an explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("primary_timeout_secs", self.primary_timeout_secs),
            ("frame_timeout_secs", self.frame_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("external_timeout_secs", self.external_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }

        if self.max_secondary_fetches == 0 {
            return Err(ConfigError::Invalid(
                "max_secondary_fetches must be greater than zero".to_string(),
            ));
        }

        if self.min_url_length == 0 {
            return Err(ConfigError::Invalid(
                "min_url_length must be greater than zero".to_string(),
            ));
        }

        if self.retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "retries must be at most {MAX_RETRIES}"
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_secs(self.frame_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    /// Whether the CLI may pass `host` to the extractor.
    pub fn is_domain_allowed(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.allowed_domains.iter().any(|domain| {
            let domain = domain.trim_start_matches('.').to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_ok!(config.validate());
        assert_eq!(config.strategies, StrategyKind::DEFAULT.to_vec());
        assert_eq!(config.primary_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            probe_timeout_secs = 3
            strategies = ["frame_follow", "direct_pattern"]
            "#,
        )
        .unwrap();

        assert_eq!(config.probe_timeout_secs, 3);
        assert_eq!(config.frame_timeout_secs, 10);
        assert_eq!(
            config.strategies,
            vec![StrategyKind::FrameFollow, StrategyKind::DirectPattern]
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Config::from_toml_str("frame_timeout_secs = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_err!(Config::from_toml_str("max_secondary_fetches = 0"));
    }

    #[test]
    fn test_retries_are_bounded() {
        assert_ok!(Config::from_toml_str("retries = 10"));
        let result = Config::from_toml_str("retries = 4294967296");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_strategy_is_a_parse_error() {
        let result = Config::from_toml_str(r#"strategies = ["telepathy"]"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_url_length = 20").unwrap();
        writeln!(file, "allowed_domains = [\"example.com\"]").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.min_url_length, 20);
        assert!(config.is_domain_allowed("www.example.com"));
        assert!(config.is_domain_allowed("example.com"));
        assert!(!config.is_domain_allowed("notexample.com"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
