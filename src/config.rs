use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

pub const CONFIG_PATH: &str = "data/config.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Pause between two results-page fetches
    #[serde(default = "default_page_delay_seconds")]
    pub page_delay_seconds: f64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// JSON header pool; the built-in pool is used when unset
    #[serde(default)]
    pub headers_file: Option<PathBuf>,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

fn default_page_delay_seconds() -> f64 {
    2.0
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_tracing_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_delay_seconds: default_page_delay_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            headers_file: None,
            tracing_level: default_tracing_level(),
        }
    }
}

impl Config {
    /// `data/config.yaml` if present, defaults otherwise, then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match fs::read_to_string(CONFIG_PATH) {
            Ok(config_str) => Self::from_yaml(&config_str)
                .with_context(|| format!("Invalid {}", CONFIG_PATH))?,
            Err(_) => Config::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `lookup` (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(delay) = lookup("PAGE_DELAY_SECONDS") {
            self.page_delay_seconds = delay.parse()
                .context("Failed to parse PAGE_DELAY_SECONDS environment variable")?;
        }

        if let Some(timeout) = lookup("REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = timeout.parse()
                .context("Failed to parse REQUEST_TIMEOUT_SECONDS environment variable")?;
        }

        if let Some(headers_file) = lookup("HEADERS_FILE") {
            self.headers_file = Some(PathBuf::from(headers_file));
        }

        if let Some(tracing_level) = lookup("TRACING_LEVEL") {
            self.tracing_level = tracing_level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.page_delay_seconds.is_finite() || self.page_delay_seconds < 0.0 {
            anyhow::bail!("page_delay_seconds must be a non-negative number, got {}", self.page_delay_seconds);
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("request_timeout_seconds must be at least 1");
        }

        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_secs_f64(self.page_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn create_default() -> Result<()> {
        // Ensure data directory exists
        std::fs::create_dir_all("data")?;

        let config_str = serde_yaml::to_string(&Config::default())?;
        fs::write(CONFIG_PATH, config_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.page_delay(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_yaml_fields() {
        let yaml = "page_delay_seconds: 0.5\nheaders_file: resources/headers.json\ntracing_level: debug\n";
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.page_delay(), Duration::from_millis(500));
        assert_eq!(config.headers_file, Some(PathBuf::from("resources/headers.json")));
        assert_eq!(config.tracing_level, "debug");
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        assert!(Config::from_yaml("page_delay_seconds: -1").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PAGE_DELAY_SECONDS", "5"),
            ("HEADERS_FILE", "/etc/scraper/headers.json"),
            ("TRACING_LEVEL", "warn"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.page_delay(), Duration::from_secs(5));
        assert_eq!(config.headers_file, Some(PathBuf::from("/etc/scraper/headers.json")));
        assert_eq!(config.tracing_level, "warn");
        assert_eq!(config.request_timeout_seconds, 30);
    }

    #[test]
    fn test_unparsable_override_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "REQUEST_TIMEOUT_SECONDS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), Config::default());
    }
}
