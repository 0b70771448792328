//! Layered runtime configuration: defaults, `colleague.toml`, environment.

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection string. Required.
    pub database_url: String,
    /// Root of the Colleague Self-Service instance.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Subject codes to sync, in iteration order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,
    /// Term codes each subject is searched under.
    #[serde(default = "default_terms")]
    pub terms: Vec<String>,
    /// Filter level for this crate's tracing output.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between subjects in milliseconds. Backpressure against the
    /// scraped system, not a correctness knob.
    #[serde(default = "default_subject_delay_ms")]
    pub subject_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://mycollegess.cpcc.edu".to_string()
}

fn default_subjects() -> Vec<String> {
    [
        "ACA", "ACC", "ART", "BIO", "BUS", "CHM", "CIS", "CJC", "COM", "CSC", "CTI", "CTS",
        "DBA", "ECO", "EDU", "EGR", "ENG", "HIS", "MAT", "MKT", "NET", "NUR", "PHY", "POL",
        "PSY", "SEC", "SGD", "SOC", "SPA", "WEB",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_terms() -> Vec<String> {
    vec!["2026FA".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_subject_delay_ms() -> u64 {
    1500
}

impl Config {
    /// Extract configuration: defaults, then `colleague.toml`, then
    /// `COLLEAGUE_`-prefixed environment variables. `DATABASE_URL` is also
    /// honored unprefixed.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("colleague.toml"))
            .merge(Env::prefixed("COLLEAGUE_"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .extract()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn subject_delay(&self) -> Duration {
        Duration::from_millis(self.subject_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn test_defaults_fill_optional_fields() {
        let config: Config = Figment::new()
            .merge(Serialized::default(
                "database_url",
                "postgres://localhost/colleague",
            ))
            .extract()
            .expect("config should extract");
        assert_eq!(config.base_url, "https://mycollegess.cpcc.edu");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.subject_delay_ms, 1500);
        assert_eq!(config.terms, vec!["2026FA"]);
        assert!(config.subjects.contains(&"CSC".to_string()));
    }

    #[test]
    fn test_database_url_is_required() {
        assert!(Figment::new().extract::<Config>().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let config: Config = Figment::new()
            .merge(Serialized::default("database_url", "postgres://x"))
            .merge(Serialized::default("request_timeout_secs", 10u64))
            .merge(Serialized::default("subject_delay_ms", 250u64))
            .extract()
            .expect("config should extract");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.subject_delay(), Duration::from_millis(250));
    }
}
