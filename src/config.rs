// src/config.rs

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

pub const ENV_PREFIX: &str = "WEEKLY_REPORTS_";
const IN_MEMORY_STORE: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,

    // Storage
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default)]
    pub directory_path: Option<PathBuf>,

    // TLS, enabled only when both are set
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Pins "today" (YYYY-MM-DD) for demos and acceptance runs.
    #[serde(default)]
    pub fixed_today: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_store_path() -> String {
    "weekly_reports.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_host(),
            server_port: default_port(),
            store_path: default_store_path(),
            directory_path: None,
            cert_path: None,
            key_path: None,
            fixed_today: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    InMemory,
    File(PathBuf),
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env::<Config>()
    }

    /// Same as [`Config::from_env`] over explicit `(KEY, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server_host, self.server_port).parse()
    }

    pub fn store(&self) -> StoreLocation {
        match self.store_path.trim() {
            "" | IN_MEMORY_STORE => StoreLocation::InMemory,
            path => StoreLocation::File(PathBuf::from(path)),
        }
    }

    /// Certificate and key paths when TLS is configured.
    pub fn tls(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
        assert_eq!(
            config.store(),
            StoreLocation::File(PathBuf::from("weekly_reports.json"))
        );
        assert!(config.tls().is_none());
        assert!(config.fixed_today.is_none());

        let defaults = Config::default();
        assert_eq!(config.server_host, defaults.server_host);
        assert_eq!(config.server_port, defaults.server_port);
        assert_eq!(config.store_path, defaults.store_path);
        assert_eq!(config.directory_path, defaults.directory_path);
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = Config::from_vars(vars(&[
            ("WEEKLY_REPORTS_SERVER_HOST", "0.0.0.0"),
            ("WEEKLY_REPORTS_SERVER_PORT", "8443"),
            ("WEEKLY_REPORTS_STORE_PATH", ":memory:"),
            ("WEEKLY_REPORTS_CERT_PATH", "cert.pem"),
            ("WEEKLY_REPORTS_KEY_PATH", "key.pem"),
            ("WEEKLY_REPORTS_FIXED_TODAY", "2025-06-23"),
            ("SERVER_PORT", "1"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8443);
        assert_eq!(config.store(), StoreLocation::InMemory);
        assert_eq!(
            config.tls(),
            Some((PathBuf::from("cert.pem"), PathBuf::from("key.pem")))
        );
        assert_eq!(config.fixed_today.as_deref(), Some("2025-06-23"));
    }

    #[test]
    fn tls_needs_both_paths() {
        let config = Config::from_vars(vars(&[("WEEKLY_REPORTS_CERT_PATH", "cert.pem")])).unwrap();
        assert!(config.tls().is_none());
    }

    #[test]
    fn bad_port_is_a_config_error() {
        assert!(Config::from_vars(vars(&[("WEEKLY_REPORTS_SERVER_PORT", "http")])).is_err());
    }
}
