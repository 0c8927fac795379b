//! Process-boundary configuration structs (§13 of `SPEC_FULL.md`), grounded
//! in `server/services/authenticator/src/main.rs`'s
//! `serde_json::from_reader(...).expect(...)` config-loading pattern. Library
//! code never panics; only the binaries built on top of these types (in
//! `taskit-cli`/`demos`) call `.expect()` at `main()`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::task::DEFAULT_PORT;

/// A registered backend address: either a bare host (paired with the
/// frontend's `default_port`) or an explicit `(host, port)`, matching the
/// host-normalization rule in `spec.md` §4.3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BackendAddr {
    Host(String),
    HostPort(String, u16),
}

impl BackendAddr {
    /// Resolve to a concrete `(host, port)` pair, applying `default_port`
    /// when only a bare host was given.
    pub fn resolve(&self, default_port: u16) -> (String, u16) {
        match self {
            BackendAddr::Host(host) => (host.clone(), default_port),
            BackendAddr::HostPort(host, port) => (host.clone(), *port),
        }
    }
}

/// On-disk configuration for a backend process (`spec.md` §6 "Backend
/// configuration"). `tasks`/`logger`/`codec` are wired up in code, not from
/// the file — they are collaborators, not data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_size")]
    pub data_size: usize,
    /// Accept-loop responsiveness tick, in seconds (`spec.md` §4.2, §9 open
    /// question: left as a per-backend knob rather than hardcoded).
    #[serde(default = "default_end_resp")]
    pub end_resp_secs: f64,
}

/// On-disk configuration for a frontend process (`spec.md` §6 "Frontend
/// configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub backends: Vec<BackendAddr>,
    #[serde(default = "default_port")]
    pub default_port: u16,
    #[serde(default = "default_data_size")]
    pub data_size: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_size() -> usize {
    crate::framing::DEFAULT_DATA_SIZE
}

fn default_end_resp() -> f64 {
    0.5
}

/// A config file failed to load: either the file couldn't be opened/read, or
/// its contents didn't parse as the expected shape.
#[derive(Debug)]
pub struct ConfigError(String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to load configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError(e.to_string())
    }
}

fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load(path.as_ref())
    }
}

impl FrontendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_addr_resolves_bare_host_with_default_port() {
        let addr = BackendAddr::Host("example.com".into());
        assert_eq!(addr.resolve(9000), ("example.com".to_string(), 9000));
    }

    #[test]
    fn backend_addr_resolves_explicit_pair_as_is() {
        let addr = BackendAddr::HostPort("example.com".into(), 1234);
        assert_eq!(addr.resolve(9000), ("example.com".to_string(), 1234));
    }

    #[test]
    fn backend_config_parses_from_json() {
        let json = r#"{"host": "0.0.0.0", "port": 54543}"#;
        let cfg: BackendConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 54543);
        assert_eq!(cfg.data_size, crate::framing::DEFAULT_DATA_SIZE);
        assert_eq!(cfg.end_resp_secs, 0.5);
    }

    #[test]
    fn frontend_config_parses_mixed_backend_list() {
        let json = r#"{"backends": ["a.example.com", ["b.example.com", 9001]]}"#;
        let cfg: FrontendConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.backends.len(), 2);
        assert_eq!(cfg.backends[0].resolve(54543), ("a.example.com".to_string(), 54543));
        assert_eq!(cfg.backends[1].resolve(54543), ("b.example.com".to_string(), 9001));
    }
}
