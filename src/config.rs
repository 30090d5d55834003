//! Configuration schema consumed by the core subsystems.
//!
//! Discovering the YAML document on disk, applying templating, and watching
//! it for changes is the job of the excluded CLI/config-loader collaborator;
//! this module only defines the shape that loader hands us and the
//! `serde_yaml` call that turns text into it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plumbing::bytesize::ByteSize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub controller: String,
    pub tls: TlsConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub key_file: PathBuf,
    pub cert_file: PathBuf,
    pub ca_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub http_proxy: HttpProxyConfig,
    pub dns: DnsServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProxyConfig {
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
    #[serde(with = "crate::plumbing::bytesize::serde_bytesize")]
    pub size: ByteSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsServiceConfig {
    #[serde(with = "crate::plumbing::bytesize::serde_bytesize")]
    pub cache_size: ByteSize,
    pub dial_timeout_secs: u64,
    pub connection_pool: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: FeatureToggle,
    #[serde(default)]
    pub profiling: FeatureToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeatureToggle {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    pub fn from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&text)
    }
}
