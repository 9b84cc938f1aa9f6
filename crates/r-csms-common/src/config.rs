//! ---
//! csms_section: "01-core-functionality"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Shared primitives and utilities for the message layer."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_local_node_id() -> String {
    "csms".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_network_path_len() -> usize {
    8
}

fn default_signing_method() -> String {
    "Ed25519".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for an R-CSMS node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub signatures: SignatureConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "R_CSMS_CONFIG";

    /// Load configuration from disk, respecting the `R_CSMS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.protocol.validate()?;
        self.signatures.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Protocol level defaults applied to messages built or parsed by this node.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Node id used as the source of outbound requests.
    #[serde(default = "default_local_node_id")]
    pub local_node_id: String,
    /// Timeout attached to requests that do not carry one explicitly.
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub default_request_timeout: Duration,
    /// Upper bound on intermediate hops accepted in a network path.
    #[serde(default = "default_max_network_path_len")]
    pub max_network_path_len: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            local_node_id: default_local_node_id(),
            default_request_timeout: default_request_timeout(),
            max_network_path_len: default_max_network_path_len(),
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.local_node_id.trim().is_empty() {
            return Err(anyhow!("protocol.local_node_id cannot be empty"));
        }
        if self.default_request_timeout.is_zero() {
            return Err(anyhow!("protocol.default_request_timeout must be positive"));
        }
        if self.max_network_path_len == 0 {
            return Err(anyhow!("protocol.max_network_path_len must be at least 1"));
        }
        Ok(())
    }
}

/// Signing policy for outbound messages and verification policy for inbound ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    #[serde(default)]
    pub sign_outbound: bool,
    #[serde(default)]
    pub verify_inbound: bool,
    /// Key reference written into produced signatures.
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default = "default_signing_method")]
    pub signing_method: String,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            sign_outbound: false,
            verify_inbound: false,
            key_id: None,
            signing_method: default_signing_method(),
        }
    }
}

impl SignatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sign_outbound
            && self
                .key_id
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
        {
            return Err(anyhow!("signatures.key_id is required when sign_outbound is set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
