//! ---
//! csms_section: "01-core-functionality"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Shared primitives and utilities for the message layer."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Shared primitives for the R-CSMS workspace: configuration loading and
//! tracing initialisation consumed by the message and security crates.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, ProtocolConfig, SignatureConfig};
pub use logging::{init_tracing, LogFormat};
