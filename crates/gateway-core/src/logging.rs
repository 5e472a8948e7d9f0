//! Logging setup for processes embedding the gateway.
//!
//! The gateway only emits `tracing` events. A host process that has no
//! subscriber of its own can install one from the `[log]` section of its
//! [`GatewayConfig`]:
//!
//! ```toml
//! [log]
//! filter = "info,sipbridge_gateway_core=debug"
//! json = true
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};

/// The `[log]` section of the gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directives, used when `RUST_LOG` is not set
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Include file and line of each event
    pub file_info: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

impl LogSettings {
    /// Parses the configured directives
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| Error::Config(format!("invalid log filter {:?}: {}", self.filter, e)))
    }
}

/// Installs the global subscriber described by `config.log`. `RUST_LOG`
/// takes precedence over the configured filter. Fails if a subscriber is
/// already installed.
pub fn setup_logging(config: &GatewayConfig) -> Result<()> {
    let settings = &config.log;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => settings.env_filter()?,
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_file(settings.file_info)
        .with_line_number(settings.file_info);

    let installed = if settings.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| Error::Config(format!("cannot install logger: {}", e)))?;

    tracing::info!(
        "{} logging at {:?} (contact user {})",
        config.user_agent,
        settings.filter,
        config.contact_user
    );
    Ok(())
}
