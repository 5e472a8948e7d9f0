//! Gateway configuration
//!
//! Every fixed value the gateway writes into SIP and SDP lives here, with
//! defaults matching what deployed peers already expect. Load it from TOML
//! or build it in code:
//!
//! ```rust
//! use sipbridge_gateway_core::GatewayConfig;
//!
//! let config = GatewayConfig::from_toml_str(r#"
//!     user_agent = "MyGateway/2.0"
//!     register_expires = 600
//! "#).unwrap();
//!
//! assert_eq!(config.user_agent, "MyGateway/2.0");
//! assert_eq!(config.max_forwards, 70);
//! assert!(config.validate().is_ok());
//! ```

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use sipbridge_sip_core::Method;

use crate::error::{Error, Result};
use crate::logging::LogSettings;

/// Default packetization interval in milliseconds
pub const DEFAULT_PTIME: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Value of the `User-Agent` header on everything we send
    pub user_agent: String,

    /// User part of the Contact we put in SDP answers
    pub contact_user: String,

    /// SDP `s=` line
    pub session_name: String,

    /// `a=ptime` we answer with, and the ptime reported for a negotiated call
    pub ptime: u32,

    pub minptime: u32,

    /// Max-Forwards on requests that start a new chain (BYE, REGISTER)
    pub max_forwards: u8,

    /// REGISTER `Expires`, in seconds
    pub register_expires: u32,

    /// Outbound INVITE CSeq is drawn from `1..=invite_cseq_range`
    pub invite_cseq_range: u32,

    /// REGISTER CSeq is drawn from `1..=register_cseq_range`
    pub register_cseq_range: u32,

    /// Methods advertised in `Allow`
    pub allow: Vec<Method>,

    /// Option tags advertised in `Supported`
    pub supported: Vec<String>,

    /// IP to bind media on when the caller does not name one; the SIP
    /// socket's IP otherwise
    pub rtp_host: Option<IpAddr>,

    pub log: LogSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            user_agent: "sipbridge/0.1".to_string(),
            contact_user: "sipbridge-proxy".to_string(),
            session_name: "sipbridge-rtp".to_string(),
            ptime: DEFAULT_PTIME,
            minptime: 10,
            max_forwards: 70,
            register_expires: 300,
            invite_cseq_range: 10_000,
            register_cseq_range: 1 << 16,
            allow: vec![
                Method::Prack,
                Method::Invite,
                Method::Ack,
                Method::Bye,
                Method::Cancel,
                Method::Update,
                Method::Info,
                Method::Subscribe,
                Method::Notify,
                Method::Refer,
                Method::Message,
                Method::Options,
            ],
            supported: ["replaces", "100rel", "timer", "norefersub"]
                .into_iter()
                .map(String::from)
                .collect(),
            rtp_host: None,
            log: LogSettings::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document; missing keys keep their defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: GatewayConfig =
            toml::from_str(input).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_contact_user(mut self, user: impl Into<String>) -> Self {
        self.contact_user = user.into();
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn with_register_expires(mut self, seconds: u32) -> Self {
        self.register_expires = seconds;
        self
    }

    pub fn with_rtp_host(mut self, ip: IpAddr) -> Self {
        self.rtp_host = Some(ip);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent must not be empty".to_string()));
        }
        if self.ptime == 0 || self.minptime == 0 {
            return Err(Error::Config("ptime and minptime must be greater than 0".to_string()));
        }
        if self.minptime > self.ptime {
            return Err(Error::Config(format!(
                "minptime {} exceeds ptime {}",
                self.minptime, self.ptime
            )));
        }
        if self.max_forwards == 0 {
            return Err(Error::Config("Max-Forwards must be greater than 0".to_string()));
        }
        if self.invite_cseq_range == 0 || self.register_cseq_range == 0 {
            return Err(Error::Config("CSeq ranges must be greater than 0".to_string()));
        }
        // Keep room to count up from the seed without wrapping
        if self.invite_cseq_range > 1 << 31 || self.register_cseq_range > 1 << 31 {
            return Err(Error::Config("CSeq ranges must stay below 2^31".to_string()));
        }
        self.log.env_filter()?;
        Ok(())
    }
}
