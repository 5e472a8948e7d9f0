//! # SIP Via Header
//!
//! The Via header of [RFC 3261 Section 20.42](https://datatracker.ietf.org/doc/html/rfc3261#section-20.42)
//! records the path taken by a request so responses can be routed back.
//!
//! ```text
//! Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds;rport
//! ```
//!
//! The `branch` parameter identifies the transaction. It must start with the
//! magic cookie `z9hG4bK` for RFC 3261 compliance; [`BRANCH_MAGIC_COOKIE`]
//! is exported for generators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::param::{parse_params, Param};
use crate::types::uri::Host;

/// Prefix every RFC 3261 branch parameter carries
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

/// A single Via entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    /// Protocol name, usually "SIP"
    pub protocol_name: String,
    /// Protocol version, usually "2.0"
    pub protocol_version: String,
    /// Transport, e.g. "UDP"
    pub transport: String,
    pub host: Host,
    pub port: Option<u16>,
    pub params: Vec<Param>,
}

impl Via {
    pub fn new(
        transport: impl Into<String>,
        host: Host,
        port: Option<u16>,
        params: Vec<Param>,
    ) -> Self {
        Via {
            protocol_name: "SIP".to_string(),
            protocol_version: "2.0".to_string(),
            transport: transport.into(),
            host,
            port,
            params,
        }
    }

    /// Get the branch parameter value.
    pub fn branch(&self) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            Param::Branch(val) => Some(val.as_str()),
            _ => None,
        })
    }

    /// Set or replace the branch parameter, keeping its position.
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        let branch = branch.into();
        match self.params.iter_mut().find(|p| matches!(p, Param::Branch(_))) {
            Some(existing) => *existing = Param::Branch(branch),
            None => self.params.insert(0, Param::Branch(branch)),
        }
    }

    /// Whether the `rport` parameter is present
    pub fn has_rport(&self) -> bool {
        self.params.iter().any(|p| matches!(p, Param::Rport(_)))
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} {}",
            self.protocol_name, self.protocol_version, self.transport, self.host
        )?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Via {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidUri(format!("invalid Via '{}'", s));
        let (protocol, rest) = s.trim().split_once(char::is_whitespace).ok_or_else(invalid)?;
        let mut parts = protocol.split('/');
        let (Some(name), Some(version), Some(transport), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let (sent_by, params) = match rest.trim().split_once(';') {
            Some((sent_by, params)) => (sent_by.trim(), parse_params(params)),
            None => (rest.trim(), Vec::new()),
        };
        let (host, port) = match sent_by.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                (host, Some(port.parse::<u16>().map_err(|_| invalid())?))
            }
            _ => (sent_by, None),
        };

        Ok(Via {
            protocol_name: name.to_string(),
            protocol_version: version.to_string(),
            transport: transport.to_string(),
            host: host.parse()?,
            port,
            params,
        })
    }
}
