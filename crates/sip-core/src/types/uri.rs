//! # SIP URIs
//!
//! A reduced form of the `sip:`/`sips:` URI from
//! [RFC 3261 Section 19.1](https://datatracker.ietf.org/doc/html/rfc3261#section-19.1):
//! user part, host, optional port and URI parameters. URI headers (`?h=v`) and
//! passwords are not modelled.
//!
//! ```rust
//! use sipbridge_sip_core::types::{Host, Uri};
//!
//! let uri: Uri = "sip:alice@192.0.2.10:5070;transport=udp".parse().unwrap();
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.port, Some(5070));
//! assert!(matches!(uri.host, Host::Address(_)));
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::param::{parse_params, Param};

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Sip => f.write_str("sip"),
            Scheme::Sips => f.write_str("sips"),
        }
    }
}

/// Host part of a URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Host {
    Domain(String),
    Address(IpAddr),
}

impl Host {
    /// Returns the IP address if the host is a literal address
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Host::Address(ip) => Some(*ip),
            Host::Domain(_) => None,
        }
    }
}

impl From<IpAddr> for Host {
    fn from(ip: IpAddr) -> Self {
        Host::Address(ip)
    }
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bare = s.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(Host::Address(ip));
        }
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '@' || c == ';') {
            return Err(Error::InvalidUri(format!("invalid host '{}'", s)));
        }
        Ok(Host::Domain(s.to_string()))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Domain(domain) => f.write_str(domain),
            Host::Address(IpAddr::V6(ip)) => write!(f, "[{}]", ip),
            Host::Address(ip) => write!(f, "{}", ip),
        }
    }
}

/// A SIP URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub host: Host,
    pub port: Option<u16>,
    pub parameters: Vec<Param>,
}

impl Uri {
    pub fn new(scheme: Scheme, host: Host) -> Self {
        Uri {
            scheme,
            user: None,
            host,
            port: None,
            parameters: Vec::new(),
        }
    }

    /// A `sip:` URI pointing at a socket address
    pub fn sip_addr(addr: SocketAddr) -> Self {
        Uri::new(Scheme::Sip, Host::Address(addr.ip())).with_port(addr.port())
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the user part only when one is given
    pub fn with_user_opt(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_port_opt(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_parameter(mut self, param: Param) -> Self {
        self.parameters.push(param);
        self
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for param in &self.parameters {
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (scheme, rest) = if let Some(rest) = s.strip_prefix("sips:") {
            (Scheme::Sips, rest)
        } else if let Some(rest) = s.strip_prefix("sip:") {
            (Scheme::Sip, rest)
        } else {
            return Err(Error::InvalidUri(format!("unsupported scheme in '{}'", s)));
        };

        let (addr_part, params) = match rest.split_once(';') {
            Some((addr, params)) => (addr, parse_params(params)),
            None => (rest, Vec::new()),
        };

        let (user, hostport) = match addr_part.rsplit_once('@') {
            Some((user, hostport)) if !user.is_empty() => (Some(user.to_string()), hostport),
            Some(_) => return Err(Error::InvalidUri(format!("empty user part in '{}'", s))),
            None => (None, addr_part),
        };

        let (host, port) = split_host_port(hostport)
            .ok_or_else(|| Error::InvalidUri(format!("invalid host/port in '{}'", s)))?;

        Ok(Uri {
            scheme,
            user,
            host: host.parse()?,
            port,
            parameters: params,
        })
    }
}

// Handles `host`, `host:port`, `[v6]` and `[v6]:port`.
fn split_host_port(input: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = input.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        return match after.strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None if after.is_empty() => Some((host, None)),
            None => None,
        };
    }
    match input.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Some((host, Some(port.parse().ok()?))),
        // bare IPv6 without brackets
        Some(_) => Some((input, None)),
        None => Some((input, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_parse_and_display() {
        let uri: Uri = "sip:bob@example.com:5060;lr".parse().unwrap();
        assert_eq!(uri.scheme, Scheme::Sip);
        assert_eq!(uri.user.as_deref(), Some("bob"));
        assert_eq!(uri.host, Host::Domain("example.com".into()));
        assert_eq!(uri.port, Some(5060));
        assert_eq!(uri.parameters, vec![Param::Lr]);
        assert_eq!(uri.to_string(), "sip:bob@example.com:5060;lr");
    }

    #[test]
    fn test_ipv6_host() {
        let uri: Uri = "sip:carol@[2001:db8::1]:5080".parse().unwrap();
        assert_eq!(uri.host, Host::Address(IpAddr::V6("2001:db8::1".parse::<Ipv6Addr>().unwrap())));
        assert_eq!(uri.port, Some(5080));
        assert_eq!(uri.to_string(), "sip:carol@[2001:db8::1]:5080");
    }

    #[test]
    fn test_invalid_uris() {
        assert!("tel:+123".parse::<Uri>().is_err());
        assert!("sip:@example.com".parse::<Uri>().is_err());
        assert!("sip:bob@example.com:notaport".parse::<Uri>().is_err());
    }
}
