//! SDP session and media description types (RFC 4566).
//!
//! Serialization through `Display` writes lines in the order RFC 4566
//! Section 5 mandates, each terminated by CRLF.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sdp::parser::parse_sdp;

/// Network type used on every `o=`/`c=` line we write
pub const NET_TYPE_IN: &str = "IN";

/// Address type token for an IP address: `IP4` for IPv4, `IP6` otherwise.
pub fn address_type(ip: &IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "IP4",
        IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => "IP4",
        IpAddr::V6(_) => "IP6",
    }
}

/// Origin (`o=`) line.
///
/// Format: `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Username of the originator (often "-")
    pub username: String,
    pub sess_id: u64,
    pub sess_version: u64,
    pub net_type: String,
    pub addr_type: String,
    pub unicast_address: String,
}

impl Origin {
    /// Origin for a locally generated description
    pub fn new(sess_id: u64, sess_version: u64, ip: IpAddr) -> Self {
        Origin {
            username: "-".to_string(),
            sess_id,
            sess_version,
            net_type: NET_TYPE_IN.to_string(),
            addr_type: address_type(&ip).to_string(),
            unicast_address: ip.to_string(),
        }
    }
}

/// Connection data (`c=`) line.
///
/// Format: `c=<nettype> <addrtype> <connection-address>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionData {
    pub net_type: String,
    pub addr_type: String,
    /// IP address or FQDN, potentially with `/ttl[/count]`
    pub connection_address: String,
}

impl ConnectionData {
    pub fn new(ip: IpAddr) -> Self {
        ConnectionData {
            net_type: NET_TYPE_IN.to_string(),
            addr_type: address_type(&ip).to_string(),
            connection_address: ip.to_string(),
        }
    }

    /// The address as an IP, ignoring any multicast TTL/count suffix
    pub fn ip(&self) -> Option<IpAddr> {
        self.connection_address.split('/').next()?.parse().ok()
    }
}

/// Timing (`t=`) line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDescription {
    pub start_time: u64,
    pub stop_time: u64,
}

/// Attribute (`a=`) line, either a flag (`a=sendrecv`) or a
/// `key:value` pair (`a=rtpmap:0 PCMU/8000`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn flag(key: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "a={}:{}", self.key, value),
            None => write!(f, "a={}", self.key),
        }
    }
}

/// Media description: an `m=` line and the lines that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescription {
    /// Media type, e.g. "audio"
    pub media: String,
    pub port: u16,
    pub port_count: Option<u16>,
    /// Transport protocol, e.g. "RTP/AVP"
    pub protocol: String,
    /// Format identifiers in the order they were offered
    pub formats: Vec<String>,
    pub connection: Option<ConnectionData>,
    pub attributes: Vec<Attribute>,
}

impl MediaDescription {
    pub fn new(media: impl Into<String>, port: u16, protocol: impl Into<String>, formats: Vec<String>) -> Self {
        MediaDescription {
            media: media.into(),
            port,
            port_count: None,
            protocol: protocol.into(),
            formats,
            connection: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// All attributes with the given key, in order
    pub fn attributes_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes.iter().filter(move |a| a.key == key)
    }

    /// Value of the first attribute with this key
    pub fn attribute_value(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }
}

/// A complete session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpSession {
    pub version: String,
    pub origin: Origin,
    pub session_name: String,
    pub connection: Option<ConnectionData>,
    pub time_descriptions: Vec<TimeDescription>,
    pub attributes: Vec<Attribute>,
    pub media_descriptions: Vec<MediaDescription>,
}

impl SdpSession {
    /// An empty `v=0` session with a permanent `t=0 0` timing line
    pub fn new(origin: Origin, session_name: impl Into<String>) -> Self {
        SdpSession {
            version: "0".to_string(),
            origin,
            session_name: session_name.into(),
            connection: None,
            time_descriptions: vec![TimeDescription {
                start_time: 0,
                stop_time: 0,
            }],
            attributes: Vec::new(),
            media_descriptions: Vec::new(),
        }
    }

    pub fn with_connection(mut self, connection: ConnectionData) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_media(mut self, media: MediaDescription) -> Self {
        self.media_descriptions.push(media);
        self
    }

    /// Parses an SDP body
    pub fn parse(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::SdpParse(format!("body is not UTF-8: {}", e)))?;
        parse_sdp(text)
    }
}

impl FromStr for SdpSession {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_sdp(s)
    }
}

impl fmt::Display for SdpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        let o = &self.origin;
        write!(
            f,
            "o={} {} {} {} {} {}\r\n",
            o.username, o.sess_id, o.sess_version, o.net_type, o.addr_type, o.unicast_address
        )?;
        write!(f, "s={}\r\n", self.session_name)?;
        if let Some(c) = &self.connection {
            write!(f, "c={} {} {}\r\n", c.net_type, c.addr_type, c.connection_address)?;
        }
        for t in &self.time_descriptions {
            write!(f, "t={} {}\r\n", t.start_time, t.stop_time)?;
        }
        for attribute in &self.attributes {
            write!(f, "{}\r\n", attribute)?;
        }
        for m in &self.media_descriptions {
            write!(f, "m={} {}", m.media, m.port)?;
            if let Some(count) = m.port_count {
                write!(f, "/{}", count)?;
            }
            write!(f, " {}", m.protocol)?;
            for format in &m.formats {
                write!(f, " {}", format)?;
            }
            f.write_str("\r\n")?;
            if let Some(c) = &m.connection {
                write!(f, "c={} {} {}\r\n", c.net_type, c.addr_type, c.connection_address)?;
            }
            for attribute in &m.attributes {
                write!(f, "{}\r\n", attribute)?;
            }
        }
        Ok(())
    }
}
