use std::fmt;

use serde::{Deserialize, Serialize};

/// A header or URI parameter.
///
/// Parameters render with their leading `;`, so a list of them can be written
/// straight after the value they decorate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    /// The `branch` parameter of a Via header, the transaction identifier.
    Branch(String),
    /// The `tag` parameter of From/To, one half of the dialog identifier.
    Tag(String),
    /// The `rport` parameter (RFC 3581); a bare flag when the value is unknown.
    Rport(Option<u16>),
    /// The `lr` (loose routing) flag.
    Lr,
    /// The `ob` (outbound, RFC 5626) flag on a Contact URI.
    Ob,
    /// The `expires` parameter.
    Expires(u32),
    /// Generic parameter represented as key-value.
    Other(String, Option<String>),
}

impl Param {
    pub fn branch(value: impl Into<String>) -> Self {
        Param::Branch(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Param::Tag(value.into())
    }

    /// Parameter name as it appears on the wire
    pub fn key(&self) -> &str {
        match self {
            Param::Branch(_) => "branch",
            Param::Tag(_) => "tag",
            Param::Rport(_) => "rport",
            Param::Lr => "lr",
            Param::Ob => "ob",
            Param::Expires(_) => "expires",
            Param::Other(key, _) => key.as_str(),
        }
    }

    /// Builds a parameter from a `key[=value]` pair, using the typed variant
    /// when the key is known.
    pub fn from_pair(key: &str, value: Option<&str>) -> Self {
        match (key.to_ascii_lowercase().as_str(), value) {
            ("branch", Some(v)) => Param::Branch(v.to_string()),
            ("tag", Some(v)) => Param::Tag(v.to_string()),
            ("rport", None) => Param::Rport(None),
            ("rport", Some(v)) => match v.parse() {
                Ok(port) => Param::Rport(Some(port)),
                Err(_) => Param::Other(key.to_string(), Some(v.to_string())),
            },
            ("lr", None) => Param::Lr,
            ("ob", None) => Param::Ob,
            ("expires", Some(v)) => match v.parse() {
                Ok(secs) => Param::Expires(secs),
                Err(_) => Param::Other(key.to_string(), Some(v.to_string())),
            },
            _ => Param::Other(key.to_string(), value.map(str::to_string)),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Branch(val) => write!(f, ";branch={}", val),
            Param::Tag(val) => write!(f, ";tag={}", val),
            Param::Rport(Some(port)) => write!(f, ";rport={}", port),
            Param::Rport(None) => write!(f, ";rport"),
            Param::Lr => write!(f, ";lr"),
            Param::Ob => write!(f, ";ob"),
            Param::Expires(val) => write!(f, ";expires={}", val),
            Param::Other(key, Some(val)) => write!(f, ";{}={}", key, val),
            Param::Other(key, None) => write!(f, ";{}", key),
        }
    }
}

/// Splits `;k=v;flag` style parameter text into typed parameters.
pub(crate) fn parse_params(input: &str) -> Vec<Param> {
    input
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => Param::from_pair(k.trim(), Some(v.trim())),
            None => Param::from_pair(p, None),
        })
        .collect()
}
