use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::param::{parse_params, Param};
use crate::types::uri::Uri;

/// Represents a SIP Name Address (Display Name <URI>; params).
///
/// Used for From, To, Contact and Route headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: Vec<Param>,
}

impl Address {
    pub fn new(uri: Uri) -> Self {
        Address {
            display_name: None,
            uri,
            params: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// The `tag` header parameter, if present
    pub fn tag(&self) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            Param::Tag(tag) => Some(tag.as_str()),
            _ => None,
        })
    }

    /// Sets or replaces the `tag` parameter
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.retain(|p| !matches!(p, Param::Tag(_)));
        self.params.push(Param::Tag(tag.into()));
    }
}

// Quotes are needed unless the display name is a plain token.
fn needs_quoting(display_name: &str) -> bool {
    display_name
        .chars()
        .any(|c| !c.is_alphanumeric() && !matches!(c, '-' | '.' | '!' | '%' | '*' | '_' | '+' | '`' | '\'' | '~'))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if needs_quoting(name) {
                write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
            } else {
                write!(f, "{} ", name)?;
            }
        }
        write!(f, "<{}>", self.uri)?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.find('<') {
            Some(open) => {
                let close = s[open..]
                    .find('>')
                    .map(|i| open + i)
                    .ok_or_else(|| Error::InvalidUri(format!("unterminated '<' in '{}'", s)))?;
                let name = s[..open].trim().trim_matches('"').trim();
                let uri: Uri = s[open + 1..close].parse()?;
                Ok(Address {
                    display_name: (!name.is_empty()).then(|| name.to_string()),
                    uri,
                    params: parse_params(&s[close + 1..]),
                })
            }
            // Without angle brackets, parameters belong to the header, not the URI.
            None => {
                let (uri, params) = match s.split_once(';') {
                    Some((uri, params)) => (uri, parse_params(params)),
                    None => (s, Vec::new()),
                };
                Ok(Address {
                    display_name: None,
                    uri: uri.parse()?,
                    params,
                })
            }
        }
    }
}
