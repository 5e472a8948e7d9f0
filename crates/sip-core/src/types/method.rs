//! # SIP Methods
//!
//! Request methods from [RFC 3261 Section 7.1](https://datatracker.ietf.org/doc/html/rfc3261#section-7.1)
//! and the common extensions a gateway advertises in its `Allow` header.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A SIP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Prack,
    Update,
    Info,
    Subscribe,
    Notify,
    Refer,
    Message,
    /// Any method not covered above
    Extension(String),
}

impl Method {
    /// Returns the method token as it appears on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Prack => "PRACK",
            Method::Update => "UPDATE",
            Method::Info => "INFO",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Refer => "REFER",
            Method::Message => "MESSAGE",
            Method::Extension(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let method = match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "REGISTER" => Method::Register,
            "OPTIONS" => Method::Options,
            "PRACK" => Method::Prack,
            "UPDATE" => Method::Update,
            "INFO" => Method::Info,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "REFER" => Method::Refer,
            "MESSAGE" => Method::Message,
            other if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)) => {
                Method::Extension(other.to_string())
            }
            other => return Err(Error::InvalidMethod(other.to_string())),
        };
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip() {
        for token in ["INVITE", "ACK", "BYE", "CANCEL", "REGISTER", "PUBLISH"] {
            let method = Method::from_str(token).unwrap();
            assert_eq!(method.to_string(), token);
        }
        assert_eq!(Method::from_str("PUBLISH").unwrap(), Method::Extension("PUBLISH".into()));
    }

    #[test]
    fn test_invalid_method() {
        assert!(Method::from_str("").is_err());
        assert!(Method::from_str("IN VITE").is_err());
    }
}
