//! Typed SIP headers.
//!
//! Messages hold their headers as an ordered list of [`TypedHeader`] values.
//! Every variant owns its data, so cloning a message deep-copies its headers
//! and a clone can be edited without touching the original.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::address::Address;
use crate::types::cseq::CSeq;
use crate::types::method::Method;
use crate::types::via::Via;

/// Names of the headers this crate works with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderName {
    Via,
    From,
    To,
    CallId,
    CSeq,
    Contact,
    Route,
    MaxForwards,
    Expires,
    ContentType,
    ContentLength,
    UserAgent,
    Allow,
    Supported,
    Accept,
    Authorization,
    WwwAuthenticate,
    Other(String),
}

impl HeaderName {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::From => "From",
            HeaderName::To => "To",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::Route => "Route",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::Expires => "Expires",
            HeaderName::ContentType => "Content-Type",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::UserAgent => "User-Agent",
            HeaderName::Allow => "Allow",
            HeaderName::Supported => "Supported",
            HeaderName::Accept => "Accept",
            HeaderName::Authorization => "Authorization",
            HeaderName::WwwAuthenticate => "WWW-Authenticate",
            HeaderName::Other(name) => name.as_str(),
        }
    }

    /// Case-insensitive lookup of a header name, including compact forms
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "via" | "v" => HeaderName::Via,
            "from" | "f" => HeaderName::From,
            "to" | "t" => HeaderName::To,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "contact" | "m" => HeaderName::Contact,
            "route" => HeaderName::Route,
            "max-forwards" => HeaderName::MaxForwards,
            "expires" => HeaderName::Expires,
            "content-type" | "c" => HeaderName::ContentType,
            "content-length" | "l" => HeaderName::ContentLength,
            "user-agent" => HeaderName::UserAgent,
            "allow" => HeaderName::Allow,
            "supported" | "k" => HeaderName::Supported,
            "accept" => HeaderName::Accept,
            "authorization" => HeaderName::Authorization,
            "www-authenticate" => HeaderName::WwwAuthenticate,
            _ => HeaderName::Other(name.to_string()),
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call-ID header value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(value: impl Into<String>) -> Self {
        CallId(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Max-Forwards header value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxForwards(pub u8);

impl MaxForwards {
    pub fn new(hops: u8) -> Self {
        MaxForwards(hops)
    }

    /// One hop fewer, or `None` when the request may not be forwarded again
    pub fn decremented(self) -> Option<Self> {
        self.0.checked_sub(1).map(MaxForwards)
    }
}

/// A header with its value parsed into a typed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedHeader {
    Via(Via),
    From(Address),
    To(Address),
    CallId(CallId),
    CSeq(CSeq),
    Contact(Address),
    Route(Address),
    MaxForwards(MaxForwards),
    /// Expires in seconds
    Expires(u32),
    ContentType(String),
    ContentLength(u32),
    UserAgent(String),
    Allow(Vec<Method>),
    Supported(Vec<String>),
    Accept(String),
    Authorization(String),
    WwwAuthenticate(String),
    /// Any header not covered above, kept as raw text
    Other(String, String),
}

impl TypedHeader {
    pub fn name(&self) -> HeaderName {
        match self {
            TypedHeader::Via(_) => HeaderName::Via,
            TypedHeader::From(_) => HeaderName::From,
            TypedHeader::To(_) => HeaderName::To,
            TypedHeader::CallId(_) => HeaderName::CallId,
            TypedHeader::CSeq(_) => HeaderName::CSeq,
            TypedHeader::Contact(_) => HeaderName::Contact,
            TypedHeader::Route(_) => HeaderName::Route,
            TypedHeader::MaxForwards(_) => HeaderName::MaxForwards,
            TypedHeader::Expires(_) => HeaderName::Expires,
            TypedHeader::ContentType(_) => HeaderName::ContentType,
            TypedHeader::ContentLength(_) => HeaderName::ContentLength,
            TypedHeader::UserAgent(_) => HeaderName::UserAgent,
            TypedHeader::Allow(_) => HeaderName::Allow,
            TypedHeader::Supported(_) => HeaderName::Supported,
            TypedHeader::Accept(_) => HeaderName::Accept,
            TypedHeader::Authorization(_) => HeaderName::Authorization,
            TypedHeader::WwwAuthenticate(_) => HeaderName::WwwAuthenticate,
            TypedHeader::Other(name, _) => HeaderName::from_name(name),
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypedHeader {
    /// Renders the full header line without the trailing CRLF
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedHeader::Other(name, value) => return write!(f, "{}: {}", name, value),
            _ => write!(f, "{}: ", self.name())?,
        }
        match self {
            TypedHeader::Via(via) => write!(f, "{}", via),
            TypedHeader::From(addr)
            | TypedHeader::To(addr)
            | TypedHeader::Contact(addr)
            | TypedHeader::Route(addr) => write!(f, "{}", addr),
            TypedHeader::CallId(id) => f.write_str(&id.0),
            TypedHeader::CSeq(cseq) => write!(f, "{}", cseq),
            TypedHeader::MaxForwards(hops) => write!(f, "{}", hops.0),
            TypedHeader::Expires(secs) => write!(f, "{}", secs),
            TypedHeader::ContentLength(len) => write!(f, "{}", len),
            TypedHeader::Allow(methods) => join(f, methods),
            TypedHeader::Supported(options) => join(f, options),
            TypedHeader::ContentType(v)
            | TypedHeader::UserAgent(v)
            | TypedHeader::Accept(v)
            | TypedHeader::Authorization(v)
            | TypedHeader::WwwAuthenticate(v) => f.write_str(v),
            TypedHeader::Other(..) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lines() {
        assert_eq!(TypedHeader::CallId(CallId::new("abc@host")).to_string(), "Call-ID: abc@host");
        assert_eq!(
            TypedHeader::Allow(vec![Method::Invite, Method::Ack, Method::Bye]).to_string(),
            "Allow: INVITE,ACK,BYE"
        );
        assert_eq!(TypedHeader::Other("X-Test".into(), "1".into()).to_string(), "X-Test: 1");
    }

    #[test]
    fn test_header_name_compact_forms() {
        assert_eq!(HeaderName::from_name("i"), HeaderName::CallId);
        assert_eq!(HeaderName::from_name("CONTENT-LENGTH"), HeaderName::ContentLength);
        assert_eq!(HeaderName::from_name("X-Custom"), HeaderName::Other("X-Custom".into()));
    }

    #[test]
    fn test_max_forwards_decrement() {
        assert_eq!(MaxForwards(70).decremented(), Some(MaxForwards(69)));
        assert_eq!(MaxForwards(0).decremented(), None);
    }
}
