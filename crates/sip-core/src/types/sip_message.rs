//! # SIP Messages
//!
//! [`Request`] and [`Response`] as handed over by the transport layer, and as
//! built by the gateway before being serialized onto a UDP socket.
//!
//! A message is a plain value: a start line, an ordered list of
//! [`TypedHeader`]s and a body. `Clone` is a deep copy.
//!
//! ```rust
//! use sipbridge_sip_core::prelude::*;
//!
//! let request = Request::new(Method::Bye, "sip:bob@192.0.2.4".parse().unwrap())
//!     .with_header(TypedHeader::CallId(CallId::new("a84b4c76e66710")))
//!     .with_header(TypedHeader::CSeq(CSeq::new(2, Method::Bye)));
//!
//! assert_eq!(request.cseq().map(|c| c.seq), Some(2));
//! assert!(request.to_string().starts_with("BYE sip:bob@192.0.2.4 SIP/2.0\r\n"));
//! ```

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::address::Address;
use crate::types::cseq::CSeq;
use crate::types::header::{CallId, HeaderName, MaxForwards, TypedHeader};
use crate::types::method::Method;
use crate::types::status::StatusCode;
use crate::types::uri::Uri;
use crate::types::via::Via;

/// Protocol version written on every start line
pub const SIP_VERSION: &str = "SIP/2.0";

/// Typed read access shared by requests and responses
pub trait HeaderAccess {
    fn headers(&self) -> &[TypedHeader];

    /// First header with the given name
    fn header(&self, name: &HeaderName) -> Option<&TypedHeader> {
        self.headers().iter().find(|h| h.name() == *name)
    }

    fn has_header(&self, name: &HeaderName) -> bool {
        self.header(name).is_some()
    }

    /// Topmost Via
    fn via(&self) -> Option<&Via> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::Via(via) => Some(via),
            _ => None,
        })
    }

    fn from(&self) -> Option<&Address> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::From(addr) => Some(addr),
            _ => None,
        })
    }

    fn to(&self) -> Option<&Address> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::To(addr) => Some(addr),
            _ => None,
        })
    }

    fn call_id(&self) -> Option<&CallId> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::CallId(id) => Some(id),
            _ => None,
        })
    }

    fn cseq(&self) -> Option<&CSeq> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::CSeq(cseq) => Some(cseq),
            _ => None,
        })
    }

    fn contact(&self) -> Option<&Address> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::Contact(addr) => Some(addr),
            _ => None,
        })
    }

    fn max_forwards(&self) -> Option<MaxForwards> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::MaxForwards(hops) => Some(*hops),
            _ => None,
        })
    }

    /// Raw value of the first header with this name, e.g. `Authorization`
    fn header_value(&self, name: &HeaderName) -> Option<String> {
        self.header(name).map(|h| {
            let line = h.to_string();
            line.split_once(": ").map(|(_, v)| v.to_string()).unwrap_or_default()
        })
    }
}

fn replace_or_push(headers: &mut Vec<TypedHeader>, header: TypedHeader) {
    let name = header.name();
    match headers.iter_mut().find(|h| h.name() == name) {
        Some(existing) => *existing = header,
        None => headers.push(header),
    }
}

fn write_message(f: &mut fmt::Formatter<'_>, headers: &[TypedHeader], body: &Bytes) -> fmt::Result {
    for header in headers {
        write!(f, "{}\r\n", header)?;
    }
    f.write_str("\r\n")?;
    f.write_str(&String::from_utf8_lossy(body))
}

/// A SIP request message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: String,
    pub headers: Vec<TypedHeader>,
    pub body: Bytes,
}

impl Request {
    /// Creates a SIP/2.0 request with no headers and an empty body
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            version: SIP_VERSION.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header, keeping order
    pub fn with_header(mut self, header: TypedHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn push_header(&mut self, header: TypedHeader) {
        self.headers.push(header);
    }

    /// Replaces the first header with the same name, or appends it
    pub fn set_header(&mut self, header: TypedHeader) {
        replace_or_push(&mut self.headers, header);
    }

    /// Sets the body and its Content-Length header
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers.retain(|h| h.name() != HeaderName::ContentLength);
        self.headers.push(TypedHeader::ContentLength(self.body.len() as u32));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Wire representation
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

impl HeaderAccess for Request {
    fn headers(&self) -> &[TypedHeader] {
        &self.headers
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\r\n", self.method, self.uri, self.version)?;
        write_message(f, &self.headers, &self.body)
    }
}

/// A SIP response message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub version: String,
    pub headers: Vec<TypedHeader>,
    pub body: Bytes,
}

impl Response {
    /// Creates a response with the canonical reason phrase
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            reason: status.reason_phrase().to_string(),
            version: SIP_VERSION.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Starts a response to `request`, copying the headers RFC 3261
    /// Section 8.2.6.2 requires: every Via, From, To, Call-ID and CSeq.
    pub fn from_request(request: &Request, status: StatusCode) -> Result<Self> {
        let mut response = Response::new(status);
        let vias = request
            .headers
            .iter()
            .filter(|h| matches!(h, TypedHeader::Via(_)))
            .cloned()
            .collect::<Vec<_>>();
        if vias.is_empty() {
            return Err(Error::MissingHeader("Via"));
        }
        response.headers.extend(vias);
        let from = request.from().ok_or(Error::MissingHeader("From"))?;
        let to = request.to().ok_or(Error::MissingHeader("To"))?;
        let call_id = request.call_id().ok_or(Error::MissingHeader("Call-ID"))?;
        let cseq = request.cseq().ok_or(Error::MissingHeader("CSeq"))?;
        response.headers.push(TypedHeader::From(from.clone()));
        response.headers.push(TypedHeader::To(to.clone()));
        response.headers.push(TypedHeader::CallId(call_id.clone()));
        response.headers.push(TypedHeader::CSeq(cseq.clone()));
        Ok(response)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_header(mut self, header: TypedHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn push_header(&mut self, header: TypedHeader) {
        self.headers.push(header);
    }

    pub fn set_header(&mut self, header: TypedHeader) {
        replace_or_push(&mut self.headers, header);
    }

    /// Mutable access to the To header, used to add the local tag
    pub fn to_mut(&mut self) -> Option<&mut Address> {
        self.headers.iter_mut().find_map(|h| match h {
            TypedHeader::To(addr) => Some(addr),
            _ => None,
        })
    }

    /// Sets the body and its Content-Length header
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers.retain(|h| h.name() != HeaderName::ContentLength);
        self.headers.push(TypedHeader::ContentLength(self.body.len() as u32));
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Wire representation
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

impl HeaderAccess for Response {
    fn headers(&self) -> &[TypedHeader] {
        &self.headers
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\r\n", self.version, self.status, self.reason)?;
        write_message(f, &self.headers, &self.body)
    }
}

/// Either kind of SIP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Message::Request(req) => req.to_bytes(),
            Message::Response(resp) => resp.to_bytes(),
        }
    }
}

impl From<Request> for Message {
    fn from(req: Request) -> Self {
        Message::Request(req)
    }
}

impl From<Response> for Message {
    fn from(resp: Response) -> Self {
        Message::Response(resp)
    }
}
