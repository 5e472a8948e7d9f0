//! # sipbridge-sip-core
//!
//! SIP message model and SDP session descriptions for the sipbridge gateway.
//!
//! This crate does not own a transport. Messages arrive already parsed from
//! the transport layer and leave as [`Request`]/[`Response`] values that the
//! caller serializes with `to_bytes()`.
//!
//! - [`types`]: methods, URIs, name-addr values, Via, CSeq, typed headers,
//!   status codes and the request/response messages themselves
//! - [`sdp`]: session descriptions, their parser and their wire format
//!
//! Most users will want the [`prelude`].

pub mod error;
#[cfg(feature = "sdp")]
pub mod sdp;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    Address, CSeq, CallId, HeaderAccess, HeaderName, Host, MaxForwards, Message, Method, Param,
    Request, Response, Scheme, StatusCode, TypedHeader, Uri, Via,
};

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        Address, CSeq, CallId, HeaderAccess, HeaderName, Host, MaxForwards, Message, Method,
        Param, Request, Response, Scheme, StatusCode, TypedHeader, Uri, Via, BRANCH_MAGIC_COOKIE,
        SIP_VERSION,
    };

    #[cfg(feature = "sdp")]
    pub use crate::sdp::{Attribute, ConnectionData, MediaDescription, Origin, SdpSession};
}
