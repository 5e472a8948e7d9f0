//! Session Description Protocol (RFC 4566)
//!
//! The [`SdpSession`] model covers what an audio gateway exchanges: origin,
//! connection data, timing, media descriptions and attributes. Parsing lives
//! in [`parser`]; serialization is the `Display` impl.

pub mod parser;
pub mod session;

pub use parser::parse_sdp;
pub use session::{
    address_type, Attribute, ConnectionData, MediaDescription, Origin, SdpSession, TimeDescription,
    NET_TYPE_IN,
};
