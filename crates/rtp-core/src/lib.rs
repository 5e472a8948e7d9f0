//! # sipbridge-rtp-core
//!
//! Media endpoint allocation for the sipbridge gateway.
//!
//! Every call leg needs an RTP socket and an RTCP socket on the next port.
//! This crate binds them ([`allocate`]), keeps them together
//! ([`MediaPair`]) and describes the minimal socket capability the
//! signaling code depends on ([`Endpoint`]). Moving media over the sockets
//! is left to the caller.

mod error;

pub mod allocator;
pub mod endpoint;

pub use allocator::{allocate, allocate_for, MediaPair};
pub use endpoint::Endpoint;
pub use error::{CloseFailure, Error, Result, SocketRole};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{allocate, allocate_for, Endpoint, Error, MediaPair, Result, SocketRole};
}
