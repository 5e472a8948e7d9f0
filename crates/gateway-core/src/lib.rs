//! # sipbridge-gateway-core
//!
//! Signaling core of a SIP-to-RTP gateway: the part that turns an incoming
//! INVITE into an SDP answer bound to freshly allocated media sockets, and
//! builds the other requests a relaying user agent sends (INVITE to the
//! callee, ACK, BYE, CANCEL, REGISTER).
//!
//! The crate does not own a transport loop or dialog state. Callers keep the
//! messages of each call and pass them back in; every builder returns a new
//! message value.
//!
//! ## Answering an INVITE
//!
//! ```rust,no_run
//! use sipbridge_gateway_core::prelude::*;
//! use tokio::net::UdpSocket;
//!
//! # async fn answer(invite: Request, caller: std::net::SocketAddr) -> Result<()> {
//! let sip = UdpSocket::bind("0.0.0.0:5060").await?;
//! let builder = RequestBuilder::new(GatewayConfig::default());
//!
//! let (negotiated, media) = builder.engine(&DEFAULT_CODECS).negotiate_fresh(&invite, &sip).await?;
//! send_response(&sip, caller, &negotiated.response).await?;
//! # drop(media);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod invite;
pub mod logging;
pub mod negotiation;

pub use builder::RequestBuilder;
pub use codec::{CodecEntry, CodecTable, DecodeParams, DEFAULT_CODECS};
pub use config::{GatewayConfig, DEFAULT_PTIME};
pub use directory::{StaticDirectory, UserDirectory};
pub use dispatch::{send_request, send_response};
pub use error::{Error, Result};
pub use ids::{IdGenerator, RandomIds};
pub use invite::OutboundInvite;
pub use logging::{setup_logging, LogSettings};
pub use negotiation::{
    parse_remote, MediaAddress, NegotiationEngine, Negotiated, RemoteMedia, RenegotiateError,
};

// Re-export the lower layers so callers need a single dependency
pub use sipbridge_auth_core as auth;
pub use sipbridge_rtp_core as rtp;
pub use sipbridge_sip_core as sip;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        parse_remote, send_request, send_response, CodecTable, Error, GatewayConfig, MediaAddress,
        NegotiationEngine, Negotiated, OutboundInvite, RemoteMedia, RenegotiateError, RequestBuilder, Result,
        StaticDirectory, UserDirectory, DEFAULT_CODECS,
    };
    pub use sipbridge_auth_core::{authorize, Credentials};
    pub use sipbridge_rtp_core::{Endpoint, MediaPair};
    pub use sipbridge_sip_core::prelude::*;
}
