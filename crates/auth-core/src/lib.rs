//! # sipbridge-auth-core
//!
//! SIP digest authentication (RFC 2617, RFC 7616).
//!
//! When a registrar or proxy answers with `401 Unauthorized`, [`authorize`]
//! takes the `WWW-Authenticate` value and the configured [`Credentials`] and
//! produces the request to send next: a copy with the CSeq bumped and an
//! `Authorization` header attached. Retrying is up to the caller.

pub mod authorize;
pub mod credentials;
pub mod digest;
pub mod error;

pub use authorize::authorize;
pub use credentials::Credentials;
pub use digest::{compute_response, Algorithm, DigestChallenge, DigestInput, DigestResponse};
pub use error::{AuthError, Result};
