//! Error types for authentication operations

use sipbridge_sip_core::Error as SipError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Credentials are configured but the caller had no challenge to answer
    #[error("www-authenticate header required")]
    MissingChallenge,

    #[error("failed to parse challenge {challenge}: {reason}")]
    ChallengeParse { challenge: String, reason: String },

    /// The challenge asks for something we cannot compute
    #[error("failed to solve challenge: {0}")]
    DigestCompute(String),

    #[error("request has no {0} header")]
    MissingHeader(&'static str),

    /// The retried request cannot take the next CSeq
    #[error(transparent)]
    Sip(#[from] SipError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
