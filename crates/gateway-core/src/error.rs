//! Error types for gateway operations

use std::io;

use sipbridge_auth_core::AuthError;
use sipbridge_rtp_core::Error as MediaError;
use sipbridge_sip_core::Error as SipError;
use thiserror::Error;

/// Error type for negotiation, request construction and dispatch
#[derive(Debug, Error)]
pub enum Error {
    /// The SDP body is empty or malformed
    #[error("parsing remote SDP: {0}")]
    Parse(String),

    /// Valid SDP without any media description
    #[error("no media descriptions in SDP")]
    NoMedia,

    /// The first media description offers no formats
    #[error("no formats in media description")]
    NoFormats,

    /// Binding or inspecting media sockets failed
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An invalid SIP value, such as an unparsable registrar host
    #[error(transparent)]
    Sip(SipError),

    /// Writing a datagram failed
    #[error("failed to send {what}: {source}")]
    Send {
        what: String,
        #[source]
        source: io::Error,
    },

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// The inbound Max-Forwards cannot be decremented
    #[error("Max-Forwards exhausted")]
    TooManyHops,

    #[error("user {0:?} not found in directory")]
    UserNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// A failure annotated with the step it happened in
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// A failure after which the media sockets could not be closed cleanly
    #[error("{primary}; {cleanup}")]
    MediaCleanup {
        primary: Box<Error>,
        cleanup: MediaError,
    },
}

impl Error {
    /// Wraps the error with the name of the step that failed
    pub fn context(self, context: &'static str) -> Self {
        Error::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through context and cleanup wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            Error::MediaCleanup { primary, .. } => primary.root(),
            other => other,
        }
    }
}

impl From<SipError> for Error {
    fn from(err: SipError) -> Self {
        match err {
            SipError::MissingHeader(name) => Error::MissingHeader(name),
            other => Error::Sip(other),
        }
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain() {
        let err = Error::NoFormats.context("creating SDP response");
        assert_eq!(err.to_string(), "creating SDP response: no formats in media description");
        assert!(matches!(err.root(), Error::NoFormats));
    }

    #[test]
    fn test_sip_error_conversion() {
        assert!(matches!(Error::from(SipError::MissingHeader("To")), Error::MissingHeader("To")));
        assert!(matches!(Error::from(SipError::InvalidUri("bad".into())), Error::Sip(_)));
    }
}
