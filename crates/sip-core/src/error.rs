use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or reading SIP and SDP values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid SIP method
    #[error("Invalid SIP method: {0}")]
    InvalidMethod(String),

    /// Invalid SIP URI
    #[error("Invalid SIP URI: {0}")]
    InvalidUri(String),

    /// A header the operation depends on is not present
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    /// CSeq cannot be incremented past `u32::MAX`
    #[error("CSeq {0} cannot be incremented")]
    CSeqExhausted(u32),

    /// Malformed SDP body
    #[error("SDP parsing error: {0}")]
    SdpParse(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Error::SdpParse(format!("Parsing failed: {err}"))
    }
}
