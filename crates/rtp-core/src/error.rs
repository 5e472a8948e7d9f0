use std::fmt;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Which half of a media pair an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketRole {
    Rtp,
    Rtcp,
}

impl fmt::Display for SocketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketRole::Rtp => f.write_str("RTP"),
            SocketRole::Rtcp => f.write_str("RTCP"),
        }
    }
}

/// A socket that failed to close
#[derive(Debug, Error)]
#[error("closing {role} connection: {source}")]
pub struct CloseFailure {
    pub role: SocketRole,
    #[source]
    pub source: io::Error,
}

/// Error type for media endpoint operations
#[derive(Debug, Error)]
pub enum Error {
    /// A UDP bind failed
    #[error("cannot bind {role} socket on {addr}: {source}")]
    Bind {
        role: SocketRole,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The local address of a socket could not be read
    #[error("cannot read local address of {role} socket: {source}")]
    LocalAddr {
        role: SocketRole,
        #[source]
        source: io::Error,
    },

    /// RTCP is not on the port right after RTP
    #[error("RTCP port {rtcp} does not follow RTP port {rtp}")]
    NotAdjacent { rtp: u16, rtcp: u16 },

    /// One or both sockets failed to close
    #[error("{}", join_failures(.0))]
    Close(Vec<CloseFailure>),
}

fn join_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for media endpoint operations
pub type Result<T> = std::result::Result<T, Error>;
