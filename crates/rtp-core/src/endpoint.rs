//! The connection capability the gateway needs from a socket.
//!
//! Signaling code only ever asks a socket for its local address and closes
//! it, so that is all this trait requires. Tests substitute fakes for it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Anything with a local address that can be closed
pub trait Endpoint {
    /// The bound local address
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Release the endpoint
    fn close(self) -> io::Result<()>;
}

impl Endpoint for tokio::net::UdpSocket {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        tokio::net::UdpSocket::local_addr(self)
    }

    fn close(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl Endpoint for std::net::UdpSocket {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        std::net::UdpSocket::local_addr(self)
    }

    fn close(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

/// A shared socket is closed by whoever holds the last handle.
impl<T: Endpoint> Endpoint for Arc<T> {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.as_ref().local_addr()
    }

    fn close(self) -> io::Result<()> {
        match Arc::try_unwrap(self) {
            Ok(inner) => inner.close(),
            Err(_shared) => Ok(()),
        }
    }
}
