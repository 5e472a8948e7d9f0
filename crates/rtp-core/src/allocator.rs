//! RTP/RTCP port pair allocation.
//!
//! RTP is bound to an ephemeral port on the reference address's IP (and IPv6
//! scope); RTCP is then bound to exactly the next port. There is no retry and
//! no port search: if `rtp + 1` is taken the allocation fails and the RTP
//! socket is released before returning.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::error::{CloseFailure, Error, Result, SocketRole};

/// Two sockets on the same IP, RTCP on the port after RTP.
///
/// The pair owns both sockets. [`MediaPair::close`] releases them together;
/// dropping the pair does the same without reporting errors.
#[derive(Debug)]
pub struct MediaPair<S = UdpSocket> {
    rtp: S,
    rtcp: S,
}

impl<S: Endpoint> MediaPair<S> {
    /// Pairs two already-bound endpoints, checking the port invariant
    pub fn from_parts(rtp: S, rtcp: S) -> Result<Self> {
        let rtp_port = local_addr(&rtp, SocketRole::Rtp)?.port();
        let rtcp_port = local_addr(&rtcp, SocketRole::Rtcp)?.port();
        if rtp_port.checked_add(1) != Some(rtcp_port) {
            return Err(Error::NotAdjacent {
                rtp: rtp_port,
                rtcp: rtcp_port,
            });
        }
        Ok(MediaPair { rtp, rtcp })
    }

    pub fn rtp(&self) -> &S {
        &self.rtp
    }

    pub fn rtcp(&self) -> &S {
        &self.rtcp
    }

    pub fn rtp_addr(&self) -> Result<SocketAddr> {
        local_addr(&self.rtp, SocketRole::Rtp)
    }

    pub fn rtcp_addr(&self) -> Result<SocketAddr> {
        local_addr(&self.rtcp, SocketRole::Rtcp)
    }

    /// Hands both sockets to the caller, who becomes responsible for closing them
    pub fn into_parts(self) -> (S, S) {
        (self.rtp, self.rtcp)
    }

    /// Closes both sockets. Both are always attempted; every failure is
    /// reported.
    pub fn close(self) -> Result<()> {
        let mut failures = Vec::new();
        if let Err(source) = self.rtp.close() {
            failures.push(CloseFailure {
                role: SocketRole::Rtp,
                source,
            });
        }
        if let Err(source) = self.rtcp.close() {
            failures.push(CloseFailure {
                role: SocketRole::Rtcp,
                source,
            });
        }
        if failures.is_empty() {
            Ok(())
        } else {
            warn!("Failed to close {} media socket(s)", failures.len());
            Err(Error::Close(failures))
        }
    }
}

fn local_addr<S: Endpoint>(socket: &S, role: SocketRole) -> Result<SocketAddr> {
    socket
        .local_addr()
        .map_err(|source| Error::LocalAddr { role, source })
}

async fn bind(addr: SocketAddr, role: SocketRole) -> Result<UdpSocket> {
    UdpSocket::bind(addr)
        .await
        .map_err(|source| Error::Bind { role, addr, source })
}

/// Allocates a fresh RTP/RTCP pair on the IP of `reference`.
///
/// The port of `reference` is ignored. An IPv6 scope id is carried over to
/// both binds.
pub async fn allocate(reference: SocketAddr) -> Result<MediaPair> {
    let mut rtp_bind = reference;
    rtp_bind.set_port(0);
    let rtp = bind(rtp_bind, SocketRole::Rtp).await?;
    let rtp_addr = local_addr(&rtp, SocketRole::Rtp)?;

    let mut rtcp_bind = reference;
    let Some(rtcp_port) = rtp_addr.port().checked_add(1) else {
        return Err(Error::Bind {
            role: SocketRole::Rtcp,
            addr: rtcp_bind,
            source: std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "RTP port is the last port of the range",
            ),
        });
    };
    rtcp_bind.set_port(rtcp_port);

    let rtcp = match bind(rtcp_bind, SocketRole::Rtcp).await {
        Ok(rtcp) => rtcp,
        Err(e) => {
            debug!("RTCP bind on {} failed, releasing RTP socket {}", rtcp_bind, rtp_addr);
            drop(rtp);
            return Err(e);
        }
    };

    debug!("Allocated media pair RTP={} RTCP={}", rtp_addr, rtcp_bind);
    Ok(MediaPair { rtp, rtcp })
}

/// Allocates a pair on the IP an existing endpoint is bound to
pub async fn allocate_for<E: Endpoint>(endpoint: &E) -> Result<MediaPair> {
    let reference = endpoint
        .local_addr()
        .map_err(|source| Error::LocalAddr {
            role: SocketRole::Rtp,
            source,
        })?;
    allocate(reference).await
}
