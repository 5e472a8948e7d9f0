//! Sending finished messages as single UDP datagrams

use std::net::SocketAddr;

use sipbridge_sip_core::prelude::*;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::{Error, Result};

async fn send_datagram(socket: &UdpSocket, destination: SocketAddr, data: &[u8], what: String) -> Result<()> {
    trace!("Sending {} bytes to {}", data.len(), destination);
    match socket.send_to(data, destination).await {
        Ok(_) => {
            debug!("Sent {} to {}", what, destination);
            Ok(())
        }
        Err(source) => Err(Error::Send { what, source }),
    }
}

/// Sends `response` to `destination`.
///
/// Fails with "failed to send <code> <reason> response" when the write fails.
pub async fn send_response(socket: &UdpSocket, destination: SocketAddr, response: &Response) -> Result<()> {
    let what = format!("{} {} response", response.status_code(), response.reason);
    send_datagram(socket, destination, &response.to_bytes(), what).await
}

/// Sends `request` to `destination`.
///
/// Fails with "failed to send <METHOD> request" when the write fails.
pub async fn send_request(socket: &UdpSocket, destination: SocketAddr, request: &Request) -> Result<()> {
    let what = format!("{} request", request.method);
    send_datagram(socket, destination, &request.to_bytes(), what).await
}
