//! # Datagram Sender
//!
//! Sends each batch as exactly one UDP datagram. There is no sequencing,
//! acknowledgement or retransmission; a batch that fails to send is gone.
//!
//! The destination host is resolved on the first send and the address is
//! cached. After any send failure the cache is dropped so the next batch
//! resolves the host again.

use crate::config::DestinationConfig;
use crate::error::TransportError;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::debug;

/// UDP socket plus the destination it sends every batch to.
pub struct DatagramSender {
    socket: UdpSocket,
    host: String,
    port: u16,
    resolved: Option<SocketAddr>,
}

impl DatagramSender {
    /// Bind the local socket described by `destination.bind_addr`.
    pub async fn bind(destination: &DestinationConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(&destination.bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: destination.bind_addr.clone(),
                source,
            })?;

        Ok(Self {
            socket,
            host: destination.host.trim().to_string(),
            port: destination.port,
            resolved: None,
        })
    }

    /// Address the local socket is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn destination(&mut self) -> Result<SocketAddr, TransportError> {
        if let Some(addr) = self.resolved {
            return Ok(addr);
        }

        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|source| TransportError::Resolve {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;

        let addr = addrs.next().ok_or_else(|| TransportError::NoAddress {
            host: self.host.clone(),
            port: self.port,
        })?;

        debug!(%addr, host = %self.host, "Resolved destination");
        self.resolved = Some(addr);
        Ok(addr)
    }

    /// Send `payload` as one datagram.
    pub async fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError> {
        let addr = self.destination().await?;

        self.socket.send_to(payload, addr).await.map_err(|err| {
            self.resolved = None;
            TransportError::Send(err)
        })
    }
}
