//! Live UDP socket source

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{info, trace};

use crate::source::DatagramSource;
use crate::types::{Datagram, unix_now};
use crate::{GatewayError, Result};

/// Largest datagram the gateway accepts; longer payloads are truncated by the OS.
pub const MAX_DATAGRAM: usize = 4096;

/// Default receive timeout before the source reports "no data yet" internally.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Source reading datagrams from a bound UDP socket
pub struct UdpSource {
    socket: UdpSocket,
    local_addr: SocketAddr,
    recv_timeout: Duration,
    buf: Box<[u8]>,
}

impl UdpSource {
    /// Bind a UDP socket on `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket =
            UdpSocket::bind(addr).await.map_err(|source| GatewayError::Bind { addr, source })?;
        let local_addr =
            socket.local_addr().map_err(|source| GatewayError::Bind { addr, source })?;

        info!("UDP source listening on {}", local_addr);

        Ok(Self {
            socket,
            local_addr,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            buf: vec![0u8; MAX_DATAGRAM].into_boxed_slice(),
        })
    }

    /// Set how long a single receive waits before looping.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Address the socket is actually bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpSource {
    async fn next_datagram(&mut self) -> Result<Option<Datagram>> {
        loop {
            // recv_from is cancel-safe, and so is wrapping it in a timeout.
            match tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut self.buf)).await
            {
                Ok(Ok((len, peer))) => {
                    let arrival = unix_now();
                    trace!("Received {} bytes from {}", len, peer);
                    return Ok(Some(Datagram::new(&self.buf[..len], Some(peer), arrival)));
                }
                Ok(Err(source)) => return Err(GatewayError::Receive { source }),
                Err(_) => {
                    trace!("Receive timeout, no data yet");
                    continue;
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.local_addr)
    }
}
