//! UDP transport carrying one CEC frame per datagram
//!
//! Listens on a port. Outgoing frames go to the configured peer, or when
//! none is configured, to the last address that sent us a frame.
//!
//! Uses async tokio tasks for I/O:
//! - RX task: receives datagrams, tracks sender address, sends to channel
//! - TX task: receives from channel, sends to peer or last sender

use super::{Transport, TransportChannels};
use crate::constants::{
    CHANNEL_CAPACITY, MAX_SOCKET_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS, SHUTDOWN_POLL_MS,
    UDP_BUFFER_SIZE,
};
use crate::error::{CecError, Result};
use bytes::Bytes;
use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// UDP frame transport
///
/// ```ignore
/// let transport = UdpTransport::new(9300, None);
/// let channels = transport.spawn(shutdown)?;
/// ```
pub struct UdpTransport {
    port: u16,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    pub fn new(port: u16, peer: Option<SocketAddr>) -> Self {
        Self { port, peer }
    }
}

impl Transport for UdpTransport {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        let socket = create_reusable_udp_socket(self.port)?;

        // Reply address: fixed peer, else last sender
        let reply_addr: Arc<RwLock<Option<SocketAddr>>> = Arc::new(RwLock::new(self.peer));
        let fixed_peer = self.peer.is_some();

        // RX task
        let socket_rx = socket.clone();
        let addr_store = reply_addr.clone();
        let shutdown_rx = shutdown.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; UDP_BUFFER_SIZE];

            while !shutdown_rx.load(Ordering::Relaxed) {
                match tokio::time::timeout(
                    Duration::from_millis(SHUTDOWN_POLL_MS),
                    socket_rx.recv_from(&mut buf),
                )
                .await
                {
                    Ok(Ok((len, addr))) => {
                        if !fixed_peer {
                            *addr_store.write() = Some(addr);
                        }
                        if in_tx
                            .send(Bytes::copy_from_slice(&buf[..len]))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        debug!("UDP recv error: {}", e);
                    }
                    Err(_) => {
                        // Timeout, re-check shutdown flag
                    }
                }
            }
        });

        // TX task
        let socket_tx = socket;
        let addr_read = reply_addr;
        let shutdown_tx = shutdown;
        tokio::spawn(async move {
            while !shutdown_tx.load(Ordering::Relaxed) {
                match tokio::time::timeout(
                    Duration::from_millis(SHUTDOWN_POLL_MS),
                    out_rx.recv(),
                )
                .await
                {
                    Ok(Some(frame)) => {
                        // Copy out before await; the guard must not cross it
                        let addr_opt = *addr_read.read();
                        match addr_opt {
                            Some(addr) => {
                                if let Err(e) = socket_tx.send_to(&frame, addr).await {
                                    warn!("UDP send to {} failed: {}", addr, e);
                                }
                            }
                            None => debug!("No peer yet, dropping outgoing frame"),
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {}
                }
            }
        });

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}

/// Create a UDP socket with SO_REUSEADDR for quick rebind after restart
///
/// Retries a few times if the port is still in use.
fn create_reusable_udp_socket(port: u16) -> Result<Arc<UdpSocket>> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let map_err = |e| CecError::UdpBind { port, source: e };

    for attempt in 0..MAX_SOCKET_RETRY_ATTEMPTS {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(map_err)?;
        socket.set_reuse_address(true).map_err(map_err)?;
        socket.set_nonblocking(true).map_err(map_err)?;

        match socket.bind(&addr.into()) {
            Ok(_) => {
                let std_socket: std::net::UdpSocket = socket.into();
                let tokio_socket = UdpSocket::from_std(std_socket).map_err(map_err)?;
                return Ok(Arc::new(tokio_socket));
            }
            Err(_) if attempt < MAX_SOCKET_RETRY_ATTEMPTS - 1 => {
                // Exponential backoff: 200ms, 400ms, 800ms, 1600ms
                std::thread::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt)));
            }
            Err(e) => return Err(map_err(e)),
        }
    }

    Err(CecError::UdpBind {
        port,
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "failed after retries"),
    })
}
