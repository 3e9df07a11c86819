//! UDP transport adapter
//!
//! Datagram-per-frame transport with a host-supplied peer table: the host
//! decides who is reachable (topology is supplied, not computed), the
//! adapter moves frames.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::warn;

use murmur_core::{MurmurError, MurmurResult, Packet};
use murmur_wire::MAX_FRAME_SIZE;

use crate::{RawMessage, SendFuture, Transport};

/// Default capacity of a subscriber's inbound channel
pub const DEFAULT_INBOUND_BUFFER: usize = 1024;

/// UDP adapter configuration
#[derive(Clone, Debug)]
pub struct UdpConfig {
    /// Capacity of each subscriber's inbound channel
    pub inbound_buffer: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        UdpConfig {
            inbound_buffer: DEFAULT_INBOUND_BUFFER,
        }
    }
}

type Subscribers = Arc<Mutex<Vec<mpsc::Sender<RawMessage<SocketAddr>>>>>;

/// UDP transport with a host-maintained peer table
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    peers: RwLock<Vec<SocketAddr>>,
    subscribers: Subscribers,
    recv_loop: Mutex<Option<JoinHandle<()>>>,
    config: UdpConfig,
}

impl UdpTransport {
    /// Bind to a local address with default configuration
    pub async fn bind(addr: SocketAddr) -> MurmurResult<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind to a local address
    pub async fn bind_with_config(addr: SocketAddr, config: UdpConfig) -> MurmurResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| MurmurError::Transport(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| MurmurError::Transport(e.to_string()))?;

        Ok(UdpTransport {
            socket: Arc::new(socket),
            local_addr,
            peers: RwLock::new(Vec::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            recv_loop: Mutex::new(None),
            config,
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Add a reachable peer; no-op if already present
    pub fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.write();
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }

    /// Remove a peer from the table
    pub fn remove_peer(&self, addr: SocketAddr) {
        self.peers.write().retain(|p| *p != addr);
    }

    /// Replace the whole peer table
    pub fn set_peers(&self, peers: Vec<SocketAddr>) {
        *self.peers.write() = peers;
    }

    /// Spawn the shared receive loop on first subscription
    fn ensure_recv_loop(&self) {
        let mut guard = self.recv_loop.lock();
        if guard.is_some() {
            return;
        }

        let socket = Arc::clone(&self.socket);
        let subscribers = Arc::clone(&self.subscribers);

        *guard = Some(tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_FRAME_SIZE];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, addr)) => {
                        let message = RawMessage {
                            bytes: Bytes::copy_from_slice(&buf[..len]),
                            from: Some(addr),
                        };
                        fan_to_subscribers(&subscribers, message);
                    }
                    Err(e) => {
                        warn!("UDP receive error: {}", e);
                    }
                }
            }
        }));
    }
}

fn fan_to_subscribers(subscribers: &Subscribers, message: RawMessage<SocketAddr>) {
    subscribers
        .lock()
        .retain(|tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // A slow subscriber drops datagrams rather than stalling
                // the socket loop
                warn!("inbound buffer full, dropping datagram");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
}

impl Transport for UdpTransport {
    type Peer = SocketAddr;

    fn lookup(&self) -> Vec<SocketAddr> {
        self.peers.read().clone()
    }

    fn send(&self, packet: Packet, peer: &SocketAddr) -> SendFuture {
        let socket = Arc::clone(&self.socket);
        let dest = *peer;
        Box::pin(async move {
            let bytes = murmur_wire::encode(&packet)?;
            socket
                .send_to(&bytes, dest)
                .await
                .map_err(|e| MurmurError::Transport(e.to_string()))?;
            Ok(())
        })
    }

    fn subscribe(&self) -> mpsc::Receiver<RawMessage<SocketAddr>> {
        let (tx, rx) = mpsc::channel(self.config.inbound_buffer);
        self.subscribers.lock().push(tx);
        self.ensure_recv_loop();
        rx
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.recv_loop.lock().take() {
            handle.abort();
        }
    }
}
