//! The narrow interface between the broadcast engine and its transport
//!
//! The engine never learns how peers are discovered, connected, or
//! addressed; it sees an opaque peer handle, a oneway send, and a stream of
//! raw inbound messages.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

use murmur_core::{MurmurResult, Packet};

/// Boxed oneway send in flight
///
/// Implementations capture whatever they need by value so the engine can
/// detach the future onto its own task.
pub type SendFuture = Pin<Box<dyn Future<Output = MurmurResult<()>> + Send>>;

/// A raw inbound message before decoding
#[derive(Clone, Debug)]
pub struct RawMessage<P> {
    /// Undecoded frame bytes
    pub bytes: Bytes,
    /// Immediate sender, when the transport can derive it (best-effort)
    pub from: Option<P>,
}

/// Peer I/O supplied to the engine by the host
///
/// Peer handles are borrowed per forwarding round and never persisted; each
/// round re-queries [`lookup`](Transport::lookup) so topology churn is
/// handled naturally.
pub trait Transport: Send + Sync + 'static {
    /// Opaque reference to a reachable neighbor
    type Peer: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Fresh snapshot of currently reachable peers
    fn lookup(&self) -> Vec<Self::Peer>;

    /// Fire one packet at one peer; failures are reported per peer and
    /// never affect other sends
    fn send(&self, packet: Packet, peer: &Self::Peer) -> SendFuture;

    /// Register for raw inbound messages; dropping the receiver
    /// unsubscribes
    fn subscribe(&self) -> mpsc::Receiver<RawMessage<Self::Peer>>;
}
