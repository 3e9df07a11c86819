//! The broadcast engine: publish, receive, forward
//!
//! Lifecycle is `Idle -> Running -> Stopped`, one way. While running, two
//! background tasks exist: the inbound task (sole consumer of the transport
//! subscription) and the sweep task (proactive dedup-cache expiry). The
//! dedup check-then-insert and local emission happen inside one mutex, so
//! two racing copies of a packet can never both reach listeners.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, warn};

use murmur_cache::{CacheConfig, SeenCache};
use murmur_core::{MurmurError, MurmurResult, NodeId, Packet};
use murmur_transport::{RawMessage, Transport};
use murmur_wire::MAX_PAYLOAD_SIZE;

/// Default interval between proactive expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

/// Engine configuration
#[derive(Clone, Debug)]
pub struct FloodConfig {
    /// Dedup cache tuning
    pub cache: CacheConfig,
    /// Interval between proactive expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for FloodConfig {
    fn default() -> Self {
        FloodConfig {
            cache: CacheConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Engine lifecycle states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

/// A packet handed to local listeners
#[derive(Clone, Debug)]
pub struct Delivery<P> {
    /// Opaque payload bytes
    pub payload: Bytes,
    /// Node that first published the packet
    pub origin: NodeId,
    /// Immediate sender of the delivered copy, when the transport knows it
    pub from: Option<P>,
}

/// Engine counters
///
/// Duplicates are a defined silent path of the protocol, observable only
/// here.
#[derive(Clone, Debug, Default)]
pub struct FloodStats {
    pub published: u64,
    pub delivered: u64,
    pub duplicates: u64,
    pub decode_failures: u64,
    pub forwards_attempted: u64,
    pub send_failures: u64,
}

struct Inner<P> {
    state: EngineState,
    seen: SeenCache,
    subscribers: Vec<mpsc::UnboundedSender<Delivery<P>>>,
    stats: FloodStats,
    tasks: Vec<JoinHandle<()>>,
}

/// Epidemic broadcast engine
///
/// Exclusively owns one [`SeenCache`] for its lifetime; peer handles are
/// borrowed per forwarding round and never persisted.
pub struct FloodEngine<T: Transport> {
    identity: NodeId,
    config: FloodConfig,
    transport: Arc<T>,
    inner: Arc<Mutex<Inner<T::Peer>>>,
}

impl<T: Transport> FloodEngine<T> {
    /// Create an engine in the `Idle` state
    pub fn new(identity: NodeId, transport: Arc<T>, config: FloodConfig) -> Self {
        let seen = SeenCache::new(config.cache.clone());
        FloodEngine {
            identity,
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                state: EngineState::Idle,
                seen,
                subscribers: Vec::new(),
                stats: FloodStats::default(),
                tasks: Vec::new(),
            })),
        }
    }

    /// Identity used as `origin` on locally published packets
    pub fn identity(&self) -> NodeId {
        self.identity
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> FloodStats {
        self.inner.lock().stats.clone()
    }

    /// Start processing: subscribe to the transport and spawn the inbound
    /// and sweep tasks
    ///
    /// No-op while already running. Engines are not restartable: calling
    /// `run` after `stop` returns [`MurmurError::AlreadyStopped`].
    pub fn run(&self) -> MurmurResult<()> {
        let mut guard = self.inner.lock();
        match guard.state {
            EngineState::Running => return Ok(()),
            EngineState::Stopped => return Err(MurmurError::AlreadyStopped),
            EngineState::Idle => {}
        }
        guard.state = EngineState::Running;

        let rx = self.transport.subscribe();
        let inbound = tokio::spawn(inbound_loop(
            rx,
            Arc::clone(&self.inner),
            Arc::clone(&self.transport),
        ));
        let sweep = tokio::spawn(sweep_loop(
            self.config.sweep_interval,
            Arc::clone(&self.inner),
        ));
        guard.tasks.push(inbound);
        guard.tasks.push(sweep);
        Ok(())
    }

    /// Stop processing: unsubscribe and cancel every pending cache expiry
    ///
    /// After `stop` returns, no `Delivery` is emitted and the dedup cache
    /// is never mutated again. Idempotent; a no-op in `Idle`.
    pub fn stop(&self) {
        let mut guard = self.inner.lock();
        if guard.state != EngineState::Running {
            return;
        }
        guard.state = EngineState::Stopped;
        guard.seen.clear();
        // Aborting the inbound task drops the subscription receiver, which
        // unsubscribes from the transport
        for task in guard.tasks.drain(..) {
            task.abort();
        }
    }

    /// Publish a payload to the mesh
    ///
    /// Builds a packet with a fresh id and `origin = self`, marks the id
    /// seen (so a copy looping back through the network is dropped), and
    /// forwards it to every peer in a fresh `lookup` snapshot. Returns once
    /// every per-peer send has been spawned; delivery is fire-and-forget
    /// with no acknowledgement or retransmission.
    pub fn publish(&self, payload: Bytes) -> MurmurResult<()> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(MurmurError::FrameTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let packet = Packet::publish(self.identity, payload);
        {
            let mut guard = self.inner.lock();
            if guard.state != EngineState::Running {
                return Err(MurmurError::NotRunning);
            }
            guard.seen.add(packet.id);
            guard.stats.published += 1;
        }

        fan_out(&self.transport, &self.inner, packet, None);
        Ok(())
    }

    /// Register a listener for delivered packets
    ///
    /// Listeners are notified in subscription order, synchronously within
    /// the serialized handling step. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Delivery<T::Peer>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }
}

/// Sole consumer of the transport subscription
async fn inbound_loop<T: Transport>(
    mut rx: mpsc::Receiver<RawMessage<T::Peer>>,
    inner: Arc<Mutex<Inner<T::Peer>>>,
    transport: Arc<T>,
) {
    while let Some(raw) = rx.recv().await {
        let packet = match murmur_wire::decode(&raw.bytes) {
            Ok(packet) => packet,
            Err(err) => {
                let mut guard = inner.lock();
                if guard.state != EngineState::Running {
                    break;
                }
                guard.stats.decode_failures += 1;
                debug!(%err, "dropping undecodable inbound message");
                continue;
            }
        };

        let fresh = {
            let mut guard = inner.lock();
            if guard.state != EngineState::Running {
                break;
            }
            if guard.seen.has(packet.id) {
                guard.stats.duplicates += 1;
                debug!(id = %packet.id, "duplicate packet, dropping");
                false
            } else {
                guard.seen.add(packet.id);
                guard.stats.delivered += 1;
                let delivery = Delivery {
                    payload: packet.payload.clone(),
                    origin: packet.origin,
                    from: raw.from.clone(),
                };
                guard
                    .subscribers
                    .retain(|tx| tx.send(delivery.clone()).is_ok());
                true
            }
        };

        if fresh {
            // Excluding the immediate sender is an optimization, not a
            // correctness requirement
            fan_out(&transport, &inner, packet, raw.from.as_ref());
        }
    }
}

/// Forward one packet to a fresh peer snapshot, one detached task per peer
///
/// A failed or rejected send is logged and counted; it never affects the
/// other sends or the enclosing call.
fn fan_out<T: Transport>(
    transport: &Arc<T>,
    inner: &Arc<Mutex<Inner<T::Peer>>>,
    packet: Packet,
    exclude: Option<&T::Peer>,
) {
    let targets: Vec<T::Peer> = transport
        .lookup()
        .into_iter()
        .filter(|peer| Some(peer) != exclude)
        .collect();

    inner.lock().stats.forwards_attempted += targets.len() as u64;

    for peer in targets {
        let fut = transport.send(packet.clone(), &peer);
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            if let Err(err) = fut.await {
                warn!(?peer, %err, "send failed");
                inner.lock().stats.send_failures += 1;
            }
        });
    }
}

/// Proactive dedup-cache expiry, so idle entries are reclaimed even when no
/// traffic touches them
async fn sweep_loop<P>(period: Duration, inner: Arc<Mutex<Inner<P>>>) {
    let mut ticker = interval(period);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut guard = inner.lock();
        if guard.state != EngineState::Running {
            break;
        }
        let evicted = guard.seen.purge_expired(Instant::now());
        if evicted > 0 {
            debug!(evicted, "swept expired dedup entries");
        }
    }
}
