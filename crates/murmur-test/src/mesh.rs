//! In-memory full-mesh transport for multi-node tests
//!
//! Every joined node can reach every other joined node; `lookup` reflects
//! the membership at call time, so joins and leaves mid-test behave like
//! topology churn. Sends toward a downed node reject, exercising the
//! engine's per-peer fault isolation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use murmur_core::{MurmurError, NodeId, Packet};
use murmur_transport::{RawMessage, SendFuture, Transport};

/// Capacity of each subscriber's inbound channel
const INBOUND_BUFFER: usize = 256;

struct NodeSlot {
    subscribers: Vec<mpsc::Sender<RawMessage<NodeId>>>,
}

struct MeshInner {
    nodes: Mutex<HashMap<NodeId, NodeSlot>>,
    downed: Mutex<HashSet<NodeId>>,
}

/// A full-mesh in-memory network of nodes
#[derive(Clone)]
pub struct MemMesh {
    inner: Arc<MeshInner>,
}

impl MemMesh {
    pub fn new() -> Self {
        MemMesh {
            inner: Arc::new(MeshInner {
                nodes: Mutex::new(HashMap::new()),
                downed: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Register a node and get its transport
    pub fn join(&self, node: NodeId) -> Arc<MeshTransport> {
        self.inner.nodes.lock().entry(node).or_insert(NodeSlot {
            subscribers: Vec::new(),
        });
        Arc::new(MeshTransport {
            node,
            mesh: Arc::clone(&self.inner),
        })
    }

    /// Remove a node from the mesh
    pub fn leave(&self, node: NodeId) {
        self.inner.nodes.lock().remove(&node);
    }

    /// Make every send toward `node` reject
    pub fn fail_node(&self, node: NodeId) {
        self.inner.downed.lock().insert(node);
    }

    /// Undo [`fail_node`](MemMesh::fail_node)
    pub fn heal_node(&self, node: NodeId) {
        self.inner.downed.lock().remove(&node);
    }

    /// Nodes currently joined
    pub fn members(&self) -> Vec<NodeId> {
        let mut members: Vec<NodeId> = self.inner.nodes.lock().keys().copied().collect();
        members.sort();
        members
    }
}

impl Default for MemMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// One node's view of the mesh
pub struct MeshTransport {
    node: NodeId,
    mesh: Arc<MeshInner>,
}

impl MeshTransport {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Transport for MeshTransport {
    type Peer = NodeId;

    fn lookup(&self) -> Vec<NodeId> {
        let mut peers: Vec<NodeId> = self
            .mesh
            .nodes
            .lock()
            .keys()
            .copied()
            .filter(|peer| *peer != self.node)
            .collect();
        peers.sort();
        peers
    }

    fn send(&self, packet: Packet, peer: &NodeId) -> SendFuture {
        let mesh = Arc::clone(&self.mesh);
        let from = self.node;
        let peer = *peer;
        Box::pin(async move {
            if mesh.downed.lock().contains(&peer) {
                return Err(MurmurError::Transport(format!("link to {peer} is down")));
            }

            let bytes = Bytes::from(murmur_wire::encode(&packet)?);
            let message = RawMessage {
                bytes,
                from: Some(from),
            };

            let subscribers: Vec<_> = {
                let mut nodes = mesh.nodes.lock();
                let Some(slot) = nodes.get_mut(&peer) else {
                    return Err(MurmurError::Transport(format!("unknown peer {peer}")));
                };
                slot.subscribers.retain(|tx| !tx.is_closed());
                slot.subscribers.clone()
            };

            for tx in subscribers {
                let _ = tx.send(message.clone()).await;
            }
            Ok(())
        })
    }

    fn subscribe(&self) -> mpsc::Receiver<RawMessage<NodeId>> {
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let mut nodes = self.mesh.nodes.lock();
        if let Some(slot) = nodes.get_mut(&self.node) {
            slot.subscribers.push(tx);
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::PacketId;

    #[tokio::test]
    async fn test_lookup_excludes_self() {
        let mesh = MemMesh::new();
        let a = mesh.join(NodeId::new(1));
        mesh.join(NodeId::new(2));
        mesh.join(NodeId::new(3));

        assert_eq!(a.lookup(), vec![NodeId::new(2), NodeId::new(3)]);
    }

    #[tokio::test]
    async fn test_send_reaches_subscriber() {
        let mesh = MemMesh::new();
        let a = mesh.join(NodeId::new(1));
        let b = mesh.join(NodeId::new(2));
        let mut inbound = b.subscribe();

        let packet = Packet::new(
            PacketId::random(),
            NodeId::new(1),
            Bytes::from_static(b"ping"),
        );
        a.send(packet.clone(), &NodeId::new(2)).await.unwrap();

        let raw = inbound.recv().await.unwrap();
        assert_eq!(raw.from, Some(NodeId::new(1)));
        assert_eq!(murmur_wire::decode(&raw.bytes).unwrap(), packet);
    }

    #[tokio::test]
    async fn test_downed_node_rejects_sends() {
        let mesh = MemMesh::new();
        let a = mesh.join(NodeId::new(1));
        mesh.join(NodeId::new(2));
        mesh.fail_node(NodeId::new(2));

        let packet = Packet::new(PacketId::random(), NodeId::new(1), Bytes::new());
        let err = a.send(packet.clone(), &NodeId::new(2)).await.unwrap_err();
        assert!(matches!(err, MurmurError::Transport(_)));

        mesh.heal_node(NodeId::new(2));
        assert!(a.send(packet, &NodeId::new(2)).await.is_ok());
    }
}
