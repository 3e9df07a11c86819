//! The unit of dissemination

use bytes::Bytes;

use crate::{NodeId, PacketId};

/// A broadcast packet
///
/// `origin` is the node that first published the packet and never changes as
/// the packet is re-forwarded through the mesh. The payload is opaque to the
/// engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Unique identity of this packet
    pub id: PacketId,
    /// Node that first published the packet
    pub origin: NodeId,
    /// Opaque payload bytes
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet with an explicit identity
    pub fn new(id: PacketId, origin: NodeId, payload: Bytes) -> Self {
        Packet {
            id,
            origin,
            payload,
        }
    }

    /// Create a freshly published packet with a random identity
    pub fn publish(origin: NodeId, payload: Bytes) -> Self {
        Packet::new(PacketId::random(), origin, payload)
    }
}
