//! Identity types for the murmur protocol
//!
//! Node identifiers are 64-bit for wire efficiency; packet identifiers are
//! 128-bit random values so that independently published packets collide
//! only with negligible probability.

use std::fmt;

use rand::RngCore;

/// Node identity - opaque fixed-length identifier of a peer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const ZERO: NodeId = NodeId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        NodeId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:016x})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Size of a packet identifier in bytes
pub const PACKET_ID_SIZE: usize = 16;

/// Packet identity - high-entropy identifier, unique per publish event
///
/// Two packets with the same id are the same logical message regardless of
/// payload bytes; deduplication never re-inspects the payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketId(pub [u8; PACKET_ID_SIZE]);

impl PacketId {
    pub const ZERO: PacketId = PacketId([0u8; PACKET_ID_SIZE]);

    /// Generate a fresh random identifier
    pub fn random() -> Self {
        let mut bytes = [0u8; PACKET_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        PacketId(bytes)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; PACKET_ID_SIZE] {
        self.0
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; PACKET_ID_SIZE]) -> Self {
        PacketId(bytes)
    }
}

impl fmt::Debug for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pkt(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
