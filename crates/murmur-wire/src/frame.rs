//! Frame layout and encode/decode for broadcast packets
//!
//! Layout (little-endian):
//!
//! ```text
//! version: u8 | id: 16 bytes | origin: 8 bytes | payload_len: u16 | payload
//! ```

use bytes::Bytes;

use murmur_core::{MurmurError, MurmurResult, NodeId, Packet, PacketId, PACKET_ID_SIZE};

/// Current wire format version
pub const WIRE_VERSION: u8 = 1;

/// Fixed header size: version + id + origin + payload length
pub const HEADER_SIZE: usize = 1 + PACKET_ID_SIZE + 8 + 2;

/// Maximum frame size (MTU-friendly)
pub const MAX_FRAME_SIZE: usize = 1400;

/// Maximum payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Serialize a packet into a wire frame
pub fn encode(packet: &Packet) -> MurmurResult<Vec<u8>> {
    let size = HEADER_SIZE + packet.payload.len();
    if size > MAX_FRAME_SIZE {
        return Err(MurmurError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.push(WIRE_VERSION);
    buf.extend_from_slice(&packet.id.to_bytes());
    buf.extend_from_slice(&packet.origin.to_bytes());
    buf.extend_from_slice(&(packet.payload.len() as u16).to_le_bytes());
    buf.extend_from_slice(&packet.payload);

    Ok(buf)
}

/// Parse a wire frame back into a packet
///
/// Never panics on arbitrary input; malformed frames yield an error the
/// caller drops at the boundary.
pub fn decode(buf: &[u8]) -> MurmurResult<Packet> {
    if buf.len() < HEADER_SIZE {
        return Err(MurmurError::BufferTooShort {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    if buf.len() > MAX_FRAME_SIZE {
        return Err(MurmurError::FrameTooLarge {
            size: buf.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    if buf[0] != WIRE_VERSION {
        return Err(MurmurError::InvalidWireFormat(format!(
            "unsupported version: {}",
            buf[0]
        )));
    }

    let mut id = [0u8; PACKET_ID_SIZE];
    id.copy_from_slice(&buf[1..1 + PACKET_ID_SIZE]);

    let mut origin = [0u8; 8];
    origin.copy_from_slice(&buf[1 + PACKET_ID_SIZE..1 + PACKET_ID_SIZE + 8]);

    let len_start = 1 + PACKET_ID_SIZE + 8;
    let payload_len =
        u16::from_le_bytes([buf[len_start], buf[len_start + 1]]) as usize;

    if buf.len() != HEADER_SIZE + payload_len {
        return Err(MurmurError::InvalidWireFormat(format!(
            "payload length mismatch: header says {}, frame carries {}",
            payload_len,
            buf.len() - HEADER_SIZE
        )));
    }

    Ok(Packet::new(
        PacketId::from_bytes(id),
        NodeId::from_bytes(origin),
        Bytes::copy_from_slice(&buf[HEADER_SIZE..]),
    ))
}
