//! Murmur Wire - Packet frame codec
//!
//! Frame = Version + Packet Id + Origin + Payload Length + Payload

pub mod frame;

pub use frame::*;
