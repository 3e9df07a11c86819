//! Murmur Transport - Peer I/O hooks for the broadcast engine
//!
//! This crate provides:
//! - The [`Transport`] trait the engine consumes (peer lookup, oneway send,
//!   inbound subscription)
//! - A UDP adapter with a host-supplied peer table

pub mod hooks;
pub mod udp;

pub use hooks::*;
pub use udp::*;
