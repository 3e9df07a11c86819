//! Murmur Flood - Epidemic broadcast engine
//!
//! A node that originates or first observes a packet forwards it to every
//! currently known neighbor, relying on redundant paths rather than routing
//! for delivery. A bounded LRU + sliding-TTL cache of seen packet ids keeps
//! re-broadcast storms and duplicate delivery in check.
//!
//! The engine owns no sockets: peer lookup, oneway sends, and the inbound
//! stream are injected through [`murmur_transport::Transport`].

pub mod engine;

pub use engine::{Delivery, EngineState, FloodConfig, FloodEngine, FloodStats};

pub use murmur_cache::CacheConfig;
