//! Murmur Cache - Bounded set of recently seen packet identifiers
//!
//! Combines LRU and sliding-TTL eviction: capacity is bounded to `max_size`
//! entries while inactive entries expire `max_age` after their last touch.
//! Pure data structure, no I/O.

pub mod seen;

pub use seen::*;
