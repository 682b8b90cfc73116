//! Ring-arena expiring cache.
//!
//! A fixed-capacity, TTL-expiring key/value cache over a single
//! contiguous byte arena: an XOR-linked hash index and an age-ordered
//! insertion log share the same buffer, so eviction is a cursor advance
//! rather than a separate data structure. See [`Cache`] for the public
//! surface and [`default_instance`] for the process-wide convenience
//! wrappers.

mod arena;
pub mod default_instance;
mod engine;
mod entry;
mod hash;
mod sizer;

pub use engine::{Cache, Cursors, Hit};
pub use ringcache_common::{CacheError, CacheOptions, CacheResult, Clock, Instant, SystemClock};

/// Smallest allowed arena size, in bytes.
pub const MIN_SIZE: u32 = 100;
/// Largest allowed arena size, in bytes.
pub const MAX_SIZE: u32 = 1_000_000_000;
/// Largest allowed key length, in bytes.
pub const MAX_KEYLEN: u32 = 1_000;
/// Largest allowed value length, in bytes.
pub const MAX_DATALEN: u32 = 1_000_000;
/// Largest allowed TTL, in seconds (one week).
pub const MAX_TTL: u32 = 604_800;

/// Hash-flood guard: a chain walk never inspects more than this many nodes.
pub const MAX_CHAIN_WALK: u32 = 100;
