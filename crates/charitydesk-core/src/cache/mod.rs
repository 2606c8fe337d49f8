//! In-memory caching of slowly-changing collections.
//!
//! `ReadThroughCache` holds one snapshot and refetches it when it is older
//! than the TTL the caller asks for. The clock is injected so expiry can be
//! driven from tests with `ManualClock`.

pub mod clock;
pub mod read_through;

pub use clock::{Clock, ManualClock, SystemClock};
pub use read_through::{CachedData, ReadThroughCache};
