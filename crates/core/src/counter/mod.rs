//! Counter store: shared key/value state with TTL expiry and an atomic
//! decrement-if-positive primitive.

mod memory;
mod redis_store;
mod traits;

pub use memory::MemoryCounterStore;
pub use redis_store::RedisCounterStore;
pub use traits::{CounterError, CounterStore};
