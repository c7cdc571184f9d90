pub mod config;
pub mod object_pool;
pub mod pooled;

pub use config::{CapacityPolicy, PoolBuilder, PoolConfig, DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE};
pub use object_pool::{ObjectPool, PoolStatus};
pub use pooled::Pooled;
