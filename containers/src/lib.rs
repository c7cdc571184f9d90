pub mod error;
pub mod pool;
pub mod prelude;
pub mod traits;

pub use crossbeam_channel;
