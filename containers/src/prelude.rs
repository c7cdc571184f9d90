pub use super::error::{self, PoolError};
pub use super::pool::*;
pub use super::traits::*;
