use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
pub enum PoolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Capacity guard tripped. Callers should back off and retry
    #[error("Pool exhausted; max size of {max_size} reached")]
    Exhausted { max_size: usize },

    #[error("Pool has been closed")]
    Closed,
}
