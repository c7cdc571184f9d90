use anyhow::Result;

/// Describes how a pool creates instances and whether it takes them back.
///
/// Any `Fn() -> Result<T>` closure is a policy which accepts every returned instance.
pub trait PooledObjectPolicy<T>: Send + Sync {
    /// Construct a new instance. Errors propagate to whoever triggered the construction
    fn create(&self) -> Result<T>;

    /// Called when an instance is handed back to the pool.
    ///
    /// Returning `false` drops the instance instead of putting it back into the bag.
    fn on_return(&self, _item: &mut T) -> bool {
        true
    }
}

impl<T, F> PooledObjectPolicy<T> for F
where
    F: Fn() -> Result<T> + Send + Sync,
{
    fn create(&self) -> Result<T> {
        self()
    }
}
