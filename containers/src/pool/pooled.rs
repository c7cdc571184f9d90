use crate::pool::ObjectPool;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

/// A checked-out instance which is released back to its [`ObjectPool`] when dropped
#[must_use]
pub struct Pooled<'a, T: 'static> {
    pool: &'a ObjectPool<T>,
    item: ManuallyDrop<T>,
}

impl<'a, T: 'static> Pooled<'a, T> {
    pub(crate) fn new(pool: &'a ObjectPool<T>, item: T) -> Self {
        Self {
            pool,
            item: ManuallyDrop::new(item),
        }
    }

    /// Detach the instance from the guard. It stays checked out: hand it back with
    /// [`ObjectPool::release`] or [`ObjectPool::discard`].
    pub fn take(self) -> T {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the item is moved out exactly once
        unsafe { ManuallyDrop::take(&mut this.item) }
    }

    /// Drop the instance instead of returning it, freeing its capacity slot
    pub fn discard(self) {
        let pool = self.pool;
        pool.discard(self.take());
    }

    pub fn pool(&self) -> &'a ObjectPool<T> {
        self.pool
    }
}

impl<T: 'static> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: 'static> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&*self.item).finish()
    }
}

impl<T: 'static> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        // SAFETY: drop runs once and the item is not touched afterwards
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        self.pool.release(item);
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_released_on_drop() {
        let pool = ObjectPool::new(|| String::from("engine"), 2, 4).unwrap();
        {
            let mut engine = pool.get().unwrap();
            engine.push_str("-warm");
            assert_eq!(pool.available(), 1);
        }
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.live(), 2);
    }

    #[test]
    fn test_take_keeps_checked_out() {
        let pool = ObjectPool::new(|| 5u64, 1, 1).unwrap();
        let value = pool.get().unwrap().take();
        assert_eq!(value, 5);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.status().checked_out, 1);
        assert!(pool.get().is_err());
        pool.release(value);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_discard() {
        let pool = ObjectPool::new(Vec::<u8>::new, 1, 1).unwrap();
        pool.get().unwrap().discard();
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.available(), 0);
        // capacity is free again
        let guard = pool.get().unwrap();
        assert!(guard.is_empty());
    }

    #[test]
    fn test_guard_after_close() {
        let pool = ObjectPool::new(|| 1u8, 1, 2).unwrap();
        let guard = pool.get().unwrap();
        assert!(pool.close().is_empty());
        drop(guard);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.live(), 0);
    }
}
