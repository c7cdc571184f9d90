use crate::error::PoolError;
use crate::pool::{CapacityPolicy, PoolBuilder, PoolConfig, Pooled};
use crate::traits::PooledObjectPolicy;
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use derivative::Derivative;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// An idle instance sitting in the bag
struct IdleEntry<T> {
    item: T,
    returned_at: Instant,
}

/// Snapshot of the pool's counters. Under concurrent use the fields may be mutually stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolStatus {
    pub max_size: usize,
    /// Instances idle in the bag
    pub available: usize,
    /// Instances created and not yet discarded
    pub live: usize,
    /// Live instances outside the bag. Also counts instances the caller dropped without
    /// releasing or discarding them.
    pub checked_out: usize,
}

/// Thread-safe pool of reusable, expensive-to-construct instances.
///
/// The bag is an unbounded crossbeam channel which the pool both sends into and receives
/// from, giving lock-free insertion and non-blocking removal with no ordering guarantee.
/// [`ObjectPool::acquire`] never waits: it takes an idle instance, constructs a new one on the
/// calling thread, or fails with [`PoolError::Exhausted`].
///
/// Instances handed out are owned by the caller until [`ObjectPool::release`]d. Dropping one
/// instead is allowed; under [`CapacityPolicy::Strict`] its capacity slot is only freed through
/// [`ObjectPool::discard`], so prefer [`ObjectPool::get`] which releases on drop.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ObjectPool<T: 'static> {
    #[derivative(Debug = "ignore")]
    policy: Box<dyn PooledObjectPolicy<T>>,
    #[derivative(Debug = "ignore")]
    send: Sender<IdleEntry<T>>,
    #[derivative(Debug = "ignore")]
    recv: Receiver<IdleEntry<T>>,
    config: PoolConfig,
    live: AtomicUsize,
    closed: AtomicBool,
}

impl<T: 'static> ObjectPool<T> {
    /// Creates a pool and synchronously constructs `min_size` instances with `factory`.
    ///
    /// Uses [`CapacityPolicy::Strict`]; see [`PoolBuilder`] for the other knobs.
    pub fn new<F>(factory: F, min_size: usize, max_size: usize) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        PoolBuilder::new()
            .min_size(min_size)
            .max_size(max_size)
            .factory(factory)
            .build()
    }

    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    pub(crate) fn from_parts(
        policy: Box<dyn PooledObjectPolicy<T>>,
        config: PoolConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (send, recv) = crossbeam_channel::unbounded();
        let pool = Self {
            policy,
            send,
            recv,
            config,
            live: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };

        let start = Instant::now();
        for _ in 0..config.min_size {
            let item = pool.policy.create()?;
            pool.live.fetch_add(1, Ordering::AcqRel);
            pool.put(item);
        }
        debug!(
            "Pre-warmed pool with {} instances in {:?}",
            config.min_size,
            start.elapsed()
        );
        Ok(pool)
    }

    /// Take an idle instance, or construct one if the capacity policy admits it
    pub fn acquire(&self) -> Result<T> {
        if self.is_closed() {
            return Err(anyhow::Error::from(PoolError::Closed));
        }
        while let Ok(entry) = self.recv.try_recv() {
            if self.is_expired(&entry) {
                trace!("Dropping instance idle for {:?}", entry.returned_at.elapsed());
                self.discard(entry.item);
                continue;
            }
            return Ok(entry.item);
        }
        self.create_on_demand()
    }

    /// Like [`ObjectPool::acquire`], but the instance goes back to the pool when the guard drops
    pub fn get(&self) -> Result<Pooled<'_, T>> {
        Ok(Pooled::new(self, self.acquire()?))
    }

    /// Hand an instance back. Never blocks.
    ///
    /// No check is made that `item` came from this pool. Releasing after [`ObjectPool::close`]
    /// drops the instance, as does releasing into a bag already holding `max_size` instances.
    pub fn release(&self, mut item: T) {
        if self.is_closed() {
            trace!("Pool closed, dropping released instance");
            self.discard(item);
            return;
        }
        if !self.policy.on_return(&mut item) {
            trace!("Policy rejected released instance");
            self.discard(item);
            return;
        }
        if self.recv.len() >= self.config.max_size {
            trace!("Bag full, dropping released instance");
            self.discard(item);
            return;
        }
        self.put(item);
        // close() may have drained between the check above and the put
        if self.is_closed() {
            drop(self.drain_idle());
        }
    }

    /// Drop a checked-out instance and free its capacity slot
    pub fn discard(&self, item: T) {
        drop(item);
        self.forget_one();
    }

    /// Stop handing out instances and drain the idle ones.
    ///
    /// Subsequent [`ObjectPool::acquire`] calls fail with [`PoolError::Closed`]. Outstanding
    /// instances may still be released and are dropped when they are.
    pub fn close(&self) -> Vec<T> {
        self.closed.store(true, Ordering::Release);
        let drained = self.drain_idle();
        debug!("Closed pool, drained {} idle instances", drained.len());
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of idle instances currently in the bag
    pub fn available(&self) -> usize {
        self.recv.len()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn status(&self) -> PoolStatus {
        let available = self.available();
        let live = self.live();
        PoolStatus {
            max_size: self.config.max_size,
            available,
            live,
            checked_out: live.saturating_sub(available),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn drain_idle(&self) -> Vec<T> {
        self.recv
            .try_iter()
            .map(|entry| {
                self.forget_one();
                entry.item
            })
            .collect()
    }

    /// Saturates, foreign instances may have been released into the bag
    fn forget_one(&self) {
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| live.checked_sub(1));
    }

    fn put(&self, item: T) {
        let entry = IdleEntry {
            item,
            returned_at: Instant::now(),
        };
        // we hold the receiver, so the channel cannot be disconnected
        if let Err(err) = self.send.send(entry) {
            self.discard(err.into_inner().item);
        }
    }

    /// An expired entry is still handed out once the bag is down to `min_size`
    fn is_expired(&self, entry: &IdleEntry<T>) -> bool {
        match self.config.idle_timeout {
            Some(timeout) => {
                entry.returned_at.elapsed() >= timeout && self.recv.len() > self.config.min_size
            }
            None => false,
        }
    }

    fn create_on_demand(&self) -> Result<T> {
        let max_size = self.config.max_size;
        let item = match self.config.capacity_policy {
            CapacityPolicy::Strict => {
                self.live
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                        (live < max_size).then_some(live + 1)
                    })
                    .map_err(|live| {
                        debug!("Pool exhausted with {} live instances", live);
                        anyhow::Error::from(PoolError::Exhausted { max_size })
                    })?;
                self.policy.create().inspect_err(|_| {
                    self.live.fetch_sub(1, Ordering::AcqRel);
                })?
            }
            CapacityPolicy::BestEffort => {
                let idle = self.recv.len();
                if idle > max_size {
                    debug!("Pool exhausted with {} idle instances", idle);
                    return Err(anyhow::Error::from(PoolError::Exhausted { max_size }));
                }
                let item = self.policy.create()?;
                self.live.fetch_add(1, Ordering::AcqRel);
                item
            }
        };
        trace!("Constructed instance on demand");
        Ok(item)
    }
}
