use crate::error::PoolError;
use crate::pool::ObjectPool;
use crate::traits::PooledObjectPolicy;
use anyhow::Result;
use derivative::Derivative;
use std::time::Duration;

pub const DEFAULT_MIN_SIZE: usize = 5;
pub const DEFAULT_MAX_SIZE: usize = 50_000;

/// How an [`ObjectPool`] decides whether it may construct another instance once its bag is empty
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CapacityPolicy {
    /// Counts every live instance (idle or checked out) and admits a new one only while
    /// `live < max_size`. Admission is a compare-and-swap, so the bound holds under contention.
    #[default]
    Strict,
    /// Compares the bag's current length against `max_size` (inclusive) before constructing.
    ///
    /// Racy: concurrent callers may each observe room and each construct, so the pool can
    /// grow past `max_size`. The bound is advisory only.
    BestEffort,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    /// Instances constructed up front, on the calling thread
    pub min_size: usize,
    pub max_size: usize,
    pub capacity_policy: CapacityPolicy,
    /// Idle instances older than this are dropped on acquire while the bag holds more than
    /// `min_size` entries
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            capacity_policy: CapacityPolicy::default(),
            idle_timeout: None,
        }
    }
}

impl PoolConfig {
    pub(crate) fn validate(&self) -> Result<(), PoolError> {
        if self.capacity_policy == CapacityPolicy::Strict && self.min_size > self.max_size {
            return Err(PoolError::InvalidArgument("min_size cannot exceed max_size"));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(PoolError::InvalidArgument("idle_timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Fluent construction of an [`ObjectPool`]. A factory (or policy) must be supplied before
/// [`PoolBuilder::build`], otherwise building fails with [`PoolError::InvalidArgument`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct PoolBuilder<T: 'static> {
    config: PoolConfig,
    #[derivative(Debug = "ignore")]
    policy: Option<Box<dyn PooledObjectPolicy<T>>>,
}

impl<T: 'static> Default for PoolBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> PoolBuilder<T> {
    pub fn new() -> Self {
        Self::from_config(PoolConfig::default())
    }

    pub fn from_config(config: PoolConfig) -> Self {
        Self {
            config,
            policy: None,
        }
    }

    pub fn min_size(mut self, min_size: usize) -> Self {
        self.config.min_size = min_size;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config.max_size = max_size;
        self
    }

    pub fn capacity_policy(mut self, capacity_policy: CapacityPolicy) -> Self {
        self.config.capacity_policy = capacity_policy;
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.idle_timeout = Some(idle_timeout);
        self
    }

    /// Infallible factory
    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.try_factory(move || -> Result<T> { Ok(factory()) })
    }

    pub fn try_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        self.policy = Some(Box::new(factory));
        self
    }

    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: PooledObjectPolicy<T> + 'static,
    {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Validates the configuration, then pre-warms `min_size` instances
    pub fn build(self) -> Result<ObjectPool<T>> {
        let policy = self.policy.ok_or(anyhow::Error::from(PoolError::InvalidArgument(
            "a factory is required",
        )))?;
        ObjectPool::from_parts(policy, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.min_size, 5);
        assert_eq!(config.max_size, 50_000);
        assert_eq!(config.capacity_policy, CapacityPolicy::Strict);
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_missing_factory() {
        let err = PoolBuilder::<u32>::new().build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoolError>(),
            Some(PoolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_strict_rejects_min_above_max() {
        let config = PoolConfig {
            min_size: 4,
            max_size: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_best_effort_allows_min_above_max() {
        let config = PoolConfig {
            min_size: 4,
            max_size: 2,
            capacity_policy: CapacityPolicy::BestEffort,
            idle_timeout: None,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout() {
        let err = PoolBuilder::new()
            .idle_timeout(Duration::ZERO)
            .factory(|| 0u8)
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoolError>(),
            Some(PoolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_builder_knobs() {
        let builder = PoolBuilder::<u8>::new()
            .min_size(1)
            .max_size(8)
            .capacity_policy(CapacityPolicy::BestEffort)
            .idle_timeout(Duration::from_secs(30));
        assert_eq!(
            *builder.config(),
            PoolConfig {
                min_size: 1,
                max_size: 8,
                capacity_policy: CapacityPolicy::BestEffort,
                idle_timeout: Some(Duration::from_secs(30)),
            }
        );
    }
}
