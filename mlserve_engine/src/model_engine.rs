use crate::predictor::{Predictor, PredictorPolicy};
use anyhow::Result;
use mlserve_containers::prelude::{ObjectPool, PoolBuilder, PoolConfig, PoolStatus};
use rayon::prelude::*;
use std::time::Instant;

/// Serves predictions from a pool of [`Predictor`]s so callers on many threads can predict
/// concurrently without each paying the construction cost.
pub struct ModelEngine<P: Predictor + 'static> {
    pool: ObjectPool<P>,
}

impl<P> ModelEngine<P>
where
    P: Predictor + Send + 'static,
{
    pub fn new<F>(factory: F, min_size: usize, max_size: usize) -> Result<Self>
    where
        F: Fn() -> Result<P> + Send + Sync + 'static,
    {
        Self::with_config(
            factory,
            PoolConfig {
                min_size,
                max_size,
                ..Default::default()
            },
        )
    }

    pub fn with_config<F>(factory: F, config: PoolConfig) -> Result<Self>
    where
        F: Fn() -> Result<P> + Send + Sync + 'static,
    {
        let pool = PoolBuilder::from_config(config)
            .policy(PredictorPolicy::new(factory))
            .build()?;
        Ok(Self { pool })
    }

    /// Run a single prediction on a pooled predictor.
    ///
    /// The predictor is handed back even when the prediction fails.
    pub fn predict(&self, input: &P::Input) -> Result<P::Output> {
        let mut predictor = self.pool.get()?;
        let start = Instant::now();
        let prediction = predictor.predict(input);
        tracing::trace!("Predicted in {:?}", start.elapsed());
        prediction
    }

    /// Predict every input in parallel. Each rayon worker checks out its own predictor, so
    /// `max_size` should be at least the size of the rayon thread pool.
    pub fn predict_batch(&self, inputs: &[P::Input]) -> Result<Vec<P::Output>>
    where
        P::Input: Sync,
        P::Output: Send,
    {
        inputs.par_iter().map(|input| self.predict(input)).collect()
    }

    /// Idle predictors ready to be handed out
    pub fn current_pool_size(&self) -> usize {
        self.pool.available()
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub fn pool(&self) -> &ObjectPool<P> {
        &self.pool
    }

    /// Close the pool and drop idle predictors, returning how many were dropped
    pub fn shutdown(&self) -> usize {
        self.pool.close().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlserve_containers::prelude::PoolError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scaler {
        factor: f64,
        poisoned: bool,
    }

    impl Predictor for Scaler {
        type Input = f64;
        type Output = f64;

        fn predict(&mut self, input: &f64) -> Result<f64> {
            if input.is_nan() {
                self.poisoned = true;
                anyhow::bail!("input is not a number");
            }
            Ok(input * self.factor)
        }

        fn is_reusable(&self) -> bool {
            !self.poisoned
        }
    }

    fn engine(min_size: usize, max_size: usize) -> (Arc<AtomicUsize>, ModelEngine<Scaler>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let engine = ModelEngine::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Scaler {
                    factor: 2.0,
                    poisoned: false,
                })
            },
            min_size,
            max_size,
        )
        .unwrap();
        (created, engine)
    }

    #[test]
    fn test_predict_returns_predictor() {
        let (created, engine) = engine(3, 10);
        assert_eq!(engine.current_pool_size(), 3);
        assert_eq!(engine.predict(&4.0).unwrap(), 8.0);
        assert_eq!(engine.current_pool_size(), 3);
        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failed_prediction_drops_poisoned_predictor() {
        let (_, engine) = engine(2, 2);
        assert!(engine.predict(&f64::NAN).is_err());
        assert_eq!(engine.current_pool_size(), 1);
        assert_eq!(engine.status().live, 1);
        assert_eq!(engine.predict(&1.5).unwrap(), 3.0);
        assert_eq!(engine.current_pool_size(), 1);
    }

    #[test]
    fn test_factory_error_on_construction() {
        let result = ModelEngine::<Scaler>::new(|| anyhow::bail!("model.zip not found"), 1, 4);
        match result {
            Err(err) => assert_eq!(err.to_string(), "model.zip not found"),
            Ok(_) => panic!("Expected the factory error"),
        }
    }

    #[test]
    fn test_exhausted() {
        let (_, engine) = engine(0, 0);
        let err = engine.predict(&1.0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PoolError>(),
            Some(&PoolError::Exhausted { max_size: 0 })
        );
    }

    #[test]
    fn test_predict_batch() {
        let (created, engine) = engine(1, 1024);
        let inputs: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let outputs = engine.predict_batch(&inputs).unwrap();
        assert_eq!(outputs.len(), 1000);
        assert!(outputs.iter().zip(&inputs).all(|(out, input)| *out == input * 2.0));
        assert!(created.load(Ordering::SeqCst) <= rayon::current_num_threads() + 1);
        assert_eq!(engine.status().checked_out, 0);
    }

    #[test]
    fn test_shutdown() {
        let (_, engine) = engine(4, 8);
        assert_eq!(engine.shutdown(), 4);
        let err = engine.predict(&1.0).unwrap_err();
        assert_eq!(err.downcast_ref::<PoolError>(), Some(&PoolError::Closed));
    }
}
