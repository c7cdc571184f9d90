use anyhow::Result;
use mlserve_containers::traits::PooledObjectPolicy;
use std::time::Instant;

/// An inference engine built from a loaded model.
///
/// Construction is assumed to be expensive and `predict` to need exclusive access, which is
/// why [`crate::ModelEngine`] keeps a pool of them.
pub trait Predictor {
    type Input;
    type Output;

    fn predict(&mut self, input: &Self::Input) -> Result<Self::Output>;

    /// Whether the predictor may go back into the pool after use
    fn is_reusable(&self) -> bool {
        true
    }
}

/// Pool policy which builds predictors from a factory and times each construction
pub struct PredictorPolicy<F> {
    factory: F,
}

impl<F> PredictorPolicy<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<P, F> PooledObjectPolicy<P> for PredictorPolicy<F>
where
    P: Predictor,
    F: Fn() -> Result<P> + Send + Sync,
{
    fn create(&self) -> Result<P> {
        let start = Instant::now();
        let predictor = (self.factory)()?;
        tracing::trace!("Created predictor in {:?}", start.elapsed());
        Ok(predictor)
    }

    fn on_return(&self, item: &mut P) -> bool {
        item.is_reusable()
    }
}

