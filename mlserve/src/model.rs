use anyhow::Result;
use mlserve_engine::Predictor;
use std::sync::Arc;

const FEATURES: usize = 9;

/// Monthly sales figures for a country, the features of the forecast
#[derive(Debug, Clone, PartialEq)]
pub struct CountryData {
    pub country: String,
    pub year: f32,
    pub month: f32,
    pub max: f32,
    pub min: f32,
    pub std: f32,
    pub count: f32,
    pub sales: f32,
    pub med: f32,
    pub prev: f32,
}

impl CountryData {
    fn features(&self) -> [f32; FEATURES] {
        [
            self.year, self.month, self.max, self.min, self.std, self.count, self.sales, self.med,
            self.prev,
        ]
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SalesPrediction {
    pub score: f32,
}

/// Trained linear regression over [`CountryData`] features, shared read-only by every
/// predictor
#[derive(Debug)]
pub struct SalesModel {
    weights: [f32; FEATURES],
    bias: f32,
    /// Per-feature (mean, scale) applied before the weights
    normalization: [(f32, f32); FEATURES],
}

impl SalesModel {
    /// Coefficients of the next-month sales forecast
    pub fn forecast() -> Self {
        Self {
            weights: [0.0, 0.02, 0.05, 0.01, 0.03, 0.4, 1.1, 0.08, 0.35],
            bias: 4.2,
            normalization: [
                (2016.5, 1.0),
                (6.5, 3.5),
                (500.0, 400.0),
                (150.0, 120.0),
                (2500.0, 1500.0),
                (10.0, 5.0),
                (10000.0, 6000.0),
                (280.0, 200.0),
                (1000.0, 800.0),
            ],
        }
    }
}

/// Prediction engine over a [`SalesModel`]. Keeps a scratch feature buffer, so a single
/// instance cannot serve two callers at once.
#[derive(Debug)]
pub struct SalesPredictor {
    model: Arc<SalesModel>,
    scratch: [f32; FEATURES],
}

impl SalesPredictor {
    pub fn new(model: Arc<SalesModel>) -> Self {
        Self {
            model,
            scratch: [0.0; FEATURES],
        }
    }
}

impl Predictor for SalesPredictor {
    type Input = CountryData;
    type Output = SalesPrediction;

    fn predict(&mut self, input: &CountryData) -> Result<SalesPrediction> {
        for (slot, (value, (mean, scale))) in self
            .scratch
            .iter_mut()
            .zip(input.features().into_iter().zip(self.model.normalization))
        {
            *slot = (value - mean) / scale;
        }
        if let Some(index) = self.scratch.iter().position(|value| !value.is_finite()) {
            anyhow::bail!("Feature {} of {} is not finite", index, input.country);
        }
        let score = self
            .scratch
            .iter()
            .zip(self.model.weights)
            .map(|(value, weight)| value * weight)
            .sum::<f32>()
            + self.model.bias;
        Ok(SalesPrediction { score })
    }
}
