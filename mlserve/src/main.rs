mod model;

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use mlserve_engine::ModelEngine;
use mlserve_engine::mlserve_containers::prelude::PoolError;
use model::{CountryData, SalesModel, SalesPredictor};

const DEFAULT_REQUESTS: usize = 1_000_000;
const DEFAULT_MIN_SIZE: usize = 50;
const DEFAULT_MAX_SIZE: usize = 2000;

/// Positional argument `index`, or `default` when absent
fn arg(index: usize, name: &str, default: usize) -> Result<usize> {
    match std::env::args().nth(index) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid {name}: {value}")),
        None => Ok(default),
    }
}

fn sample(prev: f32) -> CountryData {
    CountryData {
        country: String::from("Australia"),
        year: 2017.0,
        month: 1.0,
        max: 477.0,
        min: 164.0,
        std: 2486.0,
        count: 9.0,
        sales: 10345.0,
        med: 281.0,
        prev,
    }
}

/// Exhaustion is backpressure: yield and try again
fn predict_with_backoff(
    engine: &ModelEngine<SalesPredictor>,
    input: &CountryData,
) -> Result<model::SalesPrediction> {
    loop {
        match engine.predict(input) {
            Err(err)
                if matches!(
                    err.downcast_ref::<PoolError>(),
                    Some(PoolError::Exhausted { .. })
                ) =>
            {
                thread::yield_now();
            }
            result => return result,
        }
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let requests = arg(1, "request count", DEFAULT_REQUESTS)?;
    let min_size = arg(2, "min size", DEFAULT_MIN_SIZE)?;
    let max_size = arg(3, "max size", DEFAULT_MAX_SIZE)?;

    let model = Arc::new(SalesModel::forecast());
    let engine = {
        let model = model.clone();
        ModelEngine::new(
            move || Ok(SalesPredictor::new(model.clone())),
            min_size,
            max_size,
        )?
    };
    tracing::info!("Current number of predictors in pool: {}", engine.current_pool_size());

    let single = engine.predict(&sample(1029.0))?;
    tracing::info!("Single prediction: {:.4}", single.score);

    let start = Instant::now();
    (0..requests).into_par_iter().try_for_each(|i| -> Result<()> {
        let prediction = predict_with_backoff(&engine, &sample(i as f32))?;
        tracing::debug!("Prediction {}: {:.4}", i, prediction.score);
        Ok(())
    })?;
    let status = engine.status();
    tracing::info!(
        "Served {} predictions in {:?}; {} predictors live, {} idle",
        requests,
        start.elapsed(),
        status.live,
        status.available
    );

    let dropped = engine.shutdown();
    tracing::info!("Shut down, dropped {} idle predictors", dropped);
    Ok(())
}
