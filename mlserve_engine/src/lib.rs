pub mod model_engine;
pub mod predictor;

pub use mlserve_containers;
pub use model_engine::ModelEngine;
pub use predictor::{Predictor, PredictorPolicy};
