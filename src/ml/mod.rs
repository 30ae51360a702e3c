pub mod engine;
pub mod models;
pub mod predictor;
pub mod prep;
pub mod uncertainty;

pub use engine::ModelStore;
pub use models::{FeatureRow, ForecastModel, ForecastRow, ModelArtifact};
pub use predictor::ForecastPredictor;
pub use prep::prepare_rows;
