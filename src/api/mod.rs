pub mod datetime;
pub mod request;
pub mod response;
pub mod schema;

pub use request::{PredictionRequest, DATETIME_FIELD};
pub use response::{PredictResponse, RootNote, ROOT_NOTE};
pub use schema::{field_spec, validate, FieldKind, FieldSpec, PREDICTION_SCHEMA};
