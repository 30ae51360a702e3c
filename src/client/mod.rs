pub mod form;
pub mod http;
pub mod render;
pub mod session;

pub use form::InputForm;
pub use http::ForecastClient;
pub use render::{render_forecast, render_state};
pub use session::{Session, SubmissionState};
