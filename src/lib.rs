//! Solar irradiance forecasting: a model store evaluating a fitted additive
//! forecaster, the `/predict` HTTP service in front of it, and a client that
//! collects inputs and renders the forecast.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod ml;
pub mod telemetry;
pub mod web;

pub use crate::config::Config;
pub use crate::error::{ClientError, MLError, RequestError, ServiceError};
