use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MLError;
use super::uncertainty::{IntervalEstimator, PointForecast, TrendParams};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// How far past the end of the training history a row may lie.
pub const DEFAULT_MAX_HORIZON_DAYS: u32 = 3650;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One prepared row: the time axis plus every numeric column of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub ds: NaiveDateTime,
    pub features: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(with = "crate::api::datetime")]
    pub ds: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    Linear,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentMode {
    #[default]
    Additive,
    Multiplicative,
}

/// On-disk form of a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub model_version: Option<String>,
    pub growth: Growth,
    pub start: NaiveDateTime,
    pub t_scale_seconds: f64,
    pub y_scale: f64,
    pub k: f64,
    pub m: f64,
    #[serde(default)]
    pub changepoints_t: Vec<f64>,
    #[serde(default)]
    pub deltas: Vec<f64>,
    #[serde(default)]
    pub seasonalities: Vec<SeasonalitySpec>,
    #[serde(default)]
    pub regressors: Vec<RegressorSpec>,
    pub sigma_obs: f64,
    pub interval_width: f64,
    #[serde(default)]
    pub uncertainty_samples: usize,
    #[serde(default)]
    pub uncertainty_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalitySpec {
    pub name: String,
    pub period_days: f64,
    pub fourier_order: usize,
    #[serde(default)]
    pub mode: ComponentMode,
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressorSpec {
    pub name: String,
    pub mu: f64,
    pub std: f64,
    pub coefficient: f64,
    #[serde(default)]
    pub mode: ComponentMode,
}

#[derive(Debug, Clone)]
struct Seasonality {
    name: String,
    period_days: f64,
    fourier_order: usize,
    mode: ComponentMode,
    coefficients: DVector<f64>,
}

/// Fitted additive forecaster: piecewise-linear trend, Fourier seasonalities
/// and standardized extra regressors.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    pub model_version: String,
    growth: Growth,
    start: NaiveDateTime,
    t_scale_seconds: f64,
    y_scale: f64,
    trend: TrendParams,
    seasonalities: Vec<Seasonality>,
    regressors: Vec<RegressorSpec>,
    intervals: IntervalEstimator,
    max_horizon_days: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Components {
    additive: f64,
    multiplicative: f64,
}

impl ForecastModel {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, MLError> {
        validate_artifact(&artifact)?;

        let seasonalities = artifact
            .seasonalities
            .into_iter()
            .map(|s| Seasonality {
                name: s.name,
                period_days: s.period_days,
                fourier_order: s.fourier_order,
                mode: s.mode,
                coefficients: DVector::from_vec(s.coefficients),
            })
            .collect();

        let trend = TrendParams {
            k: artifact.k,
            m: artifact.m,
            changepoints_t: artifact.changepoints_t,
            deltas: artifact.deltas,
        };

        let intervals = IntervalEstimator::new(
            artifact.interval_width,
            artifact.sigma_obs,
            artifact.uncertainty_samples,
            artifact.uncertainty_seed,
        )?;

        let model = Self {
            model_version: artifact.model_version.unwrap_or_else(|| "unversioned".to_string()),
            growth: artifact.growth,
            start: artifact.start,
            t_scale_seconds: artifact.t_scale_seconds,
            y_scale: artifact.y_scale,
            trend,
            seasonalities,
            regressors: artifact.regressors,
            intervals,
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
        };

        info!(
            "Model {} ready: {} seasonalities, {} regressors",
            model.model_version,
            model.seasonalities.len(),
            model.regressors.len()
        );

        Ok(model)
    }

    /// Names of the columns every feature row must carry.
    pub fn regressor_names(&self) -> impl Iterator<Item = &str> {
        self.regressors.iter().map(|r| r.name.as_str())
    }

    pub fn max_horizon_days(&self) -> u32 {
        self.max_horizon_days
    }

    pub fn set_max_horizon_days(&mut self, days: u32) {
        self.max_horizon_days = days;
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<ForecastRow>, MLError> {
        self.predict_cancellable(rows, &AtomicBool::new(false))
    }

    /// Like `predict`, but gives up with an `InferenceError` as soon as
    /// `cancel` is raised.
    pub fn predict_cancellable(&self, rows: &[FeatureRow], cancel: &AtomicBool) -> Result<Vec<ForecastRow>, MLError> {
        if rows.is_empty() {
            return Err(MLError::InferenceError("Dataframe has no rows.".to_string()));
        }

        debug!("Running forecast over {} rows", rows.len());

        rows.iter()
            .map(|row| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(MLError::InferenceError("inference cancelled".to_string()));
                }
                self.predict_row(row, cancel)
            })
            .collect()
    }

    fn predict_row(&self, row: &FeatureRow, cancel: &AtomicBool) -> Result<ForecastRow, MLError> {
        let t = self.scaled_time(&row.ds);
        if t > self.horizon_limit() {
            return Err(MLError::InferenceError(format!(
                "{} is more than {} days past the end of the training history",
                row.ds, self.max_horizon_days
            )));
        }
        let trend = self.trend_at(t);

        let mut components = self.seasonal_components(&row.ds);
        let regressor = self.regressor_components(row)?;
        components.additive += regressor.additive;
        components.multiplicative += regressor.multiplicative;

        let additive = components.additive * self.y_scale;
        let yhat = trend * (1.0 + components.multiplicative) + additive;
        if !yhat.is_finite() {
            return Err(MLError::InferenceError(format!(
                "Model produced a non-finite forecast for {}",
                row.ds
            )));
        }

        let point = PointForecast {
            ds: &row.ds,
            t,
            yhat,
            trend,
            multiplicative: components.multiplicative,
            additive,
        };
        let trend_params = match self.growth {
            Growth::Linear => Some(&self.trend),
            Growth::Flat => None,
        };
        let (yhat_lower, yhat_upper) = self.intervals.bounds(&point, trend_params, self.y_scale, cancel)?;

        Ok(ForecastRow {
            ds: row.ds,
            yhat,
            yhat_lower,
            yhat_upper,
        })
    }

    /// Latest scaled time a row may have; history ends at t = 1.
    fn horizon_limit(&self) -> f64 {
        1.0 + f64::from(self.max_horizon_days) * SECONDS_PER_DAY / self.t_scale_seconds
    }

    fn scaled_time(&self, ds: &NaiveDateTime) -> f64 {
        seconds_between(&self.start, ds) / self.t_scale_seconds
    }

    fn trend_at(&self, t: f64) -> f64 {
        match self.growth {
            Growth::Linear => self.trend.piecewise_linear(t) * self.y_scale,
            Growth::Flat => self.trend.m * self.y_scale,
        }
    }

    fn seasonal_components(&self, ds: &NaiveDateTime) -> Components {
        let days = days_since_epoch(ds);
        let mut components = Components::default();

        for seasonality in &self.seasonalities {
            let features = fourier_features(days, seasonality.period_days, seasonality.fourier_order);
            let effect = features.dot(&seasonality.coefficients);
            debug!("Seasonality {} contributes {:.4}", seasonality.name, effect);

            match seasonality.mode {
                ComponentMode::Additive => components.additive += effect,
                ComponentMode::Multiplicative => components.multiplicative += effect,
            }
        }

        components
    }

    fn regressor_components(&self, row: &FeatureRow) -> Result<Components, MLError> {
        let mut components = Components::default();

        for regressor in &self.regressors {
            let value = row.features.get(&regressor.name).ok_or_else(|| {
                MLError::InferenceError(format!(
                    "Regressor '{}' missing from dataframe",
                    regressor.name
                ))
            })?;
            if !value.is_finite() {
                return Err(MLError::InferenceError(format!(
                    "Found NaN in column '{}'",
                    regressor.name
                )));
            }

            let effect = (value - regressor.mu) / regressor.std * regressor.coefficient;
            match regressor.mode {
                ComponentMode::Additive => components.additive += effect,
                ComponentMode::Multiplicative => components.multiplicative += effect,
            }
        }

        Ok(components)
    }
}

fn validate_artifact(artifact: &ModelArtifact) -> Result<(), MLError> {
    let invalid = |msg: String| Err(MLError::ArtifactError(msg));

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return invalid(format!(
            "unsupported format_version {} (expected {})",
            artifact.format_version, ARTIFACT_FORMAT_VERSION
        ));
    }
    if !(artifact.t_scale_seconds.is_finite() && artifact.t_scale_seconds > 0.0) {
        return invalid("t_scale_seconds must be a positive number".to_string());
    }
    for (name, value) in [
        ("y_scale", artifact.y_scale),
        ("k", artifact.k),
        ("m", artifact.m),
        ("sigma_obs", artifact.sigma_obs),
    ] {
        if !value.is_finite() {
            return invalid(format!("{} must be finite", name));
        }
    }
    if artifact.changepoints_t.len() != artifact.deltas.len() {
        return invalid(format!(
            "{} changepoints but {} deltas",
            artifact.changepoints_t.len(),
            artifact.deltas.len()
        ));
    }
    if artifact
        .changepoints_t
        .iter()
        .chain(artifact.deltas.iter())
        .any(|v| !v.is_finite())
    {
        return invalid("changepoints and deltas must be finite".to_string());
    }

    for seasonality in &artifact.seasonalities {
        if !(seasonality.period_days.is_finite() && seasonality.period_days > 0.0) {
            return invalid(format!("seasonality '{}' needs a positive period", seasonality.name));
        }
        if seasonality.coefficients.len() != 2 * seasonality.fourier_order {
            return invalid(format!(
                "seasonality '{}' has {} coefficients, expected {}",
                seasonality.name,
                seasonality.coefficients.len(),
                2 * seasonality.fourier_order
            ));
        }
        if seasonality.coefficients.iter().any(|c| !c.is_finite()) {
            return invalid(format!("seasonality '{}' has non-finite coefficients", seasonality.name));
        }
    }

    for regressor in &artifact.regressors {
        if !(regressor.std.is_finite() && regressor.std > 0.0) {
            return invalid(format!("regressor '{}' needs a positive std", regressor.name));
        }
        if !(regressor.mu.is_finite() && regressor.coefficient.is_finite()) {
            return invalid(format!("regressor '{}' has non-finite parameters", regressor.name));
        }
    }

    Ok(())
}

fn fourier_features(days: f64, period_days: f64, order: usize) -> DVector<f64> {
    let mut features = Vec::with_capacity(2 * order);
    for n in 1..=order {
        let x = 2.0 * PI * n as f64 * days / period_days;
        features.push(x.sin());
        features.push(x.cos());
    }
    DVector::from_vec(features)
}

fn seconds_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    let delta = to.signed_duration_since(*from);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_seconds() as f64,
    }
}

fn days_since_epoch(ds: &NaiveDateTime) -> f64 {
    ds.and_utc().timestamp_micros() as f64 / 1e6 / SECONDS_PER_DAY
}
