use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, Normal, Poisson};
use statrs::distribution::{ContinuousCDF, Normal as StatsNormal};
use statrs::statistics::{Data, OrderStatistics};

use crate::error::MLError;

/// Piecewise-linear trend parameters in scaled time.
#[derive(Debug, Clone)]
pub struct TrendParams {
    pub k: f64,
    pub m: f64,
    pub changepoints_t: Vec<f64>,
    pub deltas: Vec<f64>,
}

impl TrendParams {
    pub fn piecewise_linear(&self, t: f64) -> f64 {
        let (slope, offset) = self.slope_offset(t);
        slope * t + offset
    }

    /// Slope and intercept of the segment active at `t`.
    fn slope_offset(&self, t: f64) -> (f64, f64) {
        let mut slope = self.k;
        let mut offset = self.m;
        for (&cp, &delta) in self.changepoints_t.iter().zip(&self.deltas) {
            if t >= cp {
                slope += delta;
                offset -= cp * delta;
            }
        }
        (slope, offset)
    }

    /// One draw of the trend at `t`, with new changepoints simulated past the
    /// end of history (t > 1) at the historical rate. Every simulated
    /// changepoint lies before `t`, so each one folds straight into the
    /// segment's slope and intercept.
    fn sample(&self, t: f64, rng: &mut StdRng) -> f64 {
        if t <= 1.0 || self.changepoints_t.is_empty() {
            return self.piecewise_linear(t);
        }

        let rate = self.changepoints_t.len() as f64 * (t - 1.0);
        let n_changes = match Poisson::new(rate) {
            Ok(poisson) => {
                let count: f64 = poisson.sample(rng);
                count as usize
            }
            Err(_) => 0,
        };

        let (mut slope, mut offset) = self.slope_offset(t);
        if n_changes == 0 {
            return slope * t + offset;
        }

        let scale = self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64 + 1e-8;
        for _ in 0..n_changes {
            let cp = 1.0 + rng.gen::<f64>() * (t - 1.0);
            let delta = sample_laplace(scale, rng);
            slope += delta;
            offset -= cp * delta;
        }

        slope * t + offset
    }
}

fn sample_laplace(scale: f64, rng: &mut StdRng) -> f64 {
    let magnitude: f64 = Exp1.sample(rng);
    if rng.gen::<bool>() {
        magnitude * scale
    } else {
        -magnitude * scale
    }
}

/// The pieces of a point forecast the interval is built around.
#[derive(Debug, Clone, Copy)]
pub struct PointForecast<'a> {
    pub ds: &'a NaiveDateTime,
    pub t: f64,
    pub yhat: f64,
    pub trend: f64,
    pub multiplicative: f64,
    pub additive: f64,
}

#[derive(Debug, Clone)]
pub struct IntervalEstimator {
    interval_width: f64,
    sigma_obs: f64,
    samples: usize,
    seed: u64,
    z: f64,
}

impl IntervalEstimator {
    pub fn new(interval_width: f64, sigma_obs: f64, samples: usize, seed: u64) -> Result<Self, MLError> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(MLError::ArtifactError(format!(
                "interval_width must be in (0, 1), got {}",
                interval_width
            )));
        }
        if !(sigma_obs.is_finite() && sigma_obs >= 0.0) {
            return Err(MLError::ArtifactError(format!(
                "sigma_obs must be non-negative, got {}",
                sigma_obs
            )));
        }

        let standard = StatsNormal::new(0.0, 1.0)
            .map_err(|e| MLError::ArtifactError(e.to_string()))?;
        let z = standard.inverse_cdf((1.0 + interval_width) / 2.0);

        Ok(Self {
            interval_width,
            sigma_obs,
            samples,
            seed,
            z,
        })
    }

    /// Lower and upper bounds at the configured width. The returned interval
    /// always contains `point.yhat`. Simulation stops early with an
    /// `InferenceError` once `cancel` is raised.
    pub fn bounds(
        &self,
        point: &PointForecast<'_>,
        trend: Option<&TrendParams>,
        y_scale: f64,
        cancel: &AtomicBool,
    ) -> Result<(f64, f64), MLError> {
        let (lower, upper) = if self.samples == 0 {
            self.analytic(point, y_scale)
        } else {
            self.simulated(point, trend, y_scale, cancel)?
        };

        Ok((lower.min(point.yhat), upper.max(point.yhat)))
    }

    fn analytic(&self, point: &PointForecast<'_>, y_scale: f64) -> (f64, f64) {
        let half_width = self.z * self.sigma_obs * y_scale.abs();
        (point.yhat - half_width, point.yhat + half_width)
    }

    fn simulated(
        &self,
        point: &PointForecast<'_>,
        trend: Option<&TrendParams>,
        y_scale: f64,
        cancel: &AtomicBool,
    ) -> Result<(f64, f64), MLError> {
        let mut rng = StdRng::seed_from_u64(row_seed(self.seed, point.ds));
        let noise = Normal::new(0.0, self.sigma_obs * y_scale.abs()).ok();

        let mut draws = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            if cancel.load(Ordering::Relaxed) {
                return Err(MLError::InferenceError("inference cancelled".to_string()));
            }
            let trend_draw = match trend {
                Some(params) => params.sample(point.t, &mut rng) * y_scale,
                None => point.trend,
            };
            let eps = noise.as_ref().map(|n| n.sample(&mut rng)).unwrap_or(0.0);
            draws.push(trend_draw * (1.0 + point.multiplicative) + point.additive + eps);
        }

        let mut data = Data::new(draws);
        let tail = (1.0 - self.interval_width) / 2.0;
        Ok((data.quantile(tail), data.quantile(1.0 - tail)))
    }
}

/// Seed derived from the artifact seed and the row timestamp, so a row gets
/// the same draws no matter which batch it arrives in.
fn row_seed(seed: u64, ds: &NaiveDateTime) -> u64 {
    let micros = ds.and_utc().timestamp_micros() as u64;
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ micros
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::tests::ts;

    fn point(ds: &NaiveDateTime, t: f64, yhat: f64) -> PointForecast<'_> {
        PointForecast {
            ds,
            t,
            yhat,
            trend: yhat,
            multiplicative: 0.0,
            additive: 0.0,
        }
    }

    #[test]
    fn test_analytic_interval_uses_normal_quantile() {
        let estimator = IntervalEstimator::new(0.8, 0.05, 0, 0).unwrap();
        let ds = ts(2024, 6, 1, 12);

        let (lower, upper) = estimator
            .bounds(&point(&ds, 0.5, 400.0), None, 1000.0, &AtomicBool::new(false))
            .unwrap();

        // z(0.9) ~= 1.2816
        let half = 1.281_551_565_5 * 0.05 * 1000.0;
        assert!((lower - (400.0 - half)).abs() < 1e-4);
        assert!((upper - (400.0 + half)).abs() < 1e-4);
    }

    #[test]
    fn test_zero_noise_collapses_to_point() {
        let estimator = IntervalEstimator::new(0.95, 0.0, 0, 0).unwrap();
        let ds = ts(2024, 6, 1, 12);

        let (lower, upper) = estimator
            .bounds(&point(&ds, 0.5, 12.5), None, 1000.0, &AtomicBool::new(false))
            .unwrap();
        assert_eq!((lower, upper), (12.5, 12.5));
    }

    #[test]
    fn test_simulated_interval_is_deterministic_and_brackets() {
        let estimator = IntervalEstimator::new(0.8, 0.05, 500, 42).unwrap();
        let trend = TrendParams {
            k: 0.1,
            m: 0.2,
            changepoints_t: vec![0.2, 0.4, 0.6, 0.8],
            deltas: vec![0.05, -0.05, 0.02, -0.01],
        };
        let ds = ts(2026, 1, 1, 0);
        let t = 1.3;
        let yhat = trend.piecewise_linear(t) * 1000.0;

        let running = AtomicBool::new(false);

        let first = estimator.bounds(&point(&ds, t, yhat), Some(&trend), 1000.0, &running).unwrap();
        let second = estimator.bounds(&point(&ds, t, yhat), Some(&trend), 1000.0, &running).unwrap();

        assert_eq!(first, second);
        assert!(first.0 <= yhat && yhat <= first.1);
        assert!(first.1 > first.0);
    }

    #[test]
    fn test_future_trend_samples_stay_continuous_in_history() {
        let trend = TrendParams {
            k: 0.1,
            m: 0.2,
            changepoints_t: vec![0.5],
            deltas: vec![0.3],
        };
        let mut rng = StdRng::seed_from_u64(7);

        // inside history no new changepoints are drawn
        assert_eq!(trend.sample(0.9, &mut rng), trend.piecewise_linear(0.9));
    }

    #[test]
    fn test_sample_matches_trend_extended_with_drawn_changepoints() {
        let trend = TrendParams {
            k: 0.1,
            m: 0.2,
            changepoints_t: vec![0.5],
            deltas: vec![0.3],
        };
        let t = 1.8;

        let mut rng = StdRng::seed_from_u64(11);
        let drawn = trend.sample(t, &mut rng);

        // replay the same draws into an explicit changepoint list
        let mut replay = StdRng::seed_from_u64(11);
        let count: f64 = Poisson::new(0.8).unwrap().sample(&mut replay);
        let mut extended = trend.clone();
        for _ in 0..count as usize {
            extended.changepoints_t.push(1.0 + replay.gen::<f64>() * (t - 1.0));
            extended.deltas.push(sample_laplace(0.3 + 1e-8, &mut replay));
        }

        assert!((drawn - extended.piecewise_linear(t)).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_simulation_stops() {
        let estimator = IntervalEstimator::new(0.8, 0.05, 1_000_000, 42).unwrap();
        let trend = TrendParams {
            k: 0.1,
            m: 0.2,
            changepoints_t: vec![0.2, 0.4, 0.6, 0.8],
            deltas: vec![0.05, -0.05, 0.02, -0.01],
        };
        let ds = ts(2026, 1, 1, 0);

        let err = estimator
            .bounds(&point(&ds, 1.3, 300.0), Some(&trend), 1000.0, &AtomicBool::new(true))
            .unwrap_err();

        assert_eq!(err.to_string(), "inference cancelled");
    }

    #[test]
    fn test_invalid_width_rejected() {
        assert!(IntervalEstimator::new(1.0, 0.1, 0, 0).is_err());
        assert!(IntervalEstimator::new(0.0, 0.1, 0, 0).is_err());
        assert!(IntervalEstimator::new(0.8, -0.1, 0, 0).is_err());
    }
}
