//! Threshold model over mean and standard deviation
//!
//! A point is anomalous when it exceeds mean + σ-multiplier × std-dev of the
//! training series. The payload is a small JSON document carrying the fitted
//! moments together with the configured multiplier.

use modelvault_core::{AnomalyModel, DataPoint, Result, StoreError, TimeSeries};
use serde::{Deserialize, Serialize};

/// Default σ-multiplier
pub const DEFAULT_SIGMA_THRESHOLD: f64 = 3.0;

/// Fitted moments of the training series
#[derive(Debug, Clone, Copy, PartialEq)]
struct FittedStats {
    mean: f64,
    std: f64,
}

/// Serialized form of a fitted statistical model
#[derive(Debug, Serialize, Deserialize)]
struct StatisticalPayload {
    model_type: String,
    threshold: f64,
    mean: f64,
    std: f64,
}

/// Anomaly detection via mean + N standard deviations
#[derive(Debug, Clone)]
pub struct StatisticalModel {
    threshold: f64,
    state: Option<FittedStats>,
}

impl StatisticalModel {
    /// Type tag persisted in artifact metadata
    pub const MODEL_TYPE: &'static str = "statistical";

    /// Create an unfitted model with the given σ-multiplier
    pub fn new(threshold: f64) -> Self {
        StatisticalModel {
            threshold,
            state: None,
        }
    }

    /// The configured σ-multiplier
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for StatisticalModel {
    fn default() -> Self {
        StatisticalModel::new(DEFAULT_SIGMA_THRESHOLD)
    }
}

impl AnomalyModel for StatisticalModel {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        if series.is_empty() {
            return Err(StoreError::Fitting(
                "cannot fit on an empty time series".to_string(),
            ));
        }

        let n = series.len() as f64;
        let mean = series.values().sum::<f64>() / n;
        // Population standard deviation, matching how the moments are
        // interpreted at predict time.
        let variance = series.values().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        self.state = Some(FittedStats {
            mean,
            std: variance.sqrt(),
        });
        Ok(())
    }

    fn predict(&self, point: &DataPoint) -> Result<bool> {
        let stats = self.state.ok_or(StoreError::UnfittedModel)?;
        Ok(point.value > stats.mean + self.threshold * stats.std)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let stats = self.state.ok_or(StoreError::UnfittedModel)?;
        let payload = StatisticalPayload {
            model_type: Self::MODEL_TYPE.to_string(),
            threshold: self.threshold,
            mean: stats.mean,
            std: stats.std,
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    fn from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let payload: StatisticalPayload = serde_json::from_slice(bytes)?;
        self.threshold = payload.threshold;
        self.state = Some(FittedStats {
            mean: payload.mean,
            std: payload.std,
        });
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn model_type(&self) -> &'static str {
        Self::MODEL_TYPE
    }
}
