//! Robust threshold model over median and MAD
//!
//! A point is anomalous when its absolute deviation from the training median
//! exceeds k × MAD (median absolute deviation). Compared to the mean/std
//! model this is two-sided and insensitive to outliers already present in
//! the training data. The payload is bincode, which also keeps the storage
//! layer honest about treating payload bytes as opaque.

use modelvault_core::{AnomalyModel, DataPoint, Result, StoreError, TimeSeries};
use serde::{Deserialize, Serialize};

/// Default MAD multiplier
pub const DEFAULT_MAD_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct RobustStats {
    median: f64,
    mad: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RobustPayload {
    threshold: f64,
    stats: RobustStats,
}

/// Anomaly detection via median + k × MAD
#[derive(Debug, Clone)]
pub struct RobustModel {
    threshold: f64,
    state: Option<RobustStats>,
}

impl RobustModel {
    /// Type tag persisted in artifact metadata
    pub const MODEL_TYPE: &'static str = "robust";

    /// Create an unfitted model with the given MAD multiplier
    pub fn new(threshold: f64) -> Self {
        RobustModel {
            threshold,
            state: None,
        }
    }

    /// The configured MAD multiplier
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for RobustModel {
    fn default() -> Self {
        RobustModel::new(DEFAULT_MAD_THRESHOLD)
    }
}

/// Median of a non-empty, sorted slice
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

impl AnomalyModel for RobustModel {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        if series.is_empty() {
            return Err(StoreError::Fitting(
                "cannot fit on an empty time series".to_string(),
            ));
        }

        let mut values: Vec<f64> = series.values().collect();
        values.sort_by(f64::total_cmp);
        let median = median_of_sorted(&values);

        let mut deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
        deviations.sort_by(f64::total_cmp);
        let mad = median_of_sorted(&deviations);

        self.state = Some(RobustStats { median, mad });
        Ok(())
    }

    fn predict(&self, point: &DataPoint) -> Result<bool> {
        let stats = self.state.ok_or(StoreError::UnfittedModel)?;
        Ok((point.value - stats.median).abs() > self.threshold * stats.mad)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let stats = self.state.ok_or(StoreError::UnfittedModel)?;
        let payload = RobustPayload {
            threshold: self.threshold,
            stats,
        };
        Ok(bincode::serialize(&payload)?)
    }

    fn from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let payload: RobustPayload = bincode::deserialize(bytes)?;
        self.threshold = payload.threshold;
        self.state = Some(payload.stats);
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn model_type(&self) -> &'static str {
        Self::MODEL_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64) -> DataPoint {
        DataPoint::new(0, value)
    }

    #[test]
    fn fit_computes_median_and_mad() {
        let mut model = RobustModel::new(2.0);
        // median = 10, deviations [0, 0, 1, 2, 90] -> mad = 1
        model
            .fit(&TimeSeries::from_values([10.0, 10.0, 9.0, 12.0, 100.0]))
            .unwrap();
        assert!(!model.predict(&point(11.0)).unwrap()); // |1| <= 2
        assert!(model.predict(&point(13.0)).unwrap()); // |3| > 2
    }

    #[test]
    fn detection_is_two_sided() {
        let mut model = RobustModel::new(2.0);
        model
            .fit(&TimeSeries::from_values([10.0, 9.0, 11.0, 10.0, 10.0]))
            .unwrap();
        assert!(model.predict(&point(20.0)).unwrap());
        assert!(model.predict(&point(0.0)).unwrap());
        assert!(!model.predict(&point(10.0)).unwrap());
    }

    #[test]
    fn outlier_in_training_data_does_not_inflate_cutoff() {
        let mut robust = RobustModel::new(3.0);
        robust
            .fit(&TimeSeries::from_values([
                10.0, 10.5, 9.5, 10.0, 10.0, 1000.0,
            ]))
            .unwrap();
        // A mean/std cutoff would swallow 50.0; the MAD cutoff still flags it.
        assert!(robust.predict(&point(50.0)).unwrap());
    }

    #[test]
    fn even_length_series_uses_midpoint_median() {
        let mut model = RobustModel::default();
        model
            .fit(&TimeSeries::from_values([1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        // median = 2.5
        assert!(!model.predict(&point(2.5)).unwrap());
    }

    #[test]
    fn fit_on_empty_series_fails() {
        let mut model = RobustModel::default();
        assert!(matches!(
            model.fit(&TimeSeries::default()),
            Err(StoreError::Fitting(_))
        ));
    }

    #[test]
    fn unfitted_use_fails() {
        let model = RobustModel::default();
        assert!(matches!(
            model.predict(&point(1.0)),
            Err(StoreError::UnfittedModel)
        ));
        assert!(matches!(model.to_bytes(), Err(StoreError::UnfittedModel)));
    }

    #[test]
    fn payload_round_trip_restores_fitted_state() {
        let mut model = RobustModel::new(1.5);
        model
            .fit(&TimeSeries::from_values([3.0, 4.0, 5.0, 6.0, 7.0]))
            .unwrap();
        let bytes = model.to_bytes().unwrap();

        let mut restored = RobustModel::default();
        restored.from_bytes(&bytes).unwrap();

        assert!(restored.is_fitted());
        assert_eq!(restored.threshold(), 1.5);
        for value in [0.0, 5.0, 8.0] {
            assert_eq!(
                restored.predict(&point(value)).unwrap(),
                model.predict(&point(value)).unwrap()
            );
        }
    }

    #[test]
    fn payload_is_not_interchangeable_with_json() {
        let mut model = RobustModel::default();
        assert!(model.from_bytes(b"{\"mean\": 1.0}").is_err());
    }
}
