//! Model factory: configuration tag to concrete model
//!
//! Maps the configured model type to a constructor, so the active algorithm
//! is chosen by configuration rather than compiled in. The closed tag set
//! lives here; adding a model means adding an arm and a settings section.

use crate::robust::{RobustModel, DEFAULT_MAD_THRESHOLD};
use crate::statistical::{StatisticalModel, DEFAULT_SIGMA_THRESHOLD};
use modelvault_core::{AnomalyModel, Result, StoreError};
use serde::{Deserialize, Serialize};

/// Settings for the statistical model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSettings {
    /// σ-multiplier applied to the training standard deviation
    #[serde(default = "default_sigma_threshold")]
    pub threshold: f64,
}

fn default_sigma_threshold() -> f64 {
    DEFAULT_SIGMA_THRESHOLD
}

impl Default for StatisticalSettings {
    fn default() -> Self {
        StatisticalSettings {
            threshold: DEFAULT_SIGMA_THRESHOLD,
        }
    }
}

/// Settings for the robust model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustSettings {
    /// Multiplier applied to the training MAD
    #[serde(default = "default_mad_threshold")]
    pub threshold: f64,
}

fn default_mad_threshold() -> f64 {
    DEFAULT_MAD_THRESHOLD
}

impl Default for RobustSettings {
    fn default() -> Self {
        RobustSettings {
            threshold: DEFAULT_MAD_THRESHOLD,
        }
    }
}

/// Per-type model settings, one section per known tag
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Settings for the `"statistical"` model
    #[serde(default)]
    pub statistical: StatisticalSettings,
    /// Settings for the `"robust"` model
    #[serde(default)]
    pub robust: RobustSettings,
}

/// Creates models based on the configured type tag
#[derive(Debug, Clone, Default)]
pub struct ModelFactory {
    settings: ModelSettings,
}

impl ModelFactory {
    /// Create a factory with the given per-type settings
    pub fn new(settings: ModelSettings) -> Self {
        ModelFactory { settings }
    }

    /// Tags this factory can construct
    pub fn supported_types() -> &'static [&'static str] {
        &[StatisticalModel::MODEL_TYPE, RobustModel::MODEL_TYPE]
    }

    /// Construct an unfitted model for training, applying configured settings
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedType`] for an unknown tag.
    pub fn create(&self, tag: &str) -> Result<Box<dyn AnomalyModel>> {
        match tag {
            StatisticalModel::MODEL_TYPE => Ok(Box::new(StatisticalModel::new(
                self.settings.statistical.threshold,
            ))),
            RobustModel::MODEL_TYPE => {
                Ok(Box::new(RobustModel::new(self.settings.robust.threshold)))
            }
            other => Err(StoreError::UnsupportedType {
                kind: "model",
                tag: other.to_string(),
            }),
        }
    }

    /// Construct a blank model for hydration from a persisted payload
    ///
    /// Configured settings are not applied; `from_bytes` restores whatever
    /// the artifact was trained with.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedType`] for an unknown tag.
    pub fn create_blank(&self, tag: &str) -> Result<Box<dyn AnomalyModel>> {
        match tag {
            StatisticalModel::MODEL_TYPE => Ok(Box::<StatisticalModel>::default()),
            RobustModel::MODEL_TYPE => Ok(Box::<RobustModel>::default()),
            other => Err(StoreError::UnsupportedType {
                kind: "model",
                tag: other.to_string(),
            }),
        }
    }
}
