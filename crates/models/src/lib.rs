//! Model implementations for Modelvault
//!
//! Two concrete [`AnomalyModel`](modelvault_core::AnomalyModel) variants and
//! the factory that constructs them from configuration:
//! - `statistical`: mean + σ-multiplier × std-dev threshold, JSON payload
//! - `robust`: median + k × MAD threshold, bincode payload
//!
//! The storage engine never depends on a specific variant; it dispatches
//! through [`ModelFactory`] using the type tag recorded in artifact metadata.

pub mod factory;
pub mod robust;
pub mod statistical;

pub use factory::{ModelFactory, ModelSettings, RobustSettings, StatisticalSettings};
pub use robust::{RobustModel, DEFAULT_MAD_THRESHOLD};
pub use statistical::{StatisticalModel, DEFAULT_SIGMA_THRESHOLD};
