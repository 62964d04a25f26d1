//! # Preprocessing
//! `geocluster-preprocessing` provides the feature scaling applied to every day of records
//! before it is clustered.
//!
//! Right now it offers the [standard scaler](linear_scaling::LinearScaler): each feature is
//! centered on its mean and divided by its (population) standard deviation. Scaling parameters
//! are learned fresh on every call, nothing is persisted between days.

pub mod error;
pub mod linear_scaling;

pub use error::{PreprocessingError, Result};
pub use linear_scaling::{FittedLinearScaler, LinearScaler, ScalingMethod};
