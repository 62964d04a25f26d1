use geocluster::param_guard::ParamGuard;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// Radii of the gap filling search, in meters
pub struct AggregationValidParams {
    pub(crate) initial_radius: f64,
    pub(crate) radius_step: f64,
    pub(crate) max_radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Builder of [valid aggregation parameters](AggregationValidParams)
pub struct AggregationParams(AggregationValidParams);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationParamsError {
    #[error("initial_radius must be finite and greater than 0")]
    InitialRadius,
    #[error("radius_step must be finite and greater than 0")]
    RadiusStep,
    #[error("max_radius must be finite and not smaller than initial_radius")]
    MaxRadius,
}

impl AggregationParams {
    /// Defaults:
    /// * `initial_radius = 2000`
    /// * `radius_step = 1000`
    /// * `max_radius = 100000`
    pub fn new() -> Self {
        Self(AggregationValidParams {
            initial_radius: 2000.,
            radius_step: 1000.,
            max_radius: 100_000.,
        })
    }

    pub fn initial_radius(mut self, initial_radius: f64) -> Self {
        self.0.initial_radius = initial_radius;
        self
    }

    pub fn radius_step(mut self, radius_step: f64) -> Self {
        self.0.radius_step = radius_step;
        self
    }

    pub fn max_radius(mut self, max_radius: f64) -> Self {
        self.0.max_radius = max_radius;
        self
    }
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamGuard for AggregationParams {
    type Checked = AggregationValidParams;
    type Error = AggregationParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if !(p.initial_radius.is_finite() && p.initial_radius > 0.) {
            Err(AggregationParamsError::InitialRadius)
        } else if !(p.radius_step.is_finite() && p.radius_step > 0.) {
            Err(AggregationParamsError::RadiusStep)
        } else if !(p.max_radius.is_finite() && p.max_radius >= p.initial_radius) {
            Err(AggregationParamsError::MaxRadius)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl AggregationValidParams {
    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    pub fn radius_step(&self) -> f64 {
        self.radius_step
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Radii tried in turn by the gap filling, from `initial_radius` up to `max_radius`
    pub fn radii(&self) -> impl Iterator<Item = f64> {
        let (initial, step, max) = (self.initial_radius, self.radius_step, self.max_radius);
        (0u64..)
            .map(move |i| initial + step * i as f64)
            .take_while(move |&r| r <= max)
    }
}
