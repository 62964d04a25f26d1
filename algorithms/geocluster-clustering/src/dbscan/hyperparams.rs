use geocluster::{param_guard::ParamGuard, Float};
use geocluster_nn::{distance::Distance, BuildError, NnError};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use thiserror::Error;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
/// The set of hyperparameters that can be specified for the execution of
/// the [DBSCAN algorithm](struct.Dbscan.html).
pub struct DbscanValidParams<F: Float, D: Distance<F>> {
    pub(crate) tolerance: F,
    pub(crate) min_points: usize,
    pub(crate) dist_fn: D,
}

#[derive(Debug, Clone, PartialEq)]
/// Helper struct for building a set of [DBSCAN hyperparameters](struct.DbscanValidParams.html)
pub struct DbscanParams<F: Float, D: Distance<F>>(DbscanValidParams<F, D>);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbscanParamsError {
    #[error("min_points must be greater than 1")]
    MinPoints,
    #[error("tolerance must be greater than 0")]
    Tolerance,
}

/// An error when fitting DBSCAN on a batch of records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbscanError {
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] DbscanParamsError),
    #[error("Cannot index the records: {0}")]
    Index(#[from] BuildError),
    #[error("Neighbourhood query failed: {0}")]
    Query(#[from] NnError),
    #[error(transparent)]
    BaseCrate(#[from] geocluster::Error),
}

impl<F: Float, D: Distance<F>> DbscanParams<F, D> {
    pub(crate) fn new(min_points: usize, dist_fn: D) -> Self {
        Self(DbscanValidParams {
            min_points,
            tolerance: F::cast(0.5),
            dist_fn,
        })
    }

    /// Set the tolerance, the radius of the neighbourhood of a point (`eps`)
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Set the distance metric
    pub fn dist_fn(mut self, dist_fn: D) -> Self {
        self.0.dist_fn = dist_fn;
        self
    }
}

impl<F: Float, D: Distance<F>> ParamGuard for DbscanParams<F, D> {
    type Checked = DbscanValidParams<F, D>;
    type Error = DbscanParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.min_points <= 1 {
            Err(DbscanParamsError::MinPoints)
        } else if self.0.tolerance <= F::zero() || !self.0.tolerance.is_finite() {
            Err(DbscanParamsError::Tolerance)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, D: Distance<F>> DbscanValidParams<F, D> {
    /// Radius of the neighbourhood of a point
    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    /// Minimum number of points, the point itself included, a neighbourhood needs to hold for
    /// its center to be a core point and not a noise point.
    pub fn minimum_points(&self) -> usize {
        self.min_points
    }

    /// Distance metric used in the DBSCAN calculation
    pub fn dist_fn(&self) -> &D {
        &self.dist_fn
    }
}
