use geocluster::param_guard::ParamGuard;
use geocluster::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use thiserror::Error;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters of the [DBSCAN grid search](crate::DbscanGridSearch).
pub struct DbscanGridSearchValidParams<F: Float> {
    /// Values of `eps` to evaluate, in grid order
    pub(crate) eps_grid: Vec<F>,
    /// Values of `min_samples` to evaluate, in grid order
    pub(crate) min_samples_grid: Vec<usize>,
    /// Largest share of a day's points allowed to be noise
    pub(crate) max_noise_ratio: F,
    /// Expected number of points of a day, the noise share is taken from it
    pub(crate) points_per_day: usize,
    /// Neighbours, the point itself included, of the noise distance diagnostic
    pub(crate) n_neighbors: usize,
    /// Pair returned when no candidate satisfies the selection rules
    pub(crate) fallback: (F, usize),
}

#[derive(Clone, Debug, PartialEq)]
/// Builder of [valid grid search hyperparameters](DbscanGridSearchValidParams)
pub struct DbscanGridSearchParams<F: Float>(DbscanGridSearchValidParams<F>);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbscanGridSearchParamsError {
    #[error("every eps of the grid must be finite and greater than 0")]
    Eps,
    #[error("every min_samples of the grid must be greater than 1")]
    MinSamples,
    #[error("max_noise_ratio must be between 0 and 1")]
    NoiseRatio,
    #[error("n_neighbors must be greater than 1")]
    Neighbors,
    #[error("fallback must hold a positive eps and a min_samples greater than 1")]
    Fallback,
}

/// An error when running the DBSCAN grid search
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridSearchError {
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] DbscanGridSearchParamsError),
    #[error(transparent)]
    BaseCrate(#[from] geocluster::Error),
}

impl<F: Float> DbscanGridSearchParams<F> {
    /// Defaults:
    /// * `eps_grid = 0.1, 0.2, .., 1.9`
    /// * `min_samples_grid = 2..=5`
    /// * `max_noise_ratio = 0.33`
    /// * `points_per_day = 257`
    /// * `n_neighbors = 6`
    /// * `fallback = (1.4, 2)`
    pub fn new() -> Self {
        Self(DbscanGridSearchValidParams {
            eps_grid: (1..=19).map(|i| F::cast(i) / F::cast(10)).collect(),
            min_samples_grid: (2..=5).collect(),
            max_noise_ratio: F::cast(0.33),
            points_per_day: 257,
            n_neighbors: 6,
            fallback: (F::cast(1.4), 2),
        })
    }

    pub fn eps_grid(mut self, eps_grid: Vec<F>) -> Self {
        self.0.eps_grid = eps_grid;
        self
    }

    /// Evaluates every `min_samples` between `min` and `max`, both included
    pub fn min_samples_range(mut self, min: usize, max: usize) -> Self {
        self.0.min_samples_grid = (min..=max).collect();
        self
    }

    pub fn max_noise_ratio(mut self, max_noise_ratio: F) -> Self {
        self.0.max_noise_ratio = max_noise_ratio;
        self
    }

    pub fn points_per_day(mut self, points_per_day: usize) -> Self {
        self.0.points_per_day = points_per_day;
        self
    }

    pub fn n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.0.n_neighbors = n_neighbors;
        self
    }

    pub fn fallback(mut self, eps: F, min_samples: usize) -> Self {
        self.0.fallback = (eps, min_samples);
        self
    }
}

impl<F: Float> Default for DbscanGridSearchParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ParamGuard for DbscanGridSearchParams<F> {
    type Checked = DbscanGridSearchValidParams<F>;
    type Error = DbscanGridSearchParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        let valid_eps = |eps: F| eps.is_finite() && eps > F::zero();
        if !p.eps_grid.iter().all(|&eps| valid_eps(eps)) {
            Err(DbscanGridSearchParamsError::Eps)
        } else if p.min_samples_grid.iter().any(|&m| m < 2) {
            Err(DbscanGridSearchParamsError::MinSamples)
        } else if !(p.max_noise_ratio >= F::zero() && p.max_noise_ratio <= F::one()) {
            Err(DbscanGridSearchParamsError::NoiseRatio)
        } else if p.n_neighbors < 2 {
            Err(DbscanGridSearchParamsError::Neighbors)
        } else if !valid_eps(p.fallback.0) || p.fallback.1 < 2 {
            Err(DbscanGridSearchParamsError::Fallback)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float> DbscanGridSearchValidParams<F> {
    pub fn eps_grid(&self) -> &[F] {
        &self.eps_grid
    }

    pub fn min_samples_grid(&self) -> &[usize] {
        &self.min_samples_grid
    }

    /// Number of noise points a candidate may reach on its worst day
    pub fn max_noise_points(&self) -> F {
        self.max_noise_ratio * F::cast(self.points_per_day)
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn fallback(&self) -> (F, usize) {
        self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_grid() {
        let params = DbscanGridSearchParams::<f64>::new().check().unwrap();
        assert_eq!(params.eps_grid().len(), 19);
        assert_abs_diff_eq!(params.eps_grid()[0], 0.1);
        assert_abs_diff_eq!(params.eps_grid()[13], 1.4);
        assert_abs_diff_eq!(params.eps_grid()[18], 1.9);
        assert_eq!(params.min_samples_grid(), &[2, 3, 4, 5]);
        assert_abs_diff_eq!(params.max_noise_points(), 84.81, epsilon = 1e-9);
        assert_eq!(params.fallback(), (1.4, 2));
    }

    #[test]
    fn empty_grid_is_valid() {
        let params = DbscanGridSearchParams::<f64>::new()
            .eps_grid(vec![])
            .min_samples_range(5, 2)
            .check();
        assert!(params.is_ok());
    }

    #[test]
    fn invalid_values() {
        let check = |p: DbscanGridSearchParams<f64>| p.check().unwrap_err();
        assert_eq!(
            check(DbscanGridSearchParams::new().eps_grid(vec![0.5, 0.])),
            DbscanGridSearchParamsError::Eps
        );
        assert_eq!(
            check(DbscanGridSearchParams::new().min_samples_range(1, 3)),
            DbscanGridSearchParamsError::MinSamples
        );
        assert_eq!(
            check(DbscanGridSearchParams::new().max_noise_ratio(1.5)),
            DbscanGridSearchParamsError::NoiseRatio
        );
        assert_eq!(
            check(DbscanGridSearchParams::new().n_neighbors(1)),
            DbscanGridSearchParamsError::Neighbors
        );
        assert_eq!(
            check(DbscanGridSearchParams::new().fallback(1.4, 0)),
            DbscanGridSearchParamsError::Fallback
        );
    }
}
