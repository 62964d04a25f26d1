use crate::KMeansParamsError;

use geocluster::param_guard::ParamGuard;
use geocluster::Float;
use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters of [K-Means](crate::KMeans).
pub struct KMeansValidParams<F: Float, R: Rng> {
    /// Restarts from fresh centroids, the run with the lowest inertia is kept
    n_runs: usize,
    /// A run stops once the centroids move less than `tolerance`, in squared distance
    tolerance: F,
    /// Upper bound on the iterations of a run, converged or not
    max_n_iterations: u64,
    n_clusters: usize,
    rng: R,
}

#[derive(Clone, Debug, PartialEq)]
/// Builder of [valid K-Means hyperparameters](KMeansValidParams).
pub struct KMeansParams<F: Float, R: Rng>(KMeansValidParams<F, R>);

impl<F: Float, R: Rng> KMeansParams<F, R> {
    /// Looks for `n_clusters` centroids. The daily clustering of municipalities relies on the
    /// defaults:
    /// * `n_runs = 10`
    /// * `tolerance = 1e-4`
    /// * `max_n_iterations = 300`
    ///
    /// Every run starts from centroids picked by k-means++.
    pub fn new(n_clusters: usize, rng: R) -> Self {
        Self(KMeansValidParams {
            n_runs: 10,
            tolerance: F::cast(1e-4),
            max_n_iterations: 300,
            n_clusters,
            rng,
        })
    }

    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.0.n_runs = n_runs;
        self
    }

    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    pub fn max_n_iterations(mut self, max_n_iterations: u64) -> Self {
        self.0.max_n_iterations = max_n_iterations;
        self
    }
}

impl<F: Float, R: Rng> ParamGuard for KMeansParams<F, R> {
    type Checked = KMeansValidParams<F, R>;
    type Error = KMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.n_clusters == 0 {
            Err(KMeansParamsError::NClusters)
        } else if p.n_runs == 0 {
            Err(KMeansParamsError::NRuns)
        } else if p.tolerance <= F::zero() {
            Err(KMeansParamsError::Tolerance)
        } else if p.max_n_iterations == 0 {
            Err(KMeansParamsError::MaxIterations)
        } else {
            Ok(p)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> KMeansValidParams<F, R> {
    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Generator every run draws its initial centroids from
    pub fn rng(&self) -> &R {
        &self.rng
    }
}
