use thiserror::Error;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KMeansParamsError {
    #[error("n_clusters cannot be 0")]
    NClusters,
    #[error("n_runs cannot be 0")]
    NRuns,
    #[error("tolerance must be greater than 0")]
    Tolerance,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
    #[error("cluster range {0}..={1} must start at 2 or more and not be empty")]
    ClusterRange(usize, usize),
}

/// An error when modeling a KMeans algorithm
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KMeansError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] KMeansParamsError),
    /// When inertia computation fails
    #[error("Fitting failed: No inertia improvement (-inf)")]
    InertiaError,
    /// When there are fewer records than requested clusters
    #[error("Fitting failed: {0} samples cannot be split into {1} clusters")]
    TooFewSamples(usize, usize),
    /// When the records hold fewer than two different points
    #[error("Fitting failed: found {0} distinct points, at least 2 are required")]
    TooFewDistinctPoints(usize),
    /// When no number of clusters of the searched range could be scored
    #[error("Model selection failed: no number of clusters between {0} and {1} could be scored")]
    NoScoredClustering(usize, usize),
    #[error(transparent)]
    BaseCrate(#[from] geocluster::Error),
}
