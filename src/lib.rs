//! `geocluster` is the core crate of a small toolkit that turns gridded sensor
//! readings into per-municipality time clusterings and into a pairwise
//! "how often do two cities land in the same cluster" similarity.
//!
//! ## The big picture
//!
//! The workspace is organised the way a classical machine learning toolkit
//! would be:
//!
//! * this crate holds the shared vocabulary: the [`Float`] bound, the
//!   [`Fit`](traits::Fit)/[`Transformer`](traits::Transformer) traits, the
//!   [`ParamGuard`] hyperparameter validation pattern and the clustering
//!   quality [metrics];
//! * `geocluster-nn` provides distance metrics and nearest neighbour queries;
//! * `geocluster-preprocessing` provides the standard scaler;
//! * `geocluster-clustering` provides DBSCAN, K-Means, selection of the
//!   number of clusters and the quarterly DBSCAN grid search;
//! * `geocluster-geo` assigns lat/long samples to municipality polygons;
//! * `geocluster-pipeline` composes everything per year, quarter and
//!   collection and forwards the results to storage.

pub mod error;
mod float;
mod metrics_clustering;
pub mod param_guard;
pub mod prelude;
pub mod traits;

pub use error::{Error, Result};
pub use float::Float;
pub use param_guard::ParamGuard;

/// Common metrics functions for clustering
pub mod metrics {
    pub use crate::metrics_clustering::ClusterQuality;
}
