//! `geocluster-clustering` provides the two interchangeable clustering strategies used to
//! label one day of municipality records, plus the machinery that picks their
//! hyperparameters automatically.
//!
//! ## Current state
//!
//! * [DBSCAN](Dbscan): density clustering, points in no dense neighbourhood are noise;
//! * [K-Means](KMeans): centroid clustering seeded for reproducibility;
//! * [K selection](KSelection): fits K-Means for every `k` of a range and keeps the one
//!   maximising the silhouette coefficient;
//! * [DBSCAN grid search](DbscanGridSearch): evaluates a grid of `(eps, min_samples)` over
//!   every day of a quarter and selects a single pair for the whole quarter.
//!
//! All algorithms follow the hyperparameter pattern of the workspace: a builder returned by
//! `Algorithm::params(..)`, validated through [`ParamGuard`](geocluster::ParamGuard) when
//! `fit` is called.
mod dbscan;
mod grid_search;
#[allow(clippy::new_ret_no_self)]
mod k_means;
mod utils;

pub use dbscan::*;
pub use grid_search::*;
pub use k_means::*;
pub use utils::count_distinct_rows;
