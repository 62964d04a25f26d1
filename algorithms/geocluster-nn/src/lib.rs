//! `geocluster-nn` provides the distance metrics and the nearest neighbour index used by the
//! density clustering and by the noise diagnostics of the DBSCAN grid search.
//!
//! The index is a brute force linear scan: the regions handled by the pipeline hold a few
//! hundred municipalities per day, far below the size where space partitioning pays off.
//!
//! ## Example
//!
//! ```rust
//! use geocluster_nn::{distance::L2Dist, LinearSearch, NearestNeighbourIndex};
//! use ndarray::{arr1, arr2};
//!
//! let points = arr2(&[[0.0, 2.0], [10.0, 4.0], [4.0, 5.0]]);
//! let index = LinearSearch::new().from_batch(&points, L2Dist).unwrap();
//!
//! let nearest = index.k_nearest(arr1(&[0.0, 0.0]).view(), 2).unwrap();
//! let positions: Vec<usize> = nearest.iter().map(|(_, idx)| *idx).collect();
//! assert_eq!(positions, vec![0, 2]);
//! ```
use geocluster::Float;
use ndarray::ArrayView1;
use thiserror::Error;

pub mod distance;
mod heap_elem;
mod linear;

pub use linear::{LinearSearch, LinearSearchIndex};

pub(crate) type Point<'a, F> = ArrayView1<'a, F>;

/// Error returned when building a nearest neighbour index
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("points have dimension of 0")]
    ZeroDimension,
    #[error("points contain a non finite coordinate")]
    NonFinite,
}

/// Error returned when performing a nearest neighbour query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NnError {
    #[error("dimensions of query point ({0}) and stored points ({1}) are different")]
    WrongDimension(usize, usize),
    #[error("query point contains a non finite coordinate")]
    NonFinite,
}

/// A spatial index over a batch of points, answering k-nearest and range queries. Every result
/// carries the row position of the point in the original batch.
pub trait NearestNeighbourIndex<F: Float> {
    /// Returns the `k` points closest to `point`, sorted by ascending distance. If the index holds
    /// fewer than `k` points, all of them are returned. Points of the batch equal to `point`
    /// are included.
    fn k_nearest<'b>(
        &self,
        point: Point<'b, F>,
        k: usize,
    ) -> Result<Vec<(Point<F>, usize)>, NnError>;

    /// Returns every point whose distance to `point` is at most `range`, in batch order.
    fn within_range<'b>(
        &self,
        point: Point<'b, F>,
        range: F,
    ) -> Result<Vec<(Point<F>, usize)>, NnError>;
}
