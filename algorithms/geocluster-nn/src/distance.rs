use geocluster::Float;
use ndarray_stats::DeviationExt;

use crate::Point;

/// A distance function that can be used in spatial algorithms such as nearest neighbour.
///
/// Should satisfy the triangle inequality (no squared euclidean).
pub trait Distance<F: Float>: Clone + Send + Sync {
    /// Computes the distance between two points. Panics if the points do not have the same
    /// dimension.
    fn distance(&self, a: Point<F>, b: Point<F>) -> F;

    /// A faster version of the distance metric that keeps the order of the distance function
    fn rdistance(&self, a: Point<F>, b: Point<F>) -> F {
        self.distance(a, b)
    }

    /// Converts the result of `rdistance` to `distance`
    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist
    }

    /// Converts the result of `distance` to `rdistance`
    fn dist_to_rdist(&self, dist: F) -> F {
        dist
    }
}

/// L2 or [Euclidean](https://en.wikipedia.org/wiki/Euclidean_distance) distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2Dist;
impl<F: Float> Distance<F> for L2Dist {
    #[inline]
    fn distance(&self, a: Point<F>, b: Point<F>) -> F {
        F::from(a.l2_dist(&b).unwrap()).unwrap()
    }

    #[inline]
    fn rdistance(&self, a: Point<F>, b: Point<F>) -> F {
        F::from(a.sq_l2_dist(&b).unwrap()).unwrap()
    }

    #[inline]
    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    #[inline]
    fn dist_to_rdist(&self, dist: F) -> F {
        dist.powi(2)
    }
}
