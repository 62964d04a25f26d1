use std::collections::BinaryHeap;

use geocluster::Float;
use ndarray::{ArrayBase, ArrayView2, Data, Ix2};

use crate::{
    distance::Distance, heap_elem::MinHeapElem, BuildError, NearestNeighbourIndex, NnError, Point,
};

/// Spatial indexing structure created by [`LinearSearch`]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSearchIndex<'a, F: Float, D: Distance<F>>(ArrayView2<'a, F>, D);

impl<'a, F: Float, D: Distance<F>> LinearSearchIndex<'a, F, D> {
    /// Creates a new `LinearSearchIndex` from a batch of points, one point per row
    pub fn new<DT: Data<Elem = F>>(
        batch: &'a ArrayBase<DT, Ix2>,
        dist_fn: D,
    ) -> Result<Self, BuildError> {
        if batch.ncols() == 0 {
            Err(BuildError::ZeroDimension)
        } else if batch.iter().any(|x| !x.is_finite()) {
            Err(BuildError::NonFinite)
        } else {
            Ok(Self(batch.view(), dist_fn))
        }
    }

    fn check_point(&self, point: &Point<F>) -> Result<(), NnError> {
        if self.0.ncols() != point.len() {
            Err(NnError::WrongDimension(point.len(), self.0.ncols()))
        } else if point.iter().any(|x| !x.is_finite()) {
            Err(NnError::NonFinite)
        } else {
            Ok(())
        }
    }
}

impl<'a, F: Float, D: Distance<F>> NearestNeighbourIndex<F> for LinearSearchIndex<'a, F, D> {
    fn k_nearest<'b>(
        &self,
        point: Point<'b, F>,
        k: usize,
    ) -> Result<Vec<(Point<F>, usize)>, NnError> {
        self.check_point(&point)?;

        let mut heap = BinaryHeap::with_capacity(self.0.nrows());
        for (i, pt) in self.0.rows().into_iter().enumerate() {
            let dist = self.1.rdistance(point.reborrow(), pt.reborrow());
            heap.push(MinHeapElem::new(dist, i, (pt.reborrow(), i)));
        }

        Ok((0..k.min(heap.len()))
            .filter_map(|_| heap.pop().map(|e| e.elem))
            .collect())
    }

    fn within_range<'b>(
        &self,
        point: Point<'b, F>,
        range: F,
    ) -> Result<Vec<(Point<F>, usize)>, NnError> {
        self.check_point(&point)?;

        let range = self.1.dist_to_rdist(range);
        Ok(self
            .0
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, pt)| self.1.rdistance(point.reborrow(), pt.reborrow()) <= range)
            .map(|(i, pt)| (pt, i))
            .collect())
    }
}

/// Implementation of linear search, the simplest nearest neighbour algorithm. All queries are
/// implemented by scanning through every point, so all of them are `O(N)`. Calling
/// `from_batch` returns a [`LinearSearchIndex`].
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct LinearSearch;

impl LinearSearch {
    /// Creates an instance of `LinearSearch`
    pub fn new() -> Self {
        Self
    }

    /// Builds an index over `batch` for the given distance metric
    pub fn from_batch<'a, F: Float, DT: Data<Elem = F>, D: Distance<F>>(
        &self,
        batch: &'a ArrayBase<DT, Ix2>,
        dist_fn: D,
    ) -> Result<LinearSearchIndex<'a, F, D>, BuildError> {
        LinearSearchIndex::new(batch, dist_fn)
    }
}
