use std::collections::VecDeque;

use geocluster::traits::Fit;
use geocluster::Float;
use geocluster_nn::{
    distance::{Distance, L2Dist},
    LinearSearch, NearestNeighbourIndex,
};
use ndarray::{Array1, ArrayBase, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dbscan::hyperparams::{DbscanError, DbscanParams, DbscanValidParams};

#[derive(Clone, Debug, PartialEq)]
/// DBSCAN (Density-based Spatial Clustering of Applications with Noise)
/// clusters together points which are close together with enough neighbors
/// labelled points which are sparsely neighbored as noise. As points may be
/// part of a cluster or noise the fitted labels are `Option<usize>`.
///
/// As it groups together points in dense regions the number of clusters is
/// determined by the dataset and distance tolerance not the user.
///
/// We provide an implemention of the standard O(N^2) query-based algorithm
/// of which more details can be found in the next section or
/// [here](https://en.wikipedia.org/wiki/DBSCAN).
///
/// ## The algorithm
///
/// The algorithm iterates over each point in the dataset and for every point
/// not yet assigned to a cluster:
/// - Find all points within the neighborhood of size `tolerance`, the point itself included
/// - If the number of points in the neighborhood is below `min_points` leave it unlabelled,
/// it becomes noise unless a later cluster reaches it
/// - Otherwise label the point with the cluster ID and repeat with each of the
/// neighbours
///
/// ## Tutorial
///
/// ```rust
/// use geocluster::traits::Fit;
/// use geocluster_clustering::{Dbscan, DbscanError};
/// use ndarray::array;
///
/// let observations = array![[0., 0.], [0., 0.5], [0.5, 0.], [10., 10.], [10., 10.4], [50., 50.]];
///
/// // `min_points` is the only mandatory parameter, `tolerance` defaults to 0.5
/// let model = Dbscan::params(2)
///     .tolerance(0.6)
///     .fit(&observations)
///     .map_err(|e: DbscanError| e)
///     .unwrap();
///
/// // Points are `None` if noise `Some(id)` if belonging to a cluster.
/// assert_eq!(model.labels()[0], Some(0));
/// assert_eq!(model.labels()[3], Some(1));
/// assert_eq!(model.labels()[5], None);
/// assert_eq!(model.n_clusters(), 2);
/// assert_eq!(model.n_noise(), 1);
/// ```
pub struct Dbscan;

impl Dbscan {
    /// Configures the hyperparameters with the minimum number of points required to form a cluster
    ///
    /// Defaults are provided if the optional parameters are not specified:
    /// * `tolerance = 0.5`
    /// * `dist_fn = L2Dist` (Euclidean distance)
    pub fn params<F: Float>(min_points: usize) -> DbscanParams<F, L2Dist> {
        Self::params_with(min_points, L2Dist)
    }

    /// Configures the hyperparameters with the minimum number of points and a custom distance
    /// metric
    pub fn params_with<F: Float, D: Distance<F>>(min_points: usize, dist_fn: D) -> DbscanParams<F, D> {
        DbscanParams::new(min_points, dist_fn)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Outcome of fitting [DBSCAN](struct.Dbscan.html) on a batch of records: one label per record
/// and the hyperparameters that produced them.
pub struct DbscanModel<F: Float> {
    tolerance: F,
    min_points: usize,
    labels: Array1<Option<usize>>,
    core_sample_indices: Vec<usize>,
    n_clusters: usize,
}

impl<F: Float> DbscanModel<F> {
    /// `Some(cluster)` for clustered records, `None` for noise
    pub fn labels(&self) -> &Array1<Option<usize>> {
        &self.labels
    }

    /// Positions of the core points, ascending
    pub fn core_sample_indices(&self) -> &[usize] {
        &self.core_sample_indices
    }

    /// Number of clusters found, noise excluded
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of records labelled as noise
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn minimum_points(&self) -> usize {
        self.min_points
    }
}

impl<F: Float, D: Data<Elem = F>, DF: Distance<F>> Fit<ArrayBase<D, Ix2>, DbscanError>
    for DbscanValidParams<F, DF>
{
    type Object = DbscanModel<F>;

    fn fit(&self, observations: &ArrayBase<D, Ix2>) -> Result<Self::Object, DbscanError> {
        let n_samples = observations.nrows();
        let mut cluster_memberships = Array1::from_elem(n_samples, None);
        let mut is_core = vec![false; n_samples];
        let mut current_cluster_id = 0;
        if n_samples == 0 {
            return Ok(self.model(cluster_memberships, is_core, current_cluster_id));
        }
        // Tracks whether a value is in the search queue to prevent duplicates
        let mut search_found = vec![false; n_samples];
        let mut search_queue = VecDeque::with_capacity(n_samples);
        let nn = LinearSearch::new().from_batch(observations, self.dist_fn().clone())?;

        for i in 0..n_samples {
            if cluster_memberships[i].is_some() {
                continue;
            }
            let (neighbor_count, neighbors) =
                self.find_neighbors(&nn, i, observations, &cluster_memberships)?;
            if neighbor_count < self.minimum_points() {
                continue;
            }
            is_core[i] = true;
            neighbors.iter().for_each(|&n| search_found[n] = true);
            search_queue.extend(neighbors.into_iter());

            // Now go over the neighbours adding them to the cluster
            cluster_memberships[i] = Some(current_cluster_id);

            while let Some(candidate_idx) = search_queue.pop_front() {
                search_found[candidate_idx] = false;

                let (neighbor_count, neighbors) =
                    self.find_neighbors(&nn, candidate_idx, observations, &cluster_memberships)?;
                // Make the candidate a part of the cluster even if it's not a core point
                cluster_memberships[candidate_idx] = Some(current_cluster_id);
                if neighbor_count >= self.minimum_points() {
                    is_core[candidate_idx] = true;
                    for n in neighbors.into_iter() {
                        if !search_found[n] {
                            search_queue.push_back(n);
                            search_found[n] = true;
                        }
                    }
                }
            }
            current_cluster_id += 1;
        }
        Ok(self.model(cluster_memberships, is_core, current_cluster_id))
    }
}

impl<F: Float, D: Distance<F>> DbscanValidParams<F, D> {
    fn model(
        &self,
        labels: Array1<Option<usize>>,
        is_core: Vec<bool>,
        n_clusters: usize,
    ) -> DbscanModel<F> {
        DbscanModel {
            tolerance: self.tolerance,
            min_points: self.min_points,
            labels,
            core_sample_indices: is_core
                .into_iter()
                .enumerate()
                .filter_map(|(i, core)| if core { Some(i) } else { None })
                .collect(),
            n_clusters,
        }
    }

    /// Counts every point in the neighbourhood of `idx`, and returns the unlabelled ones
    fn find_neighbors(
        &self,
        nn: &dyn NearestNeighbourIndex<F>,
        idx: usize,
        observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
        clusters: &Array1<Option<usize>>,
    ) -> Result<(usize, Vec<usize>), DbscanError> {
        let candidate = observations.row(idx);
        let mut res = Vec::with_capacity(self.minimum_points());
        let mut count = 0;
        for (_, i) in nn.within_range(candidate.view(), self.tolerance())?.into_iter() {
            count += 1;
            if clusters[i].is_none() && i != idx {
                res.push(i);
            }
        }
        Ok((count, res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, s, Array2};

    fn labels(params: DbscanParams<f64, L2Dist>, data: &Array2<f64>) -> Array1<Option<usize>> {
        let model: DbscanModel<f64> = params.fit(data).unwrap();
        model.labels().clone()
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<DbscanModel<f64>>();
        has_autotraits::<DbscanParams<f64, L2Dist>>();
        has_autotraits::<DbscanValidParams<f64, L2Dist>>();
        has_autotraits::<DbscanError>();
    }

    #[test]
    fn nested_clusters() {
        // Create a circuit of points and then a cluster in the centre
        // and ensure they are identified as two separate clusters
        let mut data: Array2<f64> = Array2::zeros((50, 2));
        let rising = Array1::linspace(0.0, 8.0, 10);
        data.column_mut(0).slice_mut(s![0..10]).assign(&rising);
        data.column_mut(0).slice_mut(s![10..20]).assign(&rising);
        data.column_mut(1).slice_mut(s![20..30]).assign(&rising);
        data.column_mut(1).slice_mut(s![30..40]).assign(&rising);

        data.column_mut(1).slice_mut(s![0..10]).fill(0.0);
        data.column_mut(1).slice_mut(s![10..20]).fill(8.0);
        data.column_mut(0).slice_mut(s![20..30]).fill(0.0);
        data.column_mut(0).slice_mut(s![30..40]).fill(8.0);

        data.column_mut(0).slice_mut(s![40..]).fill(5.0);
        data.column_mut(1).slice_mut(s![40..]).fill(5.0);

        let labels = labels(Dbscan::params(2).tolerance(1.0), &data);

        assert!(labels.slice(s![..40]).iter().all(|x| x == &Some(0)));
        assert!(labels.slice(s![40..]).iter().all(|x| x == &Some(1)));
    }

    #[test]
    fn non_cluster_points() {
        let mut data: Array2<f64> = Array2::zeros((5, 2));
        data.row_mut(0).assign(&arr1(&[10.0, 10.0]));

        let model: DbscanModel<f64> = Dbscan::params(4).fit(&data).unwrap();

        let expected = arr1(&[None, Some(0), Some(0), Some(0), Some(0)]);
        assert_eq!(model.labels(), &expected);
        assert_eq!(model.n_noise(), 1);
        assert_eq!(model.core_sample_indices(), &[1, 2, 3, 4]);
    }

    #[test]
    fn border_points() {
        let data: Array2<f64> = arr2(&[
            // Outlier
            [0.0, 2.0],
            // Core point
            [0.0, 0.0],
            // Border points
            [0.0, 1.0],
            [0.0, -1.0],
            [-1.0, 0.0],
            [1.0, 0.0],
        ]);

        let model: DbscanModel<f64> = Dbscan::params(5).tolerance(1.1).fit(&data).unwrap();

        assert_eq!(model.labels()[0], None);
        for id in model.labels().slice(s![1..]).iter() {
            assert_eq!(id, &Some(0));
        }
        assert_eq!(model.core_sample_indices(), &[1]);
        assert_eq!(model.n_clusters(), 1);
    }

    #[test]
    fn neighbourhood_counts_the_point_itself() {
        // each point has exactly one other point within range
        let data = arr2(&[[0.0], [1.0], [10.0], [11.0]]);
        let labels = labels(Dbscan::params(2).tolerance(1.0), &data);
        assert_eq!(labels, arr1(&[Some(0), Some(0), Some(1), Some(1)]));
    }

    #[test]
    fn dataset_too_small() {
        let data: Array2<f64> = Array2::zeros((3, 2));

        let labels = labels(Dbscan::params(4), &data);
        assert!(labels.iter().all(|x| x.is_none()));
    }

    #[test]
    fn empty_dataset() {
        let data: Array2<f64> = Array2::zeros((0, 2));
        let model: DbscanModel<f64> = Dbscan::params(2).fit(&data).unwrap();
        assert_eq!(model.n_clusters(), 0);
        assert!(model.labels().is_empty());
    }

    #[test]
    fn non_finite_records_are_rejected() {
        let data = arr2(&[[0.0], [f64::NAN]]);
        let res: Result<DbscanModel<f64>, DbscanError> = Dbscan::params(2).fit(&data);
        assert!(matches!(res, Err(DbscanError::Index(_))));
    }

    #[test]
    fn invalid_params_are_reported() {
        let data = arr2(&[[0.0], [1.0]]);
        let res: Result<DbscanModel<f64>, DbscanError> =
            Dbscan::params(2).tolerance(-1.0).fit(&data);
        assert!(matches!(res, Err(DbscanError::InvalidParams(_))));
    }
}
