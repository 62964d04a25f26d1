use geocluster::Float;
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView2, Data, DataMut, Ix1, Ix2, Zip};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::algorithm::closest_centroid;

/// Selects centroids using the KMeans++ initialization algorithm. `observations` must hold at
/// least `n_clusters` rows. A point is picked with a probability growing with its squared
/// distance to the centroids already selected.
pub(crate) fn k_means_pp<F: Float>(
    n_clusters: usize,
    observations: ArrayView2<F>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let (n_samples, n_features) = observations.dim();
    let mut centroids = Array2::zeros((n_clusters, n_features));
    let n = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&observations.row(n));

    let mut dists = Array1::zeros(n_samples);
    for c_cnt in 1..n_clusters {
        update_min_dists(&centroids.slice(s![0..c_cnt, ..]), &observations, &mut dists);
        // every point already coincides with a centroid when all weights vanish
        let centroid_idx = match WeightedIndex::new(dists.iter()) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..n_samples),
        };
        centroids
            .row_mut(c_cnt)
            .assign(&observations.row(centroid_idx));
    }
    centroids
}

fn update_min_dists<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.rows())
        .and(dists)
        .for_each(|observation, dist| *dist = closest_centroid(centroids, &observation).1);
}
