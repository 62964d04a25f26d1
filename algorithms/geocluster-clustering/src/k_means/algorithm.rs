use crate::k_means::init::k_means_pp;
use crate::k_means::{KMeansParams, KMeansValidParams};
use crate::KMeansError;
use geocluster::traits::{Fit, Predict};
use geocluster::Float;
use geocluster_nn::distance::{Distance, L2Dist};
use ndarray::{Array1, Array2, ArrayBase, Data, DataMut, Ix1, Ix2, Zip};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// K-means clustering aims to partition a set of unlabeled observations into clusters,
/// where each observation belongs to the cluster with the nearest mean.
///
/// The mean of the points within a cluster is called *centroid*.
///
/// Given the set of centroids, you can assign an observation to a cluster
/// choosing the nearest centroid.
///
/// We provide a modified version of the _standard algorithm_ (also known as Lloyd's Algorithm),
/// called m_k-means, which uses a slightly modified update step to avoid problems with empty
/// clusters.
///
/// More details on the algorithm can be found in the next section or
/// [here](https://en.wikipedia.org/wiki/K-means_clustering). Details on m_k-means can be found
/// [here](https://www.researchgate.net/publication/228414762_A_Modified_k-means_Algorithm_to_Avoid_Empty_Clusters).
///
/// ## Standard algorithm
///
/// K-means is an iterative algorithm: it progressively refines the choice of centroids.
///
/// It's guaranteed to converge, even though it might not find the optimal set of centroids
/// (unfortunately it can get stuck in a local minimum, finding the optimal minimum if NP-hard!).
///
/// There are three steps in the standard algorithm:
/// - initialisation step: select initial centroids using one of our provided algorithms.
/// - assignment step: assign each observation to the nearest cluster
///                    (minimum distance between the observation and the cluster's centroid);
/// - update step: recompute the centroid of each cluster.
///
/// The initialisation step is a one-off, done at the very beginning.
/// Assignment and update are repeated in a loop until convergence is reached (either the
/// squared distance between the old and the new clusters is below `tolerance` or
/// we exceed the `max_n_iterations`).
///
/// The random generator is cloned at the start of every fit, so fitting the same records
/// with the same hyperparameters always returns the same centroids.
///
/// ## Tutorial
///
/// ```
/// use geocluster::traits::{Fit, Predict};
/// use geocluster_clustering::{KMeans, KMeansError};
/// use geocluster_datasets::generate_blobs;
/// use ndarray::{Axis, array};
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256Plus;
/// use approx::assert_abs_diff_eq;
///
/// // Our random number generator, seeded for reproducibility
/// let mut rng = Xoshiro256Plus::seed_from_u64(42);
///
/// // three blobs of 100 observations centered around `expected_centroids`
/// let expected_centroids = array![[0., 1.], [-10., 20.], [-1., 10.]];
/// let observations = generate_blobs(100, &expected_centroids, &mut rng);
/// let n_clusters = expected_centroids.len_of(Axis(0));
///
/// // `n_clusters` is the only mandatory parameter.
/// let model = KMeans::params_with_rng(n_clusters, rng.clone())
///     .tolerance(1e-2)
///     .fit(&observations)
///     .map_err(|e: KMeansError| e)
///     .expect("KMeans fitted");
///
/// // Predict returns the **index** of the nearest cluster
/// let memberships = model.predict(&array![[-9., 20.5]]);
/// let closest_centroid = &model.centroids().index_axis(Axis(0), memberships[0]);
/// assert_abs_diff_eq!(closest_centroid.to_owned(), &array![-10., 20.], epsilon = 1e-1);
/// ```
pub struct KMeans<F: Float> {
    centroids: Array2<F>,
    cluster_count: Array1<F>,
    inertia: F,
}

impl<F: Float> KMeans<F> {
    /// Hyperparameters with a random generator seeded with 42
    pub fn params(nclusters: usize) -> KMeansParams<F, Xoshiro256Plus> {
        KMeansParams::new(nclusters, Xoshiro256Plus::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(nclusters: usize, rng: R) -> KMeansParams<F, R> {
        KMeansParams::new(nclusters, rng)
    }

    /// Return the set of centroids as a 2-dimensional matrix with shape
    /// `(n_centroids, n_features)`.
    pub fn centroids(&self) -> &Array2<F> {
        &self.centroids
    }

    /// Return the number of training points belonging to each cluster
    pub fn cluster_count(&self) -> &Array1<F> {
        &self.cluster_count
    }

    /// Return the sum of squared distances between each training point and its closest centroid,
    /// averaged across all training points.
    pub fn inertia(&self) -> F {
        self.inertia
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }
}

impl<F: Float, R: Rng + Clone, DA: Data<Elem = F>> Fit<ArrayBase<DA, Ix2>, KMeansError>
    for KMeansValidParams<F, R>
{
    type Object = KMeans<F>;

    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `fit` identifies `n_clusters` centroids based on the training data distribution.
    ///
    /// An instance of `KMeans` is returned.
    ///
    fn fit(&self, observations: &ArrayBase<DA, Ix2>) -> Result<Self::Object, KMeansError> {
        let mut rng = self.rng().clone();
        let observations = observations.view();
        let n_samples = observations.nrows();
        if n_samples < self.n_clusters() {
            return Err(KMeansError::TooFewSamples(n_samples, self.n_clusters()));
        }

        let mut min_inertia = F::infinity();
        let mut best: Option<(Array2<F>, Array1<usize>)> = None;
        let mut memberships = Array1::zeros(n_samples);
        let mut dists = Array1::zeros(n_samples);

        for _ in 0..self.n_runs() {
            let mut inertia = min_inertia;
            let mut centroids = k_means_pp(self.n_clusters(), observations, &mut rng);
            // a run stopped by `max_n_iterations` keeps its last centroids
            for _ in 0..self.max_n_iterations() {
                update_memberships_and_dists(&centroids, &observations, &mut memberships, &mut dists);
                let new_centroids = compute_centroids(&centroids, &observations, &memberships);
                inertia = dists.sum();
                let distance = (&centroids - &new_centroids).mapv(|x| x * x).sum();
                centroids = new_centroids;
                if distance < self.tolerance() {
                    break;
                }
            }

            // the run with the lowest inertia, the sum of squared distances of every
            // observation to its closest centroid, wins
            if inertia < min_inertia {
                min_inertia = inertia;
                best = Some((centroids, memberships.clone()));
            }
        }

        match best {
            Some((centroids, memberships)) => {
                let mut cluster_count = Array1::zeros(self.n_clusters());
                memberships
                    .iter()
                    .for_each(|&c| cluster_count[c] += F::one());
                Ok(KMeans {
                    centroids,
                    cluster_count,
                    inertia: min_inertia / F::cast(n_samples),
                })
            }
            None => Err(KMeansError::InertiaError),
        }
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix2>, Array1<usize>> for KMeans<F> {
    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `predict` returns, for each observation, the index of the closest cluster/centroid.
    ///
    /// You can retrieve the centroid associated to an index using the
    /// [`centroids` method](#method.centroids).
    fn predict(&self, observations: &ArrayBase<DA, Ix2>) -> Array1<usize> {
        let mut memberships = Array1::zeros(observations.nrows());
        update_cluster_memberships(&self.centroids, observations, &mut memberships);
        memberships
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix1>, usize> for KMeans<F> {
    /// Given one input observation, return the index of its closest cluster
    fn predict(&self, observation: &ArrayBase<DA, Ix1>) -> usize {
        closest_centroid(&self.centroids, observation).0
    }
}

/// K-means is an iterative algorithm.
/// We will perform the assignment and update steps until we are satisfied
/// (according to our convergence criteria).
///
/// `compute_centroids` returns a 2-dimensional array,
/// where the i-th row corresponds to the i-th cluster.
fn compute_centroids<F: Float>(
    old_centroids: &Array2<F>,
    // (n_observations, n_features)
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_observations,)
    cluster_memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Array2<F> {
    let n_clusters = old_centroids.nrows();
    let mut counts: Array1<usize> = Array1::ones(n_clusters);
    let mut centroids = Array2::zeros((n_clusters, observations.ncols()));

    Zip::from(observations.rows())
        .and(cluster_memberships)
        .for_each(|observation, &cluster_membership| {
            let mut centroid = centroids.row_mut(cluster_membership);
            centroid += &observation;
            counts[cluster_membership] += 1;
        });
    // m_k-means: Treat the old centroid like another point in the cluster
    centroids += old_centroids;

    Zip::from(centroids.rows_mut())
        .and(&counts)
        .for_each(|mut centroid, &cnt| centroid /= F::cast(cnt));
    centroids
}

// Update `cluster_memberships` with the index of the cluster each observation belongs to.
pub(crate) fn update_cluster_memberships<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    cluster_memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
) {
    Zip::from(observations.rows())
        .and(cluster_memberships)
        .for_each(|observation, cluster_membership| {
            *cluster_membership = closest_centroid(centroids, &observation).0
        });
}

// Efficient combination of `update_cluster_memberships` and the closest squared distances.
fn update_memberships_and_dists<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    cluster_memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.rows())
        .and(cluster_memberships)
        .and(dists)
        .for_each(|observation, cluster_membership, dist| {
            let (m, d) = closest_centroid(centroids, &observation);
            *cluster_membership = m;
            *dist = d;
        });
}

/// Given a matrix of centroids with shape (n_centroids, n_features) and an observation,
/// return the index of the closest centroid (the index of the corresponding row in `centroids`)
/// and the squared distance to it. Ties go to the lowest index.
pub(crate) fn closest_centroid<F: Float>(
    // (n_centroids, n_features)
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_features)
    observation: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> (usize, F) {
    let first_centroid = centroids.row(0);
    let (mut closest_index, mut minimum_distance) =
        (0, L2Dist.rdistance(first_centroid.view(), observation.view()));

    for (centroid_index, centroid) in centroids.rows().into_iter().enumerate().skip(1) {
        let distance = L2Dist.rdistance(centroid.view(), observation.view());
        if distance < minimum_distance {
            closest_index = centroid_index;
            minimum_distance = distance;
        }
    }
    (closest_index, minimum_distance)
}
