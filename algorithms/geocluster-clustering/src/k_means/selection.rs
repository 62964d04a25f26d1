//! Choice of the number of clusters of K-Means by silhouette analysis
use crate::utils::count_distinct_rows;
use crate::{KMeans, KMeansError, KMeansParamsError};
use geocluster::metrics::ClusterQuality;
use geocluster::param_guard::ParamGuard;
use geocluster::traits::{Fit, Predict};
use geocluster::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters of the [K selection](KSelection).
pub struct KSelectionValidParams<F: Float, R: Rng> {
    min_clusters: usize,
    max_clusters: usize,
    n_runs: usize,
    tolerance: F,
    max_n_iterations: u64,
    rng: R,
}

#[derive(Clone, Debug, PartialEq)]
/// Builder of [valid K selection hyperparameters](KSelectionValidParams).
pub struct KSelectionParams<F: Float, R: Rng>(KSelectionValidParams<F, R>);

impl<F: Float, R: Rng> KSelectionParams<F, R> {
    /// Searches `k` in `2..=15`, every candidate model is fitted like [`KMeans::params`] does.
    pub fn new(rng: R) -> Self {
        Self(KSelectionValidParams {
            min_clusters: 2,
            max_clusters: 15,
            n_runs: 10,
            tolerance: F::cast(1e-4),
            max_n_iterations: 300,
            rng,
        })
    }

    /// Inclusive range of the number of clusters to try
    pub fn cluster_range(mut self, min_clusters: usize, max_clusters: usize) -> Self {
        self.0.min_clusters = min_clusters;
        self.0.max_clusters = max_clusters;
        self
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

impl<F: Float, R: Rng> ParamGuard for KSelectionParams<F, R> {
    type Checked = KSelectionValidParams<F, R>;
    type Error = KMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.min_clusters < 2 || p.max_clusters < p.min_clusters {
            Err(KMeansParamsError::ClusterRange(p.min_clusters, p.max_clusters))
        } else if p.n_runs == 0 {
            Err(KMeansParamsError::NRuns)
        } else if p.tolerance <= F::zero() {
            Err(KMeansParamsError::Tolerance)
        } else if p.max_n_iterations == 0 {
            Err(KMeansParamsError::MaxIterations)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> KSelectionValidParams<F, R> {
    pub fn min_clusters(&self) -> usize {
        self.min_clusters
    }

    pub fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    /// Largest `k` worth trying on `n_samples` records holding `n_distinct` different points
    fn effective_max(&self, n_samples: usize, n_distinct: usize) -> usize {
        self.max_clusters
            .min(n_distinct)
            .min(n_samples.saturating_sub(1))
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Scores of the K-Means model fitted with `n_clusters` clusters
pub struct KScore<F> {
    pub n_clusters: usize,
    pub silhouette: F,
    pub calinski_harabasz: F,
    pub davies_bouldin: F,
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Fits K-Means for every number of clusters of a range and keeps the model with the highest
/// mean silhouette coefficient, the smallest `k` winning ties. The other two scores are kept
/// as diagnostics.
///
/// The upper end of the range is lowered to the number of distinct points and to
/// `n_samples - 1`, the silhouette being undefined beyond. Records holding fewer than two
/// distinct points cannot be clustered.
///
/// ```
/// use geocluster::traits::Fit;
/// use geocluster_clustering::{KMeansError, KSelection};
/// use ndarray::array;
///
/// let records = array![[0., 0.], [0., 0.1], [5., 5.], [5., 5.1], [10., 0.], [10., 0.1]];
/// let selection = KSelection::params()
///     .fit(&records)
///     .map_err(|e: KMeansError| e)
///     .unwrap();
/// assert_eq!(selection.n_clusters(), 3);
/// assert_eq!(selection.scores().len(), 4);
/// ```
pub struct KSelection<F: Float> {
    model: KMeans<F>,
    labels: Array1<usize>,
    scores: Vec<KScore<F>>,
}

impl<F: Float> KSelection<F> {
    /// Hyperparameters with a random generator seeded with 0
    pub fn params() -> KSelectionParams<F, Xoshiro256Plus> {
        KSelectionParams::new(Xoshiro256Plus::seed_from_u64(0))
    }

    pub fn params_with_rng<R: Rng>(rng: R) -> KSelectionParams<F, R> {
        KSelectionParams::new(rng)
    }

    /// Model with the highest silhouette
    pub fn model(&self) -> &KMeans<F> {
        &self.model
    }

    pub fn n_clusters(&self) -> usize {
        self.model.n_clusters()
    }

    /// Cluster of every fitted record under the chosen model
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// One entry per scored `k`, ascending
    pub fn scores(&self) -> &[KScore<F>] {
        &self.scores
    }

    pub fn into_model(self) -> KMeans<F> {
        self.model
    }
}

impl<F: Float, R: Rng + Clone, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, KMeansError>
    for KSelectionValidParams<F, R>
{
    type Object = KSelection<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object, KMeansError> {
        let n_distinct = count_distinct_rows(records);
        if n_distinct < 2 {
            return Err(KMeansError::TooFewDistinctPoints(n_distinct));
        }
        let max_clusters = self.effective_max(records.nrows(), n_distinct);
        if max_clusters < self.min_clusters {
            return Err(KMeansError::TooFewSamples(records.nrows(), self.min_clusters));
        }

        let mut scores = Vec::with_capacity(max_clusters - self.min_clusters + 1);
        let mut best: Option<(F, KMeans<F>, Array1<usize>)> = None;
        for k in self.min_clusters..=max_clusters {
            let params = KMeans::params_with_rng(k, self.rng.clone())
                .n_runs(self.n_runs)
                .tolerance(self.tolerance)
                .max_n_iterations(self.max_n_iterations);
            let model: KMeans<F> = Fit::<_, KMeansError>::fit(&params, records)?;
            let labels = model.predict(records);
            // a model whose clusters collapsed below two labels has no score
            let silhouette = match records.silhouette_score(&labels) {
                Ok(score) => score,
                Err(_) => continue,
            };
            scores.push(KScore {
                n_clusters: k,
                silhouette,
                calinski_harabasz: records.calinski_harabasz_score(&labels)?,
                davies_bouldin: records.davies_bouldin_score(&labels)?,
            });
            let improves = match &best {
                Some((score, _, _)) => silhouette > *score,
                None => true,
            };
            if improves {
                best = Some((silhouette, model, labels));
            }
        }

        match best {
            Some((_, model, labels)) => Ok(KSelection {
                model,
                labels,
                scores,
            }),
            None => Err(KMeansError::NoScoredClustering(
                self.min_clusters,
                max_clusters,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geocluster_datasets::generate_blobs;
    use ndarray::{array, Array2};

    fn select(
        params: KSelectionParams<f64, Xoshiro256Plus>,
        records: &Array2<f64>,
    ) -> Result<KSelection<f64>, KMeansError> {
        params.fit(records)
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<KSelection<f64>>();
        has_autotraits::<KSelectionParams<f64, Xoshiro256Plus>>();
    }

    #[test]
    fn finds_the_number_of_blobs() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let centers = array![[0., 0.], [20., 20.], [-20., 20.], [0., 40.]];
        let records = generate_blobs(40, &centers, &mut rng);
        let selection = select(KSelection::params().cluster_range(2, 8), &records).unwrap();

        assert_eq!(selection.n_clusters(), 4);
        assert_eq!(selection.labels().len(), 160);
        let ks: Vec<usize> = selection.scores().iter().map(|s| s.n_clusters).collect();
        assert_eq!(ks, (2..=8).collect::<Vec<_>>());
        let best = &selection.scores()[2];
        assert!(selection
            .scores()
            .iter()
            .all(|s| s.silhouette <= best.silhouette));
        assert!(best.calinski_harabasz > 0.);
    }

    #[test]
    fn range_is_capped_by_distinct_points() {
        let records = array![[0.], [0.], [1.], [1.], [1.]];
        let selection = select(KSelection::params(), &records).unwrap();
        assert_eq!(selection.n_clusters(), 2);
        assert_eq!(selection.scores().len(), 1);
        assert_abs_diff_eq!(selection.scores()[0].silhouette, 1.);
        assert_eq!(selection.labels()[0], selection.labels()[1]);
        assert_ne!(selection.labels()[0], selection.labels()[2]);
    }

    #[test]
    fn identical_points_cannot_be_clustered() {
        let records = Array2::from_elem((6, 2), 3.5);
        assert_eq!(
            select(KSelection::params(), &records).unwrap_err(),
            KMeansError::TooFewDistinctPoints(1)
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let mut rng = Xoshiro256Plus::seed_from_u64(9);
        let records = generate_blobs(25, &array![[0., 0.], [3., 3.], [6., 0.]], &mut rng);
        let one = select(KSelection::params(), &records).unwrap();
        let two = select(KSelection::params(), &records).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn capped_iterations_do_not_fail_the_selection() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let centers = array![[0., 0.], [30., 0.], [15., 30.]];
        let records = generate_blobs(40, &centers, &mut rng);
        for max_n_iterations in [1, 2, 10].iter() {
            let selection = select(
                KSelection::params()
                    .cluster_range(2, 5)
                    .max_n_iterations(*max_n_iterations),
                &records,
            )
            .unwrap();
            assert_eq!(selection.labels().len(), 120);
            assert_eq!(selection.scores().len(), 4);
        }
    }

    #[test]
    fn invalid_range() {
        let res = KSelection::<f64>::params().cluster_range(1, 4).check();
        assert_eq!(res.unwrap_err(), KMeansParamsError::ClusterRange(1, 4));
        let res = KSelection::<f64>::params().cluster_range(5, 4).check();
        assert_eq!(res.unwrap_err(), KMeansParamsError::ClusterRange(5, 4));
    }
}
