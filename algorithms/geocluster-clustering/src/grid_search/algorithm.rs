use geocluster::traits::Fit;
use geocluster::Float;
use geocluster_nn::distance::{Distance, L2Dist};
use geocluster_nn::{LinearSearch, NearestNeighbourIndex};
use geocluster_preprocessing::LinearScaler;
use ndarray::{Array2, ArrayBase, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::hyperparams::{DbscanGridSearchParams, DbscanGridSearchValidParams, GridSearchError};
use super::selection::{round_to, GridCandidate, MetricSummary, SelectionPolicy};
use crate::{Dbscan, DbscanError, DbscanModel};

/// Chooses a single pair of DBSCAN hyperparameters `(eps, min_samples)` for a sequence of
/// days, typically the days of a quarter.
///
/// Every day is standardised on its own, then clustered with every pair of the grid. For each
/// pair three daily metrics are collected and summarised over the days:
/// * the mean distance between noise points and their nearest neighbours, rounded to three
///   decimals, undefined on days without noise;
/// * the number of clusters;
/// * the number of noise points.
///
/// The pair is then picked by the [`SelectionPolicy`]. The search never fails on data: days
/// that cannot be standardised are skipped and, when no pair qualifies, the fallback pair is
/// returned.
///
/// ```
/// use geocluster::traits::Fit;
/// use geocluster_clustering::{DbscanGridSearch, GridSearchError};
/// use ndarray::array;
///
/// let day = array![[0.], [0.1], [0.2], [5.], [5.1], [5.2], [10.], [10.1], [10.2]];
/// let outcome = DbscanGridSearch::params()
///     .points_per_day(9)
///     .fit(&vec![day.clone(), day])
///     .map_err(|e: GridSearchError| e)
///     .unwrap();
/// assert_eq!(outcome.candidates().len(), 19 * 4);
/// assert!(!outcome.used_fallback());
/// ```
pub struct DbscanGridSearch;

impl DbscanGridSearch {
    pub fn params<F: Float>() -> DbscanGridSearchParams<F> {
        DbscanGridSearchParams::new()
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Result of the [DBSCAN grid search](DbscanGridSearch)
pub struct GridSearchOutcome<F> {
    eps: F,
    min_samples: usize,
    used_fallback: bool,
    n_days: usize,
    candidates: Vec<GridCandidate<F>>,
}

impl<F: Float> GridSearchOutcome<F> {
    /// Selected `eps`
    pub fn eps(&self) -> F {
        self.eps
    }

    /// Selected `min_samples`
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Whether the fallback pair was returned
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// Days that took part in the search
    pub fn n_days(&self) -> usize {
        self.n_days
    }

    /// Statistics of every evaluated pair, in grid order (`eps` major)
    pub fn candidates(&self) -> &[GridCandidate<F>] {
        &self.candidates
    }
}

/// A standardised day with the distances from every point to its nearest neighbours
struct PreparedDay<F> {
    scaled: Array2<F>,
    neighbour_dists: Vec<Vec<F>>,
}

struct DayMetrics<F> {
    noise_distance: Option<F>,
    n_clusters: usize,
    n_noise: usize,
}

impl<F: Float> DbscanGridSearchValidParams<F> {
    fn prepare_day(&self, records: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Option<PreparedDay<F>> {
        let scaled = LinearScaler::standard().fit_transform(records).ok()?;
        let index = LinearSearch::new().from_batch(&scaled, L2Dist).ok()?;
        let k = self.n_neighbors.min(scaled.nrows());
        let mut neighbour_dists = Vec::with_capacity(scaled.nrows());
        for point in scaled.rows() {
            let nearest = index.k_nearest(point, k).ok()?;
            // the closest neighbour of a point is itself
            neighbour_dists.push(
                nearest
                    .iter()
                    .skip(1)
                    .map(|(other, _)| L2Dist.distance(point, other.view()))
                    .collect(),
            );
        }
        Some(PreparedDay {
            scaled,
            neighbour_dists,
        })
    }

    fn day_metrics(&self, day: &PreparedDay<F>, eps: F, min_samples: usize) -> Option<DayMetrics<F>> {
        let params = Dbscan::params(min_samples).tolerance(eps);
        let model: DbscanModel<F> = Fit::<_, DbscanError>::fit(&params, &day.scaled).ok()?;

        let noise_dists: Vec<F> = model
            .labels()
            .iter()
            .zip(day.neighbour_dists.iter())
            .filter(|(label, _)| label.is_none())
            .flat_map(|(_, dists)| dists.iter().copied())
            .collect();
        let noise_distance = if noise_dists.is_empty() {
            None
        } else {
            let mean = noise_dists.iter().copied().sum::<F>() / F::cast(noise_dists.len());
            Some(round_to(mean, 3))
        };
        Some(DayMetrics {
            noise_distance,
            n_clusters: model.n_clusters(),
            n_noise: model.n_noise(),
        })
    }

    fn evaluate(&self, days: &[PreparedDay<F>], eps: F, min_samples: usize) -> GridCandidate<F> {
        let metrics: Vec<DayMetrics<F>> = days
            .iter()
            .filter_map(|day| self.day_metrics(day, eps, min_samples))
            .collect();
        GridCandidate {
            eps,
            min_samples,
            noise_distance: MetricSummary::from_values(
                metrics.iter().filter_map(|m| m.noise_distance),
            ),
            n_clusters: MetricSummary::from_values(metrics.iter().map(|m| F::cast(m.n_clusters))),
            n_noise: MetricSummary::from_values(metrics.iter().map(|m| F::cast(m.n_noise))),
        }
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<Vec<ArrayBase<D, Ix2>>, GridSearchError>
    for DbscanGridSearchValidParams<F>
{
    type Object = GridSearchOutcome<F>;

    /// `days` holds one matrix per day, one row per point and one column per feature.
    fn fit(&self, days: &Vec<ArrayBase<D, Ix2>>) -> Result<Self::Object, GridSearchError> {
        let prepared: Vec<PreparedDay<F>> = days
            .iter()
            .filter_map(|day| self.prepare_day(day))
            .collect();

        let mut candidates =
            Vec::with_capacity(self.eps_grid.len() * self.min_samples_grid.len());
        for &eps in self.eps_grid.iter() {
            for &min_samples in self.min_samples_grid.iter() {
                candidates.push(self.evaluate(&prepared, eps, min_samples));
            }
        }

        let policy = SelectionPolicy::new(self.max_noise_points());
        let (eps, min_samples, used_fallback) = match policy.select(&candidates) {
            Some(best) => (best.eps, best.min_samples, false),
            None => (self.fallback.0, self.fallback.1, true),
        };
        Ok(GridSearchOutcome {
            eps,
            min_samples,
            used_fallback,
            n_days: prepared.len(),
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geocluster_datasets::generate_blobs;
    use ndarray::{array, Array2};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn search(
        params: DbscanGridSearchParams<f64>,
        days: Vec<Array2<f64>>,
    ) -> GridSearchOutcome<f64> {
        Fit::<_, GridSearchError>::fit(&params, &days).unwrap()
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<GridSearchOutcome<f64>>();
        has_autotraits::<DbscanGridSearchParams<f64>>();
        has_autotraits::<GridSearchError>();
    }

    #[test]
    fn no_days_fall_back() {
        let outcome = search(DbscanGridSearch::params(), vec![]);
        assert!(outcome.used_fallback());
        assert_abs_diff_eq!(outcome.eps(), 1.4);
        assert_eq!(outcome.min_samples(), 2);
        assert_eq!(outcome.n_days(), 0);
        assert!(outcome.candidates().iter().all(|c| c.n_noise.is_none()));
    }

    #[test]
    fn empty_grid_falls_back() {
        let day = array![[0.], [1.], [2.]];
        let outcome = search(
            DbscanGridSearch::params().eps_grid(vec![]).fallback(0.7, 3),
            vec![day],
        );
        assert!(outcome.candidates().is_empty());
        assert_eq!((outcome.eps(), outcome.min_samples()), (0.7, 3));
    }

    #[test]
    fn all_noise_falls_back() {
        // far apart points are noise for every pair, far above the allowed share
        let day = array![[0.], [100.], [200.], [300.], [400.]];
        let outcome = search(
            DbscanGridSearch::params()
                .points_per_day(5)
                .eps_grid(vec![0.1, 0.2]),
            vec![day],
        );
        assert!(outcome.used_fallback());
        assert_eq!(outcome.candidates().len(), 8);
        let first = &outcome.candidates()[0];
        assert_abs_diff_eq!(first.n_noise.unwrap().max, 5.);
        assert!(first.noise_distance.is_some());
    }

    #[test]
    fn metrics_of_a_single_day() {
        // three tight groups of three points
        let day = array![
            [0., 0.],
            [0., 0.1],
            [0.1, 0.],
            [10., 10.],
            [10., 10.1],
            [10.1, 10.],
            [20., 0.],
            [20., 0.1],
            [20.1, 0.]
        ];
        let outcome = search(
            DbscanGridSearch::params()
                .points_per_day(9)
                .eps_grid(vec![0.1, 1.0])
                .min_samples_range(2, 3),
            vec![day],
        );
        let candidates = outcome.candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(
            candidates
                .iter()
                .map(|c| (c.eps, c.min_samples))
                .collect::<Vec<_>>(),
            vec![(0.1, 2), (0.1, 3), (1.0, 2), (1.0, 3)]
        );
        let wide = &candidates[3];
        assert_abs_diff_eq!(wide.n_clusters.unwrap().min, 3.);
        assert_abs_diff_eq!(wide.n_noise.unwrap().max, 0.);
        assert!(wide.noise_distance.is_none());
        // three clusters and no noise: the first pair of the grid reaching them wins
        assert!(!outcome.used_fallback());
        assert_abs_diff_eq!(outcome.eps(), 0.1);
    }

    #[test]
    fn summaries_span_days() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let centers = array![[0., 0.], [30., 0.], [0., 30.], [30., 30.]];
        let days: Vec<Array2<f64>> = (0..3)
            .map(|_| generate_blobs(20, &centers, &mut rng))
            .collect();
        let outcome = search(
            DbscanGridSearch::params().points_per_day(80),
            days,
        );
        assert_eq!(outcome.n_days(), 3);
        assert!(!outcome.used_fallback());
        let chosen = outcome
            .candidates()
            .iter()
            .find(|c| c.eps == outcome.eps() && c.min_samples == outcome.min_samples())
            .unwrap();
        let n_clusters = chosen.n_clusters.unwrap();
        assert!(n_clusters.min > 2.);
        assert!(n_clusters.min <= n_clusters.mean && n_clusters.mean <= n_clusters.max);
        assert!(chosen.n_noise.unwrap().max <= 0.33 * 80.);
    }

    #[test]
    fn search_is_deterministic() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        let days: Vec<Array2<f64>> = (0..2)
            .map(|_| generate_blobs(15, &array![[0., 0.], [8., 8.], [-8., 8.]], &mut rng))
            .collect();
        let one = search(DbscanGridSearch::params(), days.clone());
        let two = search(DbscanGridSearch::params(), days);
        assert_eq!(one, two);
    }
}
