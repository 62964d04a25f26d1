use std::cmp::Ordering;

use geocluster::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Rounds `x` to `decimals` decimal places, halves away from zero
pub(crate) fn round_to<F: Float>(x: F, decimals: i32) -> F {
    let factor = F::cast(10f64.powi(decimals));
    (x * factor).round() / factor
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
/// Mean, maximum and minimum of a daily metric over a quarter. The mean is rounded to two
/// decimals.
pub struct MetricSummary<F> {
    pub mean: F,
    pub max: F,
    pub min: F,
}

impl<F: Float> MetricSummary<F> {
    /// Summarises the defined values, `None` when there is none
    pub fn from_values(values: impl IntoIterator<Item = F>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = F::zero();
        let mut max = F::neg_infinity();
        let mut min = F::infinity();
        for v in values {
            count += 1;
            sum += v;
            if v > max {
                max = v;
            }
            if v < min {
                min = v;
            }
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            mean: round_to(sum / F::cast(count), 2),
            max,
            min,
        })
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Quarter statistics of one `(eps, min_samples)` pair of the grid
pub struct GridCandidate<F> {
    pub eps: F,
    pub min_samples: usize,
    /// Mean distance of noise points to their nearest neighbours, over the days that had noise
    pub noise_distance: Option<MetricSummary<F>>,
    pub n_clusters: Option<MetricSummary<F>>,
    pub n_noise: Option<MetricSummary<F>>,
}

/// Rules picking a single candidate of the grid:
///
/// 1. candidates whose worst day has more noise points than `max_noise_points` are dropped;
/// 2. when more than one remains, candidates whose poorest day has two clusters or fewer are
///    dropped;
/// 3. when more than one remains, the candidate with the lowest mean noise distance wins.
///    Candidates without noise distance come last and ties keep grid order.
///
/// A single candidate left after a rule is selected right away, none left means no selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionPolicy<F> {
    pub max_noise_points: F,
}

impl<F: Float> SelectionPolicy<F> {
    pub fn new(max_noise_points: F) -> Self {
        Self { max_noise_points }
    }

    pub fn select<'a>(&self, candidates: &'a [GridCandidate<F>]) -> Option<&'a GridCandidate<F>> {
        let quiet: Vec<&GridCandidate<F>> = candidates
            .iter()
            .filter(|c| matches!(c.n_noise, Some(s) if s.max <= self.max_noise_points))
            .collect();
        if quiet.len() <= 1 {
            return quiet.into_iter().next();
        }

        let clustered: Vec<&GridCandidate<F>> = quiet
            .into_iter()
            .filter(|c| matches!(c.n_clusters, Some(s) if s.min > F::cast(2)))
            .collect();
        if clustered.len() <= 1 {
            return clustered.into_iter().next();
        }

        clustered.into_iter().min_by(|a, b| {
            let a = a.noise_distance.map(|s| s.mean);
            let b = b.noise_distance.map(|s| s.mean);
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
    }
}
