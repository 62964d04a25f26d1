//! Common metrics for clustering
use crate::error::{Error, Result};
use crate::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2, Zip};
use std::collections::BTreeMap;

/// Evaluates the quality of a clustering of the records `self` given one cluster
/// label per record, using euclidean distance.
///
/// All three scores follow the usual conventions: labels do not need to be contiguous,
/// and at least two distinct labels but fewer labels than records are required.
pub trait ClusterQuality<F> {
    /// Mean silhouette coefficient over all samples.
    ///
    /// The silhouette of a sample is the relative difference between the average distance
    /// of the sample to other samples in the same cluster, `a`, and the minimum average
    /// distance of the sample to samples of another cluster, `b`: `(b - a) / max(a, b)`.
    /// It goes from -1 to +1 when the point is respectively closer (in average) to points
    /// in another cluster and to points in its own cluster. Samples alone in their cluster
    /// score zero.
    fn silhouette_score(&self, labels: &ArrayBase<impl Data<Elem = usize>, Ix1>) -> Result<F>;

    /// Ratio between the between-cluster dispersion and the within-cluster dispersion,
    /// each normalised by its degrees of freedom. Higher is better.
    fn calinski_harabasz_score(
        &self,
        labels: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    ) -> Result<F>;

    /// Average, over clusters, of the worst ratio between the summed intra-cluster spreads
    /// and the distance between centroids. Lower is better, zero is the minimum.
    fn davies_bouldin_score(&self, labels: &ArrayBase<impl Data<Elem = usize>, Ix1>)
        -> Result<F>;
}

/// Groups sample indices by label, in ascending label order
fn group_by_label(labels: &ArrayBase<impl Data<Elem = usize>, Ix1>) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }
    groups
}

fn check_labels<F: Float>(
    records: &ArrayBase<impl Data<Elem = F>, Ix2>,
    labels: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Result<BTreeMap<usize, Vec<usize>>> {
    let n_samples = records.nrows();
    if labels.len() != n_samples {
        return Err(Error::MismatchedLabels(labels.len(), n_samples));
    }
    let groups = group_by_label(labels);
    if groups.len() < 2 || groups.len() >= n_samples {
        return Err(Error::InvalidClusterCount(
            groups.len(),
            n_samples.saturating_sub(1),
        ));
    }
    Ok(groups)
}

fn euclidean<F: Float>(a: ArrayView1<F>, b: ArrayView1<F>) -> F {
    Zip::from(&a)
        .and(&b)
        .fold(F::zero(), |acc, &x, &y| acc + (x - y) * (x - y))
        .sqrt()
}

/// Centroid of every group, rows in the iteration order of `groups`
fn centroids<F: Float>(
    records: &ArrayBase<impl Data<Elem = F>, Ix2>,
    groups: &BTreeMap<usize, Vec<usize>>,
) -> Array2<F> {
    let mut centroids = Array2::zeros((groups.len(), records.ncols()));
    for (mut centroid, members) in centroids.rows_mut().into_iter().zip(groups.values()) {
        for &idx in members {
            centroid += &records.row(idx);
        }
        centroid /= F::cast(members.len());
    }
    centroids
}

impl<F: Float, D: Data<Elem = F>> ClusterQuality<F> for ArrayBase<D, Ix2> {
    fn silhouette_score(&self, labels: &ArrayBase<impl Data<Elem = usize>, Ix1>) -> Result<F> {
        let groups = check_labels(self, labels)?;
        let n_samples = self.nrows();

        let score = (0..n_samples)
            .map(|idx| {
                let sample = self.row(idx);
                let own = labels[idx];
                let own_size = groups[&own].len();
                if own_size == 1 {
                    return F::zero();
                }

                let mut a_x = F::zero();
                // minimum average distance from `sample` to another cluster
                let mut b_x: Option<F> = None;
                for (&label, members) in &groups {
                    let total = members
                        .iter()
                        .map(|&other| euclidean(sample, self.row(other)))
                        .sum::<F>();
                    if label == own {
                        // the distance to itself is zero and is not counted
                        a_x = total / F::cast(own_size - 1);
                    } else {
                        let mean = total / F::cast(members.len());
                        b_x = Some(match b_x {
                            Some(v) if v <= mean => v,
                            _ => mean,
                        });
                    }
                }
                // at least two clusters exist, so `b_x` is set
                let b_x = b_x.unwrap_or(a_x);
                let max = if a_x > b_x { a_x } else { b_x };
                if max == F::zero() {
                    F::zero()
                } else {
                    (b_x - a_x) / max
                }
            })
            .sum::<F>();
        Ok(score / F::cast(n_samples))
    }

    fn calinski_harabasz_score(
        &self,
        labels: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    ) -> Result<F> {
        let groups = check_labels(self, labels)?;
        let n_samples = self.nrows();
        let n_labels = groups.len();
        let mean = self.mean_axis(Axis(0)).ok_or(Error::NotEnoughSamples)?;
        let centroids = centroids(self, &groups);

        let mut extra_disp = F::zero();
        let mut intra_disp = F::zero();
        for (centroid, members) in centroids.rows().into_iter().zip(groups.values()) {
            let dist = euclidean(centroid, mean.view());
            extra_disp += F::cast(members.len()) * dist * dist;
            for &idx in members {
                let dist = euclidean(self.row(idx), centroid);
                intra_disp += dist * dist;
            }
        }

        if intra_disp == F::zero() {
            return Ok(F::one());
        }
        Ok(extra_disp * F::cast(n_samples - n_labels)
            / (intra_disp * F::cast(n_labels - 1)))
    }

    fn davies_bouldin_score(
        &self,
        labels: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    ) -> Result<F> {
        let groups = check_labels(self, labels)?;
        let n_labels = groups.len();
        let centroids = centroids(self, &groups);

        let intra_dists: Array1<F> = centroids
            .rows()
            .into_iter()
            .zip(groups.values())
            .map(|(centroid, members)| {
                members
                    .iter()
                    .map(|&idx| euclidean(self.row(idx), centroid))
                    .sum::<F>()
                    / F::cast(members.len())
            })
            .collect();

        let all_close = |x: F| x.abs() <= F::epsilon();
        let separations_vanish = (0..n_labels).all(|i| {
            (0..n_labels).all(|j| all_close(euclidean(centroids.row(i), centroids.row(j))))
        });
        if intra_dists.iter().all(|&d| all_close(d)) || separations_vanish {
            return Ok(F::zero());
        }

        let total = (0..n_labels)
            .map(|i| {
                (0..n_labels)
                    .filter(|&j| j != i)
                    .map(|j| {
                        let separation = euclidean(centroids.row(i), centroids.row(j));
                        if separation == F::zero() {
                            // coinciding centroids are treated as infinitely far apart
                            F::zero()
                        } else {
                            (intra_dists[i] + intra_dists[j]) / separation
                        }
                    })
                    .fold(F::neg_infinity(), |acc, r| if r > acc { r } else { acc })
            })
            .sum::<F>();
        Ok(total / F::cast(n_labels))
    }
}
