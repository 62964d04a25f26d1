//! The two clustering strategies labelling one day of records
use chrono::NaiveDate;
use geocluster::traits::Fit;
use geocluster_clustering::{
    count_distinct_rows, Dbscan, DbscanError, DbscanModel, KMeans, KMeansError, KSelection,
};
use geocluster_preprocessing::LinearScaler;
use ndarray::Array2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::Serialize;
use tracing::debug;

use crate::collection::FeatureSubset;
use crate::error::{PipelineError, Result};
use crate::labels::Label;
use crate::record::{CityDayRecord, CityDayTable};

/// Model fitted on one day, kept as a secondary output
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum FittedModel {
    Dbscan(DbscanModel<f64>),
    KMeans(KMeans<f64>),
}

impl FittedModel {
    pub fn strategy(&self) -> &'static str {
        match self {
            FittedModel::Dbscan(_) => "dbscan",
            FittedModel::KMeans(_) => "kmeans",
        }
    }
}

/// Features of a day restricted to a subset, rows with a missing value left out
#[derive(Clone, Debug, PartialEq)]
pub struct DayMatrix {
    /// Position, among the records of the day, of every row of `records`
    pub rows: Vec<usize>,
    pub records: Array2<f64>,
}

/// Extracts the columns of `subset` from the records of `date`.
///
/// Fails when a feature of the subset has no value at all that day.
pub fn day_matrix(table: &CityDayTable, date: NaiveDate, subset: &FeatureSubset) -> Result<DayMatrix> {
    let day = table.day(date);
    let columns = subset
        .features()
        .iter()
        .map(|feature| {
            table
                .feature_index(feature)
                .filter(|&idx| day.iter().any(|r| r.values[idx].is_some()))
                .ok_or_else(|| PipelineError::MissingFeature {
                    feature: feature.clone(),
                    date,
                })
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut rows = Vec::with_capacity(day.len());
    let mut data = Vec::with_capacity(day.len() * columns.len());
    for (position, record) in day.iter().enumerate() {
        let values: Option<Vec<f64>> = columns.iter().map(|&idx| record.values[idx]).collect();
        if let Some(values) = values {
            rows.push(position);
            data.extend(values);
        }
    }
    let records = Array2::from_shape_vec((rows.len(), columns.len()), data)?;
    Ok(DayMatrix { rows, records })
}

/// Labels of the records of one day for one subset
#[derive(Clone, Debug, PartialEq)]
pub struct DayClustering {
    pub date: NaiveDate,
    pub collection: String,
    /// One entry per record of the day, in table order. Records missing a feature of the subset
    /// stay unlabelled.
    pub labels: Vec<(String, Option<Label>)>,
    pub model: FittedModel,
}

impl DayClustering {
    /// Labelled cities
    pub fn labelled(&self) -> impl Iterator<Item = (&str, Label)> {
        self.labels
            .iter()
            .filter_map(|(city, label)| label.map(|label| (city.as_str(), label)))
    }
}

/// A strategy assigning a cluster to every city of a day
pub trait ClusteringEngine {
    fn strategy(&self) -> &'static str;

    /// Clusters the standardised features of `subset` on `date`
    fn cluster_day(
        &self,
        table: &CityDayTable,
        date: NaiveDate,
        subset: &FeatureSubset,
    ) -> Result<DayClustering>;
}

/// Standardises the day, checking it holds enough distinct points to be clustered
fn prepare_day(
    table: &CityDayTable,
    date: NaiveDate,
    subset: &FeatureSubset,
) -> Result<(DayMatrix, Array2<f64>)> {
    let matrix = day_matrix(table, date, subset)?;
    let found = count_distinct_rows(&matrix.records);
    if found < 2 {
        return Err(PipelineError::TooFewDistinctPoints {
            collection: subset.name().to_string(),
            date,
            found,
        });
    }
    let scaled = LinearScaler::standard().fit_transform(&matrix.records)?;
    Ok((matrix, scaled))
}

fn attach_labels(
    day: &[CityDayRecord],
    rows: &[usize],
    labels: impl IntoIterator<Item = Label>,
) -> Vec<(String, Option<Label>)> {
    let mut attached: Vec<(String, Option<Label>)> =
        day.iter().map(|r| (r.city.clone(), None)).collect();
    for (&position, label) in rows.iter().zip(labels) {
        attached[position].1 = Some(label);
    }
    attached
}

/// DBSCAN with hyperparameters fixed for the whole period
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityEngine {
    eps: f64,
    min_samples: usize,
}

impl DensityEngine {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}

impl ClusteringEngine for DensityEngine {
    fn strategy(&self) -> &'static str {
        "dbscan"
    }

    fn cluster_day(
        &self,
        table: &CityDayTable,
        date: NaiveDate,
        subset: &FeatureSubset,
    ) -> Result<DayClustering> {
        let (matrix, scaled) = prepare_day(table, date, subset)?;
        let params = Dbscan::params(self.min_samples).tolerance(self.eps);
        let model: DbscanModel<f64> = Fit::<_, DbscanError>::fit(&params, &scaled)?;
        debug!(
            %date,
            collection = subset.name(),
            clusters = model.n_clusters(),
            noise = model.n_noise(),
            "dbscan fitted"
        );

        let labels = model.labels().iter().map(|&cluster| Label::from(cluster));
        let labels = attach_labels(table.day(date), &matrix.rows, labels);
        Ok(DayClustering {
            date,
            collection: subset.name().to_string(),
            labels,
            model: FittedModel::Dbscan(model),
        })
    }
}

/// K-Means with the number of clusters chosen every day by silhouette analysis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CentroidEngine {
    min_clusters: usize,
    max_clusters: usize,
    n_runs: usize,
    seed: u64,
}

impl CentroidEngine {
    /// Searches `k` in `2..=15` with 10 runs per `k` and seed 0
    pub fn new() -> Self {
        Self {
            min_clusters: 2,
            max_clusters: 15,
            n_runs: 10,
            seed: 0,
        }
    }

    pub fn cluster_range(mut self, min_clusters: usize, max_clusters: usize) -> Self {
        self.min_clusters = min_clusters;
        self.max_clusters = max_clusters;
        self
    }

    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for CentroidEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusteringEngine for CentroidEngine {
    fn strategy(&self) -> &'static str {
        "kmeans"
    }

    fn cluster_day(
        &self,
        table: &CityDayTable,
        date: NaiveDate,
        subset: &FeatureSubset,
    ) -> Result<DayClustering> {
        let (matrix, scaled) = prepare_day(table, date, subset)?;
        let params = KSelection::params_with_rng(Xoshiro256Plus::seed_from_u64(self.seed))
            .cluster_range(self.min_clusters, self.max_clusters)
            .n_runs(self.n_runs);
        let selection: KSelection<f64> = Fit::<_, KMeansError>::fit(&params, &scaled)?;
        debug!(
            %date,
            collection = subset.name(),
            k = selection.n_clusters(),
            "k-means selected"
        );

        let labels = selection.labels().iter().map(|&cluster| Label::Cluster(cluster));
        let labels = attach_labels(table.day(date), &matrix.rows, labels);
        Ok(DayClustering {
            date,
            collection: subset.name().to_string(),
            labels,
            model: FittedModel::KMeans(selection.into_model()),
        })
    }
}
