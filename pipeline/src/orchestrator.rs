//! Composition of the stages per year, quarter and collection
use chrono::NaiveDate;
use geocluster::traits::Fit;
use geocluster::ParamGuard;
use geocluster_clustering::{DbscanGridSearchValidParams, GridSearchError, GridSearchOutcome};
use geocluster_geo::{AggregationValidParams, GeoError, PointSample, RegionLayer};
use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::collection::{FeatureSubset, FeatureSubsets};
use crate::config::PipelineConfig;
use crate::engine::{day_matrix, ClusteringEngine, DayClustering, DensityEngine};
use crate::error::{PipelineError, Result, StoreError};
use crate::labels::{ClusterLabel, QuarterLabelTable};
use crate::quarter::Quarter;
use crate::record::CityDayTable;
use crate::similarity::collection_similarity;
use crate::store::{ModelSink, RecordSink, SampleSource, ToWire};

/// Outcome of the insertion of one batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    pub label: String,
    pub succeeded: bool,
}

/// What a run inserted and what it skipped
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RunReport {
    outcomes: Vec<BatchOutcome>,
    skipped: Vec<String>,
}

impl RunReport {
    fn record(&mut self, label: String, result: std::result::Result<(), StoreError>) {
        let succeeded = match result {
            Ok(()) => true,
            Err(err) => {
                warn!(batch = %label, error = %err, "batch insertion failed");
                false
            }
        };
        self.outcomes.push(BatchOutcome { label, succeeded });
    }

    fn skip(&mut self, period: String) {
        self.skipped.push(period);
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn failed_batches(&self) -> Vec<&BatchOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    /// Periods left out for lack of data
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn summary(&self) -> &'static str {
        if self.all_succeeded() {
            "All frequency results saved with success"
        } else {
            "Check for frequency upload errors"
        }
    }
}

/// Imports every collection between `start` and `end`, reduces it to city day records and
/// merges the collections into one table.
fn import_period(
    config: &PipelineConfig,
    layer: &RegionLayer,
    source: &dyn SampleSource,
    aggregation: &AggregationValidParams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(CityDayTable, FeatureSubsets)> {
    let mut merged: Option<CityDayTable> = None;
    let mut bases = Vec::with_capacity(config.collections.len());
    for collection in &config.collections {
        let rows = source.fetch(&collection.name, start, end)?;
        if rows.is_empty() {
            return Err(PipelineError::NoData {
                collection: collection.name.clone(),
                start,
                end,
            });
        }
        let mut features: Vec<String> = rows
            .iter()
            .flat_map(|row| row.values.keys().cloned())
            .collect();
        features.sort();
        features.dedup();

        let samples: Vec<PointSample<NaiveDate>> = rows
            .iter()
            .map(|row| {
                let values = features.iter().map(|f| row.values.get(f).copied()).collect();
                PointSample::new(row.longitude, row.latitude, row.date, values)
            })
            .collect();
        let means = aggregation.aggregate(layer, &samples)?;
        let mut table = CityDayTable::from_means(features.clone(), means)?;
        if collection.forward_fill {
            table.forward_fill();
        }
        debug!(
            collection = %collection.name,
            rows = rows.len(),
            records = table.len(),
            "collection imported"
        );

        bases.push(FeatureSubset::new(collection.name.clone(), features));
        merged = Some(match merged {
            Some(left) => left.merge(table)?,
            None => table,
        });
    }
    let subsets = FeatureSubsets::combine(bases)?;
    let table = merged.ok_or_else(|| {
        PipelineError::InvalidCollections("no collection to import".to_string())
    })?;
    Ok((table, subsets))
}

/// Labels every day of `table` for every subset
fn label_days(
    engine: &dyn ClusteringEngine,
    table: &CityDayTable,
    subsets: &FeatureSubsets,
    mut on_day: impl FnMut(&DayClustering),
) -> Result<QuarterLabelTable> {
    let mut labels = QuarterLabelTable::new();
    for date in table.dates() {
        labels.add_date(date);
        for subset in subsets.iter() {
            let day = engine.cluster_day(table, date, subset)?;
            on_day(&day);
            for (city, label) in day.labelled() {
                labels.insert(ClusterLabel {
                    city: city.to_string(),
                    date,
                    collection: day.collection.clone(),
                    label,
                });
            }
        }
    }
    Ok(labels)
}

/// Computes and inserts the similarity of every subset, one batch each
fn publish_similarity(
    sink: &mut dyn RecordSink,
    labels: &QuarterLabelTable,
    subsets: &FeatureSubsets,
    quarter: Quarter,
    year: i32,
    report: &mut RunReport,
) {
    for subset in subsets.iter() {
        let records = collection_similarity(labels, subset.name(), quarter, year);
        debug!(collection = subset.name(), pairs = records.len(), "similarity computed");
        let batch = records.iter().map(ToWire::to_wire).collect();
        report.record(
            format!("similarity {} {} {}", subset.name(), quarter, year),
            sink.insert_many(batch),
        );
    }
}

/// Skips the period when a collection has no data, fails on any other error
fn or_skip<T>(
    result: Result<T>,
    period: String,
    report: &mut RunReport,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PipelineError::NoData { collection, .. }) => {
            warn!(%period, %collection, "no data, period skipped");
            report.skip(period);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Daily feature matrices of the subset driving the hyperparameter search. Days where a
/// feature has no value are left out.
fn search_days(table: &CityDayTable, subset: &FeatureSubset) -> Result<Vec<Array2<f64>>> {
    let mut days = Vec::new();
    for date in table.dates() {
        match day_matrix(table, date, subset) {
            Ok(matrix) => days.push(matrix.records),
            Err(PipelineError::MissingFeature { feature, .. }) => {
                debug!(%date, %feature, "day left out of the search")
            }
            Err(err) => return Err(err),
        }
    }
    Ok(days)
}

fn checked_aggregation(config: &PipelineConfig) -> Result<AggregationValidParams> {
    config
        .geo
        .params()
        .check()
        .map_err(|err| PipelineError::Geo(GeoError::from(err)))
}

/// Density strategy: one `(eps, min_samples)` per quarter chosen by grid search, DBSCAN on
/// every day, labels and models persisted beside the similarity.
pub struct DensityPipeline<'a> {
    config: &'a PipelineConfig,
    layer: &'a RegionLayer,
    source: &'a dyn SampleSource,
    similarity_sink: &'a mut dyn RecordSink,
    label_sink: &'a mut dyn RecordSink,
    model_sink: &'a dyn ModelSink,
}

impl<'a> DensityPipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layer: &'a RegionLayer,
        source: &'a dyn SampleSource,
        similarity_sink: &'a mut dyn RecordSink,
        label_sink: &'a mut dyn RecordSink,
        model_sink: &'a dyn ModelSink,
    ) -> Self {
        Self {
            config,
            layer,
            source,
            similarity_sink,
            label_sink,
            model_sink,
        }
    }

    /// Chooses the hyperparameters of a quarter on the union subset
    pub fn select_hyperparameters(
        grid: &DbscanGridSearchValidParams<f64>,
        table: &CityDayTable,
        subsets: &FeatureSubsets,
    ) -> Result<GridSearchOutcome<f64>> {
        let days = search_days(table, subsets.union())?;
        Ok(Fit::<_, GridSearchError>::fit(grid, &days)?)
    }

    /// Runs over the years of the configuration
    pub fn run_configured(&mut self) -> Result<RunReport> {
        let config = self.config;
        self.run(&config.years)
    }

    pub fn run(&mut self, years: &[i32]) -> Result<RunReport> {
        let aggregation = checked_aggregation(self.config)?;
        let grid = self
            .config
            .grid_search
            .params()
            .check()
            .map_err(GridSearchError::from)?;
        let mut report = RunReport::default();

        for &year in years {
            info!(year, "density clustering started");
            for quarter in Quarter::all().iter().copied() {
                let (start, end) = quarter.dates(year)?;
                let imported = import_period(
                    self.config,
                    self.layer,
                    self.source,
                    &aggregation,
                    start,
                    end,
                );
                let (table, subsets) =
                    match or_skip(imported, format!("{} {}", quarter, year), &mut report)? {
                        Some(imported) => imported,
                        None => continue,
                    };

                let outcome = Self::select_hyperparameters(&grid, &table, &subsets)?;
                info!(
                    %quarter,
                    year,
                    eps = outcome.eps(),
                    min_samples = outcome.min_samples(),
                    fallback = outcome.used_fallback(),
                    "hyperparameters selected"
                );

                let engine = DensityEngine::new(outcome.eps(), outcome.min_samples());
                let models = self.model_sink;
                let labels = label_days(&engine, &table, &subsets, |day| {
                    if let Err(err) = models.save(&day.collection, day.date, &day.model) {
                        warn!(
                            collection = %day.collection,
                            date = %day.date,
                            error = %err,
                            "model not saved"
                        );
                    }
                })?;

                let batch = labels.labels().iter().map(ToWire::to_wire).collect();
                report.record(
                    format!("labels {} {}", quarter, year),
                    self.label_sink.insert_many(batch),
                );
                publish_similarity(
                    &mut *self.similarity_sink,
                    &labels,
                    &subsets,
                    quarter,
                    year,
                    &mut report,
                );
            }
            info!(year, "density clustering done");
        }
        info!(summary = report.summary(), "run finished");
        Ok(report)
    }
}

/// Centroid strategy: each year imported once, every day of every quarter clustered with
/// K-Means whose `k` is chosen by silhouette.
pub struct CentroidPipeline<'a> {
    config: &'a PipelineConfig,
    layer: &'a RegionLayer,
    source: &'a dyn SampleSource,
    similarity_sink: &'a mut dyn RecordSink,
}

impl<'a> CentroidPipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layer: &'a RegionLayer,
        source: &'a dyn SampleSource,
        similarity_sink: &'a mut dyn RecordSink,
    ) -> Self {
        Self {
            config,
            layer,
            source,
            similarity_sink,
        }
    }

    /// Runs over the years of the configuration
    pub fn run_configured(&mut self) -> Result<RunReport> {
        let config = self.config;
        self.run(&config.years)
    }

    pub fn run(&mut self, years: &[i32]) -> Result<RunReport> {
        let aggregation = checked_aggregation(self.config)?;
        let engine = self.config.k_selection.engine();
        let mut report = RunReport::default();

        for &year in years {
            info!(year, "centroid clustering started");
            let (start, _) = Quarter::Q1.dates(year)?;
            let (_, end) = Quarter::Q4.dates(year)?;
            let imported =
                import_period(self.config, self.layer, self.source, &aggregation, start, end);
            let (table, subsets) = match or_skip(imported, year.to_string(), &mut report)? {
                Some(imported) => imported,
                None => continue,
            };

            for quarter in Quarter::all().iter().copied() {
                let (start, end) = quarter.dates(year)?;
                let quarter_table = table.restrict(start, end);
                if quarter_table.is_empty() {
                    warn!(%quarter, year, "no data, quarter skipped");
                    report.skip(format!("{} {}", quarter, year));
                    continue;
                }
                let labels = label_days(&engine, &quarter_table, &subsets, |_| {})?;
                publish_similarity(
                    &mut *self.similarity_sink,
                    &labels,
                    &subsets,
                    quarter,
                    year,
                    &mut report,
                );
            }
            info!(year, "centroid clustering done");
        }
        info!(summary = report.summary(), "run finished");
        Ok(report)
    }
}
