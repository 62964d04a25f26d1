//! `geocluster-pipeline` turns raw samples of a set of collections into a quarterly
//! "how often do two cities share a cluster" similarity between municipalities.
//!
//! A run goes, per year and quarter:
//! 1. from the [sample source](store::SampleSource) to [city day records](CityDayTable), through
//!    the spatial aggregation of `geocluster-geo`;
//! 2. from city day records to [daily labels](QuarterLabelTable), with one of the two
//!    [clustering engines](ClusteringEngine) applied on every [feature subset](FeatureSubsets);
//! 3. from daily labels to [similarity records](SimilarityRecord), inserted one batch per
//!    subset in a [record sink](store::RecordSink).
//!
//! [`DensityPipeline`] and [`CentroidPipeline`] compose the steps. A failed insertion never
//! stops a run, it is reported in the returned [`RunReport`].
//!
//! ```
//! use geocluster_pipeline::{quarter_to_dates, Quarter};
//! use chrono::NaiveDate;
//!
//! let (start, end) = quarter_to_dates(2021, "q2").unwrap();
//! assert_eq!(start, NaiveDate::from_ymd_opt(2021, 4, 1).unwrap());
//! assert_eq!(end, NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
//! assert!(Quarter::Q2.contains(end));
//! assert!(quarter_to_dates(2021, "q5").is_err());
//! ```
mod collection;
mod config;
mod engine;
mod error;
mod labels;
mod orchestrator;
mod quarter;
mod record;
mod similarity;
pub mod store;

pub use collection::{CollectionSpec, FeatureSubset, FeatureSubsets};
pub use config::{GeoConfig, GridSearchConfig, KSelectionConfig, PipelineConfig};
pub use engine::{
    day_matrix, CentroidEngine, ClusteringEngine, DayClustering, DayMatrix, DensityEngine,
    FittedModel,
};
pub use error::{PipelineError, Result, StoreError};
pub use labels::{ClusterLabel, Label, QuarterLabelTable};
pub use orchestrator::{BatchOutcome, CentroidPipeline, DensityPipeline, RunReport};
pub use quarter::{quarter_to_dates, Quarter};
pub use record::{CityDayRecord, CityDayTable, Sample, SampleRow};
pub use similarity::{collection_similarity, percent_same_cluster, SimilarityRecord};
