//! Error types of the pipeline
use std::io;

use chrono::NaiveDate;
use geocluster_clustering::{DbscanError, GridSearchError, KMeansError};
use geocluster_geo::GeoError;
use geocluster_preprocessing::PreprocessingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of one of the external collaborators, the sample source or a record sink
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("record is not serialisable: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0} is not a quarter code, expected one of q1, q2, q3, q4")]
    MalformedQuarter(String),
    #[error("year {0} is out of the supported calendar range")]
    InvalidYear(i32),
    #[error("collection {collection} holds no sample between {start} and {end}")]
    NoData {
        collection: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("invalid collections: {0}")]
    InvalidCollections(String),
    #[error("malformed table: {0}")]
    MalformedTable(String),
    #[error("feature {feature} has no value on {date}")]
    MissingFeature { feature: String, date: NaiveDate },
    #[error("{found} distinct points for {collection} on {date}, at least 2 are needed")]
    TooFewDistinctPoints {
        collection: String,
        date: NaiveDate,
        found: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot parse the configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("cannot read the configuration: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Dbscan(#[from] DbscanError),
    #[error(transparent)]
    KMeans(#[from] KMeansError),
    #[error(transparent)]
    GridSearch(#[from] GridSearchError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
