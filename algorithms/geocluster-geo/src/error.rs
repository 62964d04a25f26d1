use std::io;

use thiserror::Error;

use crate::hyperparams::AggregationParamsError;

pub type Result<T> = std::result::Result<T, GeoError>;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("region layer holds no region")]
    EmptyLayer,
    #[error("region name {0} is used more than once")]
    DuplicateRegion(String),
    #[error("region {0} has no area, its centroid is undefined")]
    EmptyGeometry(String),
    #[error("feature {0} of the region layer has no {1} property")]
    MissingName(usize, String),
    #[error("feature {0} of the region layer is not a polygon: {1}")]
    UnsupportedGeometry(usize, String),
    #[error("malformed coordinate in feature {0}")]
    MalformedCoordinate(usize),
    #[error("sample {index} holds {found} feature values, expected {expected}")]
    FeatureCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("sample {0} has a non finite coordinate")]
    InvalidCoordinate(usize),
    #[error("no point within {max_radius} m of the centroid of {regions:?}")]
    UnresolvedGaps {
        regions: Vec<String>,
        max_radius: f64,
    },
    #[error(transparent)]
    InvalidParams(#[from] AggregationParamsError),
    #[error("cannot parse the region layer: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read the region layer: {0}")]
    Io(#[from] io::Error),
}
