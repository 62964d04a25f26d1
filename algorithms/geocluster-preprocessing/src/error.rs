//! Error definitions for preprocessing
use thiserror::Error;
pub type Result<T> = std::result::Result<T, PreprocessingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    #[error("not enough samples")]
    NotEnoughSamples,
    #[error("not a valid float")]
    InvalidFloat,
    #[error("wrong number of features: expected {0}, found {1}")]
    WrongFeatureCount(usize, usize),
    #[error(transparent)]
    BaseCrate(#[from] geocluster::Error),
}
