//! Error types in geocluster
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("not enough samples")]
    NotEnoughSamples,
    #[error("number of labels ({0}) does not match number of samples ({1})")]
    MismatchedLabels(usize, usize),
    #[error("number of clusters is {0}, expected between 2 and n_samples - 1 ({1})")]
    InvalidClusterCount(usize, usize),
}
