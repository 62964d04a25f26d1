//! Provide traits for different classes of algorithms
//!

use std::error::Error;

/// Transformation algorithms
///
/// A transformer takes a dataset and transforms it into a different one. It has no concept of
/// state and provides therefore no method to predict new data. A typical example are
/// density clustering algorithms like DBSCAN, which label a fixed set of records.
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}

/// Fittable algorithms
///
/// A fittable algorithm takes a set of records and creates a concept of some kind about it. The
/// hyperparameters are the receiver and the fitted model is returned as `Self::Object`.
pub trait Fit<R, E: Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, records: &R) -> Result<Self::Object, E>;
}

/// Predict with a fitted model
///
/// This trait assumes the model is already fitted and assigns new records to the concept
/// learned during fitting, for example the closest centroid.
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}
