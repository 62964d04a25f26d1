//! Linear Scaling methods

use crate::error::{PreprocessingError, Result};
use approx::abs_diff_eq;
use geocluster::traits::{Fit, Transformer};
use geocluster::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Possible scaling methods for [LinearScaler](struct.LinearScaler.html)
///
/// * Standard (with mean, with std): subtracts the mean to each feature and scales it by the
///   inverse of its standard deviation
pub enum ScalingMethod {
    Standard(bool, bool),
}

impl std::fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalingMethod::Standard(with_mean, with_std) => write!(
                f,
                "Standard scaler (with_mean = {}, with_std = {})",
                with_mean, with_std
            ),
        }
    }
}

/// Linear Scaler: learns scaling parameters, according to the specified
/// [method](enum.ScalingMethod.html), from a set of records, producing a
/// [fitted linear scaler](struct.FittedLinearScaler.html) that can be used to scale records
/// with the same parameters.
///
/// ### Example
///
/// ```rust
/// use geocluster::traits::{Fit, Transformer};
/// use geocluster_preprocessing::{LinearScaler, PreprocessingError};
/// use ndarray::array;
///
/// let records = array![[1., 10.], [3., 10.]];
/// let scaler: geocluster_preprocessing::FittedLinearScaler<f64> =
///     Fit::<_, PreprocessingError>::fit(&LinearScaler::standard(), &records).unwrap();
/// let scaled = scaler.transform(&records);
/// assert_eq!(scaled, array![[-1., 0.], [1., 0.]]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearScaler {
    method: ScalingMethod,
}

impl LinearScaler {
    /// Initializes the scaler with the specified method.
    pub fn new(method: ScalingMethod) -> Self {
        Self { method }
    }

    /// Setter for the scaler method
    pub fn method(mut self, method: ScalingMethod) -> Self {
        self.method = method;
        self
    }

    /// Initializes a Standard scaler
    pub fn standard() -> Self {
        Self {
            method: ScalingMethod::Standard(true, true),
        }
    }

    /// Initializes a Standard scaler that does not subract the mean to the features
    pub fn standard_no_mean() -> Self {
        Self {
            method: ScalingMethod::Standard(false, true),
        }
    }

    /// Fits the scaler on `records` and returns them scaled, the way every clustering day is
    /// prepared.
    pub fn fit_transform<F: Float, D: Data<Elem = F>>(
        &self,
        records: &ArrayBase<D, Ix2>,
    ) -> Result<Array2<F>> {
        let fitted: FittedLinearScaler<F> = Fit::<_, PreprocessingError>::fit(self, records)?;
        Ok(fitted.transform(records))
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, PreprocessingError> for LinearScaler {
    type Object = FittedLinearScaler<F>;

    /// Fits the input records according to the scaler [method](enum.ScalingMethod.html). Will
    /// return an error if the records do not contain any samples or contain a non finite value.
    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        match self.method {
            ScalingMethod::Standard(with_mean, with_std) => {
                FittedLinearScaler::standard(records, with_mean, with_std)
            }
        }
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
/// The result of fitting a [linear scaler](struct.LinearScaler.html).
/// Scales records with the parameters learned during fitting.
pub struct FittedLinearScaler<F: Float> {
    offsets: Array1<F>,
    scales: Array1<F>,
    method: ScalingMethod,
}

impl<F: Float> FittedLinearScaler<F> {
    pub(crate) fn standard<D: Data<Elem = F>>(
        records: &ArrayBase<D, Ix2>,
        with_mean: bool,
        with_std: bool,
    ) -> Result<Self> {
        if records.nrows() == 0 {
            return Err(PreprocessingError::NotEnoughSamples);
        }
        if records.iter().any(|x| !x.is_finite()) {
            return Err(PreprocessingError::InvalidFloat);
        }
        let means = if with_mean {
            records
                .mean_axis(Axis(0))
                .ok_or(PreprocessingError::NotEnoughSamples)?
        } else {
            Array1::zeros(records.ncols())
        };
        let std_devs = if with_std {
            records.std_axis(Axis(0), F::zero()).mapv(|s| {
                if abs_diff_eq!(s, F::zero()) {
                    // if feature is constant then don't scale
                    F::one()
                } else {
                    F::one() / s
                }
            })
        } else {
            Array1::ones(records.ncols())
        };
        Ok(Self {
            offsets: means,
            scales: std_devs,
            method: ScalingMethod::Standard(with_mean, with_std),
        })
    }

    /// Array of size `n_features` that contains the offset that will be subtracted to each
    /// feature
    pub fn offsets(&self) -> &Array1<F> {
        &self.offsets
    }

    /// Array of size `n_features` that contains the scale that will be applied to each feature
    pub fn scales(&self) -> &Array1<F> {
        &self.scales
    }

    /// Returns the method used for fitting. Useful for printing, since
    /// [ScalingMethod](enum.ScalingMethod.html) implements `Display`
    pub fn method(&self) -> &ScalingMethod {
        &self.method
    }

    /// Scales `records`, checking first that they have as many features as the fitted ones
    pub fn try_transform<D: Data<Elem = F>>(&self, records: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        if records.ncols() != self.offsets.len() {
            return Err(PreprocessingError::WrongFeatureCount(
                self.offsets.len(),
                records.ncols(),
            ));
        }
        Ok(self.transform(records))
    }
}

impl<F: Float, D: Data<Elem = F>> Transformer<&ArrayBase<D, Ix2>, Array2<F>>
    for FittedLinearScaler<F>
{
    /// Scales an array of size (nsamples, nfeatures) according to the scaler's `offsets` and
    /// `scales`. Panics if the shape of the input array is not compatible with the shape of the
    /// fitted scaler.
    fn transform(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        if x.is_empty() {
            return Array2::zeros((0, x.ncols()));
        }
        (x - &self.offsets) * &self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn fit(scaler: &LinearScaler, records: &Array2<f64>) -> Result<FittedLinearScaler<f64>> {
        scaler.fit(records)
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<ScalingMethod>();
        has_autotraits::<LinearScaler>();
        has_autotraits::<FittedLinearScaler<f64>>();
    }

    #[test]
    fn test_standard_scaler() {
        let records = array![[1., -1., 2.], [2., 0., 0.], [0., 1., -1.]];
        let scaler = fit(&LinearScaler::standard(), &records).unwrap();
        assert_abs_diff_eq!(*scaler.offsets(), array![1., 0., 1. / 3.]);
        assert_abs_diff_eq!(
            *scaler.scales(),
            array![1. / 0.81, 1. / 0.81, 1. / 1.24],
            epsilon = 1e-2
        );
        let transformed = scaler.transform(&records);
        let means = transformed.mean_axis(Axis(0)).unwrap();
        let std_devs = transformed.std_axis(Axis(0), 0.);
        assert_abs_diff_eq!(means, array![0., 0., 0.]);
        assert_abs_diff_eq!(std_devs, array![1., 1., 1.]);
    }

    #[test]
    fn test_standard_const_feature() {
        let records = array![[1., 2., 2.], [2., 2., 0.], [0., 2., -1.]];
        let scaler = fit(&LinearScaler::standard(), &records).unwrap();
        assert_abs_diff_eq!(*scaler.offsets(), array![1., 2., 1. / 3.]);
        assert_abs_diff_eq!(
            *scaler.scales(),
            array![1. / 0.81, 1., 1. / 1.24],
            epsilon = 1e-2
        );
        let transformed = scaler.transform(&records);
        let means = transformed.mean_axis(Axis(0)).unwrap();
        let std_devs = transformed.std_axis(Axis(0), 0.);
        assert_abs_diff_eq!(means, array![0., 0., 0.]);
        // 0 std dev on constant feature
        assert_abs_diff_eq!(std_devs, array![1., 0., 1.]);
    }

    #[test]
    fn test_standard_scaler_no_mean() {
        let records = array![[1., -1., 2.], [2., 0., 0.], [0., 1., -1.]];
        let scaler = fit(&LinearScaler::standard_no_mean(), &records).unwrap();
        assert_abs_diff_eq!(*scaler.offsets(), array![0., 0., 0.]);
        assert_eq!(
            scaler.method().to_string(),
            "Standard scaler (with_mean = false, with_std = true)"
        );
    }

    #[test]
    fn fit_transform_is_fresh_per_call() {
        let day_one = array![[0.], [2.]];
        let day_two = array![[100.], [300.]];
        let scaler = LinearScaler::standard();
        let one = scaler.fit_transform(&day_one).unwrap();
        let two = scaler.fit_transform(&day_two).unwrap();
        assert_abs_diff_eq!(one, array![[-1.], [1.]]);
        assert_abs_diff_eq!(two, array![[-1.], [1.]]);
    }

    #[test]
    fn test_empty_input() {
        let records: Array2<f64> = Array2::from_shape_vec((0, 0), vec![]).unwrap();
        let scaler = fit(&LinearScaler::standard(), &records);
        assert_eq!(scaler.unwrap_err().to_string(), "not enough samples");
    }

    #[test]
    fn test_non_finite_input() {
        let records = array![[1., f64::NAN], [2., 0.]];
        let scaler = fit(&LinearScaler::standard(), &records);
        assert_eq!(scaler.unwrap_err(), PreprocessingError::InvalidFloat);
    }

    #[test]
    fn test_wrong_feature_count() {
        let records = array![[1., 0.], [2., 0.]];
        let scaler = fit(&LinearScaler::standard(), &records).unwrap();
        assert_eq!(
            scaler.try_transform(&array![[1.]]).unwrap_err(),
            PreprocessingError::WrongFeatureCount(2, 1)
        );
    }
}
