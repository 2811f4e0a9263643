//! Summary statistics of a sampled trajectory.

use nalgebra::{DMatrix, DVector};
use ndarray::prelude::*;
use ndarray_stats::errors::EmptyInput;
use ndarray_stats::CorrelationExt;

use crate::error::NumericalError;

/// Sample mean and covariance of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSummary {
    /// Number of states summarised.
    pub n: usize,
    pub mean: Array1<f64>,
    /// Unbiased (`ddof = 1`) sample covariance.
    pub cov: Array2<f64>,
}

impl SampleSummary {
    /// Summarises `samples`, one state per row. Needs at least two rows.
    pub fn from_samples(samples: ArrayView2<f64>) -> Result<Self, EmptyInput> {
        if samples.nrows() < 2 {
            return Err(EmptyInput);
        }
        let mean = samples.mean_axis(Axis(0)).ok_or(EmptyInput)?;
        let cov = samples.t().cov(1.0)?;
        Ok(Self {
            n: samples.nrows(),
            mean,
            cov,
        })
    }

    /// Largest absolute difference between the sample mean and `mean`.
    pub fn mean_error(&self, mean: &DVector<f64>) -> Result<f64, NumericalError> {
        check_dim(self.mean.len(), mean.len())?;
        Ok(self
            .mean
            .iter()
            .zip(mean.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max))
    }

    /// Largest absolute difference between the sample covariance and `cov`.
    pub fn cov_error(&self, cov: &DMatrix<f64>) -> Result<f64, NumericalError> {
        let dim = self.mean.len();
        check_dim(dim, cov.nrows())?;
        check_dim(dim, cov.ncols())?;
        Ok(self
            .cov
            .indexed_iter()
            .map(|((i, j), a)| (a - cov[(i, j)]).abs())
            .fold(0.0, f64::max))
    }
}

fn check_dim(expected: usize, actual: usize) -> Result<(), NumericalError> {
    if expected != actual {
        return Err(NumericalError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn summary_of_known_points() {
        let samples = arr2(&[[0.0, 1.0], [2.0, 1.0], [4.0, 4.0]]);
        let summary = SampleSummary::from_samples(samples.view()).unwrap();

        assert_eq!(summary.n, 3);
        assert_abs_diff_eq!(summary.mean, arr1(&[2.0, 2.0]), epsilon = 1e-12);
        assert_abs_diff_eq!(
            summary.cov,
            arr2(&[[4.0, 3.0], [3.0, 3.0]]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn errors_against_reference_moments() {
        let samples = arr2(&[[0.0, 1.0], [2.0, 1.0], [4.0, 4.0]]);
        let summary = SampleSummary::from_samples(samples.view()).unwrap();

        let mean = DVector::from_vec(vec![2.5, 2.0]);
        assert_abs_diff_eq!(summary.mean_error(&mean).unwrap(), 0.5, epsilon = 1e-12);

        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 3.0, 3.0, 1.0]);
        assert_abs_diff_eq!(summary.cov_error(&cov).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn reference_of_wrong_shape_is_rejected() {
        let samples = arr2(&[[0.0, 1.0], [2.0, 1.0], [4.0, 4.0]]);
        let summary = SampleSummary::from_samples(samples.view()).unwrap();

        assert_eq!(
            summary.mean_error(&DVector::zeros(3)),
            Err(NumericalError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(
            summary.cov_error(&DMatrix::identity(1, 1)),
            Err(NumericalError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(summary.cov_error(&DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn needs_two_rows() {
        let samples = arr2(&[[1.0, 2.0]]);
        assert!(SampleSummary::from_samples(samples.view()).is_err());
    }
}
