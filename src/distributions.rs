/*!
Target and proposal densities for Metropolis-Hastings over `R^dim`.

- [`Target`] evaluates the (log-)density the chain should sample from.
- [`Proposal`] draws candidate states and evaluates `q(x; center)`.
- [`MultivariateNormal`] is a full-covariance Gaussian, factorised once with a Cholesky
  decomposition so that evaluation is a triangular solve.
- [`GaussianMixture`] is a weighted sum of [`MultivariateNormal`] components.
- [`RandomWalkGaussian`] is the symmetric random-walk proposal `q(x'; x) = N(x'; x, Sigma)`.

# Examples

```rust
use mixture_mh::distributions::{GaussianMixture, MultivariateNormal, Target};
use nalgebra::{DMatrix, DVector};

let left = MultivariateNormal::new(
    DVector::from_vec(vec![-4.0, 0.0]),
    DMatrix::identity(2, 2),
).unwrap();
let right = MultivariateNormal::new(
    DVector::from_vec(vec![4.0, 0.0]),
    DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 1.0]),
).unwrap();
let mixture = GaussianMixture::new(vec![0.6, 0.4], vec![left, right]).unwrap();

let p = mixture.pdf(&[0.0, 0.0]).unwrap();
assert!(p > 0.0);
```
*/

use nalgebra::{Cholesky, DMatrix, DVector};
use std::f64::consts::PI;

use crate::core::RandomSource;
use crate::error::{ConfigError, NumericalError};

/// Absolute tolerance on `sum(weights) == 1`.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Relative tolerance used when checking covariance symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A density over `R^dim` that a chain samples from.
pub trait Target {
    /// Dimension of the sample space.
    fn dim(&self) -> usize;

    /// Natural log of the density at `x`; `-inf` where the density is zero.
    fn ln_pdf(&self, x: &[f64]) -> Result<f64, NumericalError>;

    /// The density at `x`. May underflow to zero far from the mass.
    fn pdf(&self, x: &[f64]) -> Result<f64, NumericalError> {
        Ok(self.ln_pdf(x)?.exp())
    }
}

/// A conditional proposal `q(x; center)`.
pub trait Proposal {
    /// Dimension of the sample space.
    fn dim(&self) -> usize;

    /// Draws a candidate from `q(.; center)`.
    fn sample<R: RandomSource + ?Sized>(&self, center: &[f64], rng: &mut R) -> Vec<f64>;

    /// Natural log of `q(x; center)`.
    fn ln_pdf(&self, x: &[f64], center: &[f64]) -> Result<f64, NumericalError>;

    /// `q(x; center)`.
    fn pdf(&self, x: &[f64], center: &[f64]) -> Result<f64, NumericalError> {
        Ok(self.ln_pdf(x, center)?.exp())
    }
}

fn check_len(x: &[f64], dim: usize) -> Result<(), NumericalError> {
    if x.len() != dim {
        return Err(NumericalError::DimensionMismatch {
            expected: dim,
            actual: x.len(),
        });
    }
    Ok(())
}

/// Checks shape and symmetry of `cov` and returns its lower Cholesky factor.
pub(crate) fn cholesky_factor(
    what: &str,
    cov: &DMatrix<f64>,
    dim: usize,
) -> Result<DMatrix<f64>, ConfigError> {
    if cov.nrows() != dim || cov.ncols() != dim {
        return Err(ConfigError::NonSquareCovariance {
            what: what.to_string(),
            rows: cov.nrows(),
            cols: cov.ncols(),
            dim,
        });
    }
    for i in 0..dim {
        for j in 0..i {
            let (a, b) = (cov[(i, j)], cov[(j, i)]);
            let tol = SYMMETRY_TOLERANCE * (1.0 + a.abs().max(b.abs()));
            if !(a.is_finite() && b.is_finite()) || (a - b).abs() > tol {
                return Err(ConfigError::NonSymmetricCovariance {
                    what: what.to_string(),
                });
            }
        }
    }
    let not_pd = || ConfigError::NotPositiveDefinite {
        what: what.to_string(),
    };
    let l = Cholesky::new(cov.clone()).ok_or_else(not_pd)?.unpack();
    if l.diagonal().iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        return Err(not_pd());
    }
    Ok(l)
}

/**
A multivariate normal distribution `N(mean, cov)`.

The covariance is validated (square, symmetric, positive definite) and factorised as
`cov = L L^T` at construction, so evaluation never has to invert a matrix.

# Examples

```rust
use mixture_mh::distributions::{MultivariateNormal, Target};
use nalgebra::{DMatrix, DVector};

let mvn = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
let p = mvn.pdf(&[0.0, 0.0]).unwrap();
assert!((p - 1.0 / (2.0 * std::f64::consts::PI)).abs() < 1e-12);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateNormal {
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    chol_l: DMatrix<f64>,
    /// `-0.5 * (dim * ln(2 pi) + ln det cov)`
    ln_norm: f64,
}

impl MultivariateNormal {
    pub fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self, ConfigError> {
        Self::named("covariance", mean, cov)
    }

    /// Like [`MultivariateNormal::new`], naming the covariance in errors.
    pub(crate) fn named(
        what: &str,
        mean: DVector<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, ConfigError> {
        let dim = mean.len();
        if dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        let chol_l = cholesky_factor(what, &cov, dim)?;
        let ln_det: f64 = 2.0 * chol_l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
        let ln_norm = -0.5 * (dim as f64 * (2.0 * PI).ln() + ln_det);
        Ok(Self {
            mean,
            cov,
            chol_l,
            ln_norm,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// `ln N(x; center, cov)`, i.e. this distribution shifted to `center`.
    pub fn ln_pdf_centered(&self, x: &[f64], center: &[f64]) -> Result<f64, NumericalError> {
        check_len(x, self.dim())?;
        check_len(center, self.dim())?;
        let diff = DVector::from_iterator(self.dim(), x.iter().zip(center).map(|(a, b)| a - b));
        let z = self
            .chol_l
            .solve_lower_triangular(&diff)
            .ok_or(NumericalError::SingularCovariance)?;
        let value = self.ln_norm - 0.5 * z.norm_squared();
        if value.is_nan() || value == f64::INFINITY {
            return Err(NumericalError::NonFinite {
                what: "Gaussian log-density",
                value,
            });
        }
        Ok(value)
    }

    /// One draw from `N(center, cov)`.
    pub fn sample_centered<R: RandomSource + ?Sized>(
        &self,
        center: &[f64],
        rng: &mut R,
    ) -> Vec<f64> {
        rng.multivariate_normal(center, &self.chol_l)
    }
}

impl Target for MultivariateNormal {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn ln_pdf(&self, x: &[f64]) -> Result<f64, NumericalError> {
        self.ln_pdf_centered(x, self.mean.as_slice())
    }
}

/// One weighted component of a [`GaussianMixture`].
#[derive(Debug, Clone, PartialEq)]
struct MixtureComponent {
    weight: f64,
    normal: MultivariateNormal,
}

/**
A finite mixture `p(x) = sum_k w_k N(x; mu_k, Sigma_k)`.

The weights must be non-negative and sum to one within [`WEIGHT_TOLERANCE`]; every component
must share the same dimension.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixture {
    dim: usize,
    components: Vec<MixtureComponent>,
}

impl GaussianMixture {
    pub fn new(weights: Vec<f64>, normals: Vec<MultivariateNormal>) -> Result<Self, ConfigError> {
        if normals.is_empty() {
            return Err(ConfigError::NoComponents);
        }
        if weights.len() != normals.len() {
            return Err(ConfigError::ComponentCountMismatch {
                what: "weights",
                expected: normals.len(),
                actual: weights.len(),
            });
        }
        for (index, &value) in weights.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { index, value });
            }
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsNotNormalized {
                sum,
                tolerance: WEIGHT_TOLERANCE,
            });
        }
        let dim = normals[0].dim();
        for (k, normal) in normals.iter().enumerate() {
            if normal.dim() != dim {
                return Err(ConfigError::DimensionMismatch {
                    what: format!("mean {k}"),
                    expected: dim,
                    actual: normal.dim(),
                });
            }
        }
        let components = weights
            .into_iter()
            .zip(normals)
            .map(|(weight, normal)| MixtureComponent { weight, normal })
            .collect();
        Ok(Self { dim, components })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Mean of the mixture, `sum_k w_k mu_k`.
    pub fn mean(&self) -> DVector<f64> {
        self.components
            .iter()
            .fold(DVector::zeros(self.dim), |acc, c| {
                acc + c.normal.mean() * c.weight
            })
    }

    /// Covariance of the mixture, `sum_k w_k (Sigma_k + mu_k mu_k^T) - m m^T`.
    pub fn covariance(&self) -> DMatrix<f64> {
        let m = self.mean();
        let second_moment = self
            .components
            .iter()
            .fold(DMatrix::zeros(self.dim, self.dim), |acc, c| {
                let mu = c.normal.mean();
                acc + (c.normal.cov() + mu * mu.transpose()) * c.weight
            });
        second_moment - &m * m.transpose()
    }
}

impl Target for GaussianMixture {
    fn dim(&self) -> usize {
        self.dim
    }

    /// Log-sum-exp over `ln w_k + ln N(x; mu_k, Sigma_k)`.
    fn ln_pdf(&self, x: &[f64]) -> Result<f64, NumericalError> {
        check_len(x, self.dim)?;
        let terms = self
            .components
            .iter()
            .map(|c| Ok(c.weight.ln() + c.normal.ln_pdf(x)?))
            .collect::<Result<Vec<f64>, NumericalError>>()?;
        let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == f64::NEG_INFINITY {
            return Ok(max);
        }
        let sum = terms.iter().fold(0.0, |acc, t| acc + (t - max).exp());
        Ok(max + sum.ln())
    }

    fn pdf(&self, x: &[f64]) -> Result<f64, NumericalError> {
        check_len(x, self.dim)?;
        self.components
            .iter()
            .try_fold(0.0, |acc, c| Ok(acc + c.weight * c.normal.pdf(x)?))
    }
}

/**
Symmetric Gaussian random-walk proposal `q(x'; x) = N(x'; x, Sigma)`.

`Sigma` is fixed for the whole run, so `q(x'; x) == q(x; x')`.

# Examples

```rust
use mixture_mh::distributions::{Proposal, RandomWalkGaussian};
use nalgebra::DMatrix;
use rand::{rngs::SmallRng, SeedableRng};

let proposal = RandomWalkGaussian::new(DMatrix::identity(2, 2) * 10.0).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let candidate = proposal.sample(&[0.0, 0.0], &mut rng);
assert_eq!(candidate.len(), 2);

let forward = proposal.pdf(&candidate, &[0.0, 0.0]).unwrap();
let backward = proposal.pdf(&[0.0, 0.0], &candidate).unwrap();
assert!((forward - backward).abs() < 1e-15);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalkGaussian {
    step: MultivariateNormal,
}

impl RandomWalkGaussian {
    pub fn new(cov: DMatrix<f64>) -> Result<Self, ConfigError> {
        let dim = cov.nrows();
        let step = MultivariateNormal::named("proposal covariance", DVector::zeros(dim), cov)?;
        Ok(Self { step })
    }

    /// Isotropic proposal `variance * I`.
    pub fn isotropic(dim: usize, variance: f64) -> Result<Self, ConfigError> {
        Self::new(DMatrix::identity(dim, dim) * variance)
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        self.step.cov()
    }
}

impl Proposal for RandomWalkGaussian {
    fn dim(&self) -> usize {
        self.step.dim()
    }

    fn sample<R: RandomSource + ?Sized>(&self, center: &[f64], rng: &mut R) -> Vec<f64> {
        self.step.sample_centered(center, rng)
    }

    fn ln_pdf(&self, x: &[f64], center: &[f64]) -> Result<f64, NumericalError> {
        self.step.ln_pdf_centered(x, center)
    }
}
