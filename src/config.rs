//! Plain-data descriptions of a sampling experiment.
//!
//! [`MixtureTargetSpec`] and [`ProposalSpec`] carry raw parameters; [`SamplerConfig::build`]
//! validates them together and produces a ready [`MetropolisHastings`] sampler. Every shape and
//! weight problem surfaces here as a [`ConfigError`], before any sampling happens.

use nalgebra::{DMatrix, DVector};

use crate::distributions::{GaussianMixture, MultivariateNormal, RandomWalkGaussian};
use crate::error::ConfigError;
use crate::metropolis_hastings::MetropolisHastings;

/// Parameters of the target `p(x) = sum_k weights[k] N(x; means[k], covariances[k])`.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureTargetSpec {
    /// Dimension of the sample space.
    pub dim: usize,
    /// Number of mixture components, `K`.
    pub n_components: usize,
    pub means: Vec<DVector<f64>>,
    pub covariances: Vec<DMatrix<f64>>,
    pub weights: Vec<f64>,
}

impl MixtureTargetSpec {
    /// Validates the parameters and builds the mixture density.
    pub fn build(&self) -> Result<GaussianMixture, ConfigError> {
        if self.dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.n_components == 0 {
            return Err(ConfigError::NoComponents);
        }
        let counts = [
            ("means", self.means.len()),
            ("covariances", self.covariances.len()),
            ("weights", self.weights.len()),
        ];
        for (what, actual) in counts {
            if actual != self.n_components {
                return Err(ConfigError::ComponentCountMismatch {
                    what,
                    expected: self.n_components,
                    actual,
                });
            }
        }

        let normals = self
            .means
            .iter()
            .zip(&self.covariances)
            .enumerate()
            .map(|(k, (mean, cov))| {
                if mean.len() != self.dim {
                    return Err(ConfigError::DimensionMismatch {
                        what: format!("mean {k}"),
                        expected: self.dim,
                        actual: mean.len(),
                    });
                }
                MultivariateNormal::named(&format!("covariance {k}"), mean.clone(), cov.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        GaussianMixture::new(self.weights.clone(), normals)
    }
}

/// Covariance of the random-walk proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalSpec {
    pub covariance: DMatrix<f64>,
}

impl ProposalSpec {
    /// `variance * I` in `dim` dimensions.
    pub fn isotropic(dim: usize, variance: f64) -> Self {
        Self {
            covariance: DMatrix::identity(dim, dim) * variance,
        }
    }

    pub fn build(&self) -> Result<RandomWalkGaussian, ConfigError> {
        RandomWalkGaussian::new(self.covariance.clone())
    }
}

/**
Run-level settings: chain length, initial proposal centre and seed.

# Examples

```rust
use mixture_mh::config::{MixtureTargetSpec, ProposalSpec, SamplerConfig};
use nalgebra::{DMatrix, DVector};

let target = MixtureTargetSpec {
    dim: 2,
    n_components: 2,
    means: vec![DVector::from_vec(vec![4.0, 0.0]), DVector::from_vec(vec![-4.0, 0.0])],
    covariances: vec![
        DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 1.0]),
        DMatrix::identity(2, 2),
    ],
    weights: vec![0.4, 0.6],
};
let proposal = ProposalSpec::isotropic(2, 10.0);

let mh = SamplerConfig::new(5_000, vec![0.0, 0.0])
    .set_seed(42)
    .build(&target, &proposal)
    .unwrap();
assert_eq!(mh.num_samples(), 5_000);
assert_eq!(mh.seed, Some(42));
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub num_samples: usize,
    /// Centre of the proposal used for the initial draw only.
    pub proposal_mu: Vec<f64>,
    /// Fixed seed; `None` seeds from the thread RNG.
    pub seed: Option<u64>,
}

impl SamplerConfig {
    pub fn new(num_samples: usize, proposal_mu: Vec<f64>) -> Self {
        Self {
            num_samples,
            proposal_mu,
            seed: None,
        }
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates every part of the experiment and builds the sampler.
    pub fn build(
        &self,
        target: &MixtureTargetSpec,
        proposal: &ProposalSpec,
    ) -> Result<MetropolisHastings<GaussianMixture, RandomWalkGaussian>, ConfigError> {
        let mixture = target.build()?;
        let walk = proposal.build()?;
        if walk.cov().nrows() != target.dim {
            return Err(ConfigError::DimensionMismatch {
                what: "proposal covariance".to_string(),
                expected: target.dim,
                actual: walk.cov().nrows(),
            });
        }
        let mh = MetropolisHastings::new(mixture, walk, &self.proposal_mu, self.num_samples)?;
        Ok(match self.seed {
            Some(seed) => mh.set_seed(seed),
            None => mh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> MixtureTargetSpec {
        MixtureTargetSpec {
            dim: 2,
            n_components: 2,
            means: vec![
                DVector::from_vec(vec![4.0, 0.0]),
                DVector::from_vec(vec![-4.0, 0.0]),
            ],
            covariances: vec![
                DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 1.0]),
                DMatrix::identity(2, 2),
            ],
            weights: vec![0.4, 0.6],
        }
    }

    #[test]
    fn builds_valid_experiment() {
        let mh = SamplerConfig::new(100, vec![0.0, 0.0])
            .set_seed(3)
            .build(&spec(), &ProposalSpec::isotropic(2, 10.0))
            .unwrap();
        assert_eq!(mh.dim(), 2);
        assert_eq!(mh.target.n_components(), 2);
        assert_eq!(mh.proposal_mu(), &[0.0, 0.0]);
    }

    #[test]
    fn component_count_must_match_k() {
        let mut bad = spec();
        bad.n_components = 3;
        assert_eq!(
            bad.build(),
            Err(ConfigError::ComponentCountMismatch {
                what: "means",
                expected: 3,
                actual: 2
            })
        );

        let mut bad = spec();
        bad.weights.push(0.0);
        assert!(matches!(
            bad.build(),
            Err(ConfigError::ComponentCountMismatch { what: "weights", .. })
        ));
    }

    #[test]
    fn mean_length_must_match_dim() {
        let mut bad = spec();
        bad.means[1] = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            bad.build(),
            Err(ConfigError::DimensionMismatch { ref what, .. }) if what == "mean 1"
        ));
    }

    #[test]
    fn covariance_errors_name_the_component() {
        let mut bad = spec();
        bad.covariances[0] = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, 1.0]);
        assert_eq!(
            bad.build(),
            Err(ConfigError::NotPositiveDefinite {
                what: "covariance 0".to_string()
            })
        );

        let mut bad = spec();
        bad.covariances[1] = DMatrix::identity(3, 3);
        assert!(matches!(
            bad.build(),
            Err(ConfigError::NonSquareCovariance { dim: 2, .. })
        ));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut bad = spec();
        bad.weights = vec![0.4, 0.4];
        assert!(matches!(
            bad.build(),
            Err(ConfigError::WeightsNotNormalized { .. })
        ));
    }

    #[test]
    fn proposal_dimension_must_match() {
        let err = SamplerConfig::new(10, vec![0.0, 0.0])
            .build(&spec(), &ProposalSpec::isotropic(3, 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "proposal covariance".to_string(),
                expected: 2,
                actual: 3,
            }
        );

        let err = SamplerConfig::new(10, vec![0.0, 0.0])
            .build(&spec(), &ProposalSpec::isotropic(2, -1.0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotPositiveDefinite { .. }));
    }
}
