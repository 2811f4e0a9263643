//! Tests verifying the Metropolis-Hastings sampler on the two-mode 2D Gaussian mixture.
//!
//! We compare sample moments against the analytic mixture moments and check the run-level
//! invariants (length, acceptance bounds, reproducibility).

use mixture_mh::config::{MixtureTargetSpec, ProposalSpec, SamplerConfig};
use mixture_mh::distributions::{GaussianMixture, RandomWalkGaussian};
use mixture_mh::metropolis_hastings::MetropolisHastings;
use mixture_mh::stats::SampleSummary;
use nalgebra::{DMatrix, DVector};

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;

    fn target_spec() -> MixtureTargetSpec {
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

    fn sampler(
        num_samples: usize,
        seed: u64,
    ) -> MetropolisHastings<GaussianMixture, RandomWalkGaussian> {
        SamplerConfig::new(num_samples, vec![0.0, 0.0])
            .set_seed(seed)
            .build(&target_spec(), &ProposalSpec::isotropic(2, 10.0))
            .expect("valid configuration")
    }

    /// The reference run: 5000 samples, proposal 10 I, seed 42.
    #[test]
    fn reference_run_is_reproducible_with_low_acceptance() {
        let a = sampler(5_000, SEED).run().expect("run to complete");
        let b = sampler(5_000, SEED).run().expect("run to complete");

        assert_eq!(a.samples().nrows(), 5_000);
        assert_eq!(a.alphas().len(), 4_999);
        assert_eq!(a.samples(), b.samples());
        assert_eq!(a.accept_rate(), b.accept_rate());

        let rate = a.accept_rate();
        assert!(
            rate > 0.0 && rate < 0.5,
            "Expected a low acceptance rate, got {rate}"
        );
        assert!(a.accept_probs().iter().all(|r| (0.0..=1.0).contains(r)));
    }

    /// Checks that a long chain reproduces the mean and covariance of the mixture.
    #[test]
    fn long_chain_matches_mixture_moments() {
        const SAMPLE_SIZE: usize = 200_000;

        let mh = sampler(SAMPLE_SIZE, SEED);
        let mixture = mh.target.clone();
        let chain = mh.run().expect("run to complete");
        let summary = SampleSummary::from_samples(chain.samples()).expect("enough samples");

        let mean_err = summary
            .mean_error(&mixture.mean())
            .expect("matching dimension");
        assert!(mean_err < 0.5, "Mean deviation too large: {mean_err}");

        // Var(x0) is about 17.3, dominated by the separation of the modes.
        let cov_err = summary
            .cov_error(&mixture.covariance())
            .expect("matching dimension");
        assert!(cov_err < 2.0, "Covariance deviation too large: {cov_err}");

        // Both modes are visited in roughly their mixing proportions.
        let right = chain.samples().column(0).iter().filter(|&&x| x > 0.0).count();
        let share = right as f64 / SAMPLE_SIZE as f64;
        assert!(
            (share - 0.4).abs() < 0.1,
            "Share of samples in the right mode: {share}"
        );
    }

    /// A chain run on a single wrong Gaussian must not reproduce the mixture's covariance.
    #[test]
    fn single_gaussian_does_not_match_mixture() {
        const SAMPLE_SIZE: usize = 20_000;

        let wrong = MixtureTargetSpec {
            dim: 2,
            n_components: 1,
            means: vec![DVector::from_vec(vec![-0.8, 0.0])],
            covariances: vec![DMatrix::identity(2, 2)],
            weights: vec![1.0],
        };
        let chain = SamplerConfig::new(SAMPLE_SIZE, vec![0.0, 0.0])
            .set_seed(SEED)
            .build(&wrong, &ProposalSpec::isotropic(2, 2.0))
            .expect("valid configuration")
            .run()
            .expect("run to complete");

        let summary = SampleSummary::from_samples(chain.samples()).expect("enough samples");
        let mixture = target_spec().build().expect("valid mixture");
        let cov_err = summary
            .cov_error(&mixture.covariance())
            .expect("matching dimension");
        assert!(
            cov_err > 5.0,
            "Covariance of the wrong target is unexpectedly close: {cov_err}"
        );
    }

    #[test]
    fn different_seeds_give_different_chains() {
        let a = sampler(500, 1).run().expect("run to complete");
        let b = sampler(500, 2).run().expect("run to complete");
        assert_ne!(a.samples(), b.samples());
    }
}
