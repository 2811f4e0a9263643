/*!
# Metropolis–Hastings Sampler.

This module implements a Metropolis–Hastings sampler that works with any target density `D` and
proposal `Q` implementing the [`Target`] and [`Proposal`] traits. The chain's first state is drawn
from the proposal centred at a user-supplied `proposal_mu`; every later proposal is centred at the
current state.

## Overview

- **Target (`D`)**: log-density of the distribution to sample, via [`Target`].
- **Proposal (`Q`)**: candidate generation and `q(x; center)`, via [`Proposal`].
- **Chain**: [`MHMarkovChain`] performs single transitions.
- **Sampler**: [`MetropolisHastings`] owns the configuration, seeds the random stream and fills a
  [`ChainState`] with exactly `num_samples` states.
- **Reproducibility**: [`MetropolisHastings::seed`] fixes the random stream of a run.

## Example Usage

```rust
use mixture_mh::distributions::{GaussianMixture, MultivariateNormal, RandomWalkGaussian};
use mixture_mh::metropolis_hastings::MetropolisHastings;
use nalgebra::{DMatrix, DVector};

let target = GaussianMixture::new(
    vec![1.0],
    vec![MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap()],
)
.unwrap();
let proposal = RandomWalkGaussian::isotropic(2, 1.0).unwrap();

let mh = MetropolisHastings::new(target, proposal, &[0.0, 0.0], 1_000)
    .unwrap()
    .set_seed(42);
let chain = mh.run().unwrap();

assert_eq!(chain.samples().nrows(), 1_000);
assert_eq!(chain.alphas().len(), 999);
assert!((0.0..=1.0).contains(&chain.accept_rate()));
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::core::{
    run_chain, run_chain_progress, CancelToken, ChainState, MarkovChain, RandomSource, StepRecord,
};
use crate::distributions::{Proposal, Target};
use crate::error::{ConfigError, NumericalError, RunError, SamplerError};

/// `ln alpha` for one step, with the zero-density policy applied.
///
/// * `p(current) > 0`: the usual `[ln q(curr | new) - ln q(new | curr)] + [ln p(new) - ln p(curr)]`.
/// * `p(current) == 0`, `p(proposed) > 0`: `+inf`, the move is always taken.
/// * both zero: [`NumericalError::DegenerateRatio`].
pub fn log_hastings_ratio(
    step: usize,
    current_lp: f64,
    proposed_lp: f64,
    log_q_forward: f64,
    log_q_backward: f64,
) -> Result<f64, NumericalError> {
    if current_lp == f64::NEG_INFINITY {
        if proposed_lp > f64::NEG_INFINITY {
            warn!(step, "current state has zero target density; accepting proposal");
            return Ok(f64::INFINITY);
        }
        return Err(NumericalError::DegenerateRatio { step });
    }
    let log_alpha = (log_q_backward - log_q_forward) + (proposed_lp - current_lp);
    if log_alpha.is_nan() {
        return Err(NumericalError::NonFinite {
            what: "Hastings ratio",
            value: log_alpha,
        });
    }
    Ok(log_alpha)
}

/// A single Metropolis–Hastings chain.
///
/// Holds the target and proposal, the current state and the random stream it draws from.
#[derive(Debug, Clone)]
pub struct MHMarkovChain<D, Q, R = SmallRng> {
    /// The target distribution to sample from.
    pub target: D,
    /// The proposal distribution used to generate candidate states.
    pub proposal: Q,
    current_state: Vec<f64>,
    rng: R,
    steps: usize,
}

impl<D, Q, R> MHMarkovChain<D, Q, R>
where
    D: Target,
    Q: Proposal,
    R: RandomSource,
{
    /**
    Creates a chain positioned at `initial_state`.

    # Examples

    ```rust
    use mixture_mh::core::MarkovChain;
    use mixture_mh::distributions::{MultivariateNormal, RandomWalkGaussian};
    use mixture_mh::metropolis_hastings::MHMarkovChain;
    use nalgebra::{DMatrix, DVector};
    use rand::{rngs::SmallRng, SeedableRng};

    let target = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
    let proposal = RandomWalkGaussian::isotropic(2, 0.5).unwrap();
    let rng = SmallRng::seed_from_u64(1);
    let mut chain = MHMarkovChain::new(target, proposal, vec![1.0, 1.0], rng);

    let record = chain.step().unwrap();
    assert!((0.0..=1.0).contains(&record.accept_prob));
    assert_eq!(chain.current_state().len(), 2);
    ```
    */
    pub fn new(target: D, proposal: Q, initial_state: Vec<f64>, rng: R) -> Self {
        Self {
            target,
            proposal,
            current_state: initial_state,
            rng,
            steps: 0,
        }
    }
}

impl<D, Q, R> MarkovChain for MHMarkovChain<D, Q, R>
where
    D: Target,
    Q: Proposal,
    R: RandomSource,
{
    /**
    Performs one Metropolis–Hastings update.

    A candidate `x'` is drawn from `q(.; x)`. The Hastings ratio is evaluated in log space,

    \[
    \ln \alpha = \left[\ln q(x \mid x') - \ln q(x' \mid x)\right] + \left[\ln p(x') - \ln p(x)\right],
    \]

    and `x'` is accepted when a `Uniform[0, 1)` draw `u` satisfies `u <= min(1, alpha)`.
    On rejection the current state is kept unchanged.
    */
    fn step(&mut self) -> Result<StepRecord, NumericalError> {
        let proposed = self.proposal.sample(&self.current_state, &mut self.rng);

        let current_lp = self.target.ln_pdf(&self.current_state)?;
        let proposed_lp = self.target.ln_pdf(&proposed)?;

        // q(x' | x) and q(x | x')
        let log_q_forward = self.proposal.ln_pdf(&proposed, &self.current_state)?;
        let log_q_backward = self.proposal.ln_pdf(&self.current_state, &proposed)?;

        let log_alpha = log_hastings_ratio(
            self.steps,
            current_lp,
            proposed_lp,
            log_q_forward,
            log_q_backward,
        )?;
        let accept_prob = log_alpha.min(0.0).exp();

        let u = self.rng.uniform();
        let accepted = u <= accept_prob;
        if accepted {
            self.current_state = proposed;
        }
        self.steps += 1;

        Ok(StepRecord {
            alpha: log_alpha.exp(),
            accept_prob,
            accepted,
        })
    }

    fn current_state(&self) -> &[f64] {
        &self.current_state
    }
}

/**
The Metropolis–Hastings sampler.

Owns a target `D`, a proposal `Q`, the initial proposal centre and the random stream `R`. Running it
produces a [`ChainState`] with exactly `num_samples` states: the initial draw from
`q(.; proposal_mu)` followed by `num_samples - 1` transitions.

# Examples

```rust
use mixture_mh::distributions::{MultivariateNormal, RandomWalkGaussian};
use mixture_mh::metropolis_hastings::MetropolisHastings;
use nalgebra::{DMatrix, DVector};

let target = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
let proposal = RandomWalkGaussian::isotropic(2, 1.0).unwrap();
let a = MetropolisHastings::new(target.clone(), proposal.clone(), &[0.0, 0.0], 200)
    .unwrap()
    .set_seed(7)
    .run()
    .unwrap();
let b = MetropolisHastings::new(target, proposal, &[0.0, 0.0], 200)
    .unwrap()
    .set_seed(7)
    .run()
    .unwrap();
assert_eq!(a.samples(), b.samples());
```
*/
#[derive(Debug, Clone)]
pub struct MetropolisHastings<D, Q, R = SmallRng> {
    /// The target distribution we want to sample from.
    pub target: D,
    /// The proposal distribution used to generate candidate states.
    pub proposal: Q,
    proposal_mu: Vec<f64>,
    num_samples: usize,
    rng: R,
    /// The seed of `rng`, if it was seeded through [`MetropolisHastings::seed`].
    pub seed: Option<u64>,
}

impl<D, Q> MetropolisHastings<D, Q, SmallRng>
where
    D: Target,
    Q: Proposal,
{
    /**
    Creates a sampler drawing `num_samples` states.

    The random stream is seeded from the thread RNG; call [`MetropolisHastings::seed`] for a
    reproducible run.

    # Errors

    [`ConfigError`] if `num_samples` is zero, the target and proposal disagree on the dimension,
    or `proposal_mu` has the wrong length.
    */
    pub fn new(
        target: D,
        proposal: Q,
        proposal_mu: &[f64],
        num_samples: usize,
    ) -> Result<Self, ConfigError> {
        let seed = thread_rng().gen::<u64>();
        let mut mh = Self::with_rng(
            target,
            proposal,
            proposal_mu,
            num_samples,
            SmallRng::seed_from_u64(seed),
        )?;
        mh.seed = None;
        Ok(mh)
    }

    /// Reseeds the random stream, making the run reproducible.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

impl<D, Q, R> MetropolisHastings<D, Q, R>
where
    D: Target,
    Q: Proposal,
    R: RandomSource,
{
    /// Creates a sampler drawing from an explicit random stream.
    pub fn with_rng(
        target: D,
        proposal: Q,
        proposal_mu: &[f64],
        num_samples: usize,
        rng: R,
    ) -> Result<Self, ConfigError> {
        let dim = target.dim();
        if dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if num_samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if proposal.dim() != dim {
            return Err(ConfigError::DimensionMismatch {
                what: "proposal".to_string(),
                expected: dim,
                actual: proposal.dim(),
            });
        }
        if proposal_mu.len() != dim {
            return Err(ConfigError::DimensionMismatch {
                what: "proposal_mu".to_string(),
                expected: dim,
                actual: proposal_mu.len(),
            });
        }
        Ok(Self {
            target,
            proposal,
            proposal_mu: proposal_mu.to_vec(),
            num_samples,
            rng,
            seed: None,
        })
    }

    pub fn dim(&self) -> usize {
        self.target.dim()
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn proposal_mu(&self) -> &[f64] {
        &self.proposal_mu
    }

    /// Runs the chain to completion.
    ///
    /// # Errors
    ///
    /// [`RunError`] if a density evaluation fails; it carries the states written so far.
    pub fn run(self) -> Result<ChainState, RunError> {
        self.run_inner(None, None)
    }

    /// Runs the chain, checking `cancel` before every step.
    pub fn run_cancellable(self, cancel: &CancelToken) -> Result<ChainState, RunError> {
        self.run_inner(Some(cancel), None)
    }

    /**
    Runs the chain with a progress bar showing the running acceptance rate.

    Uses [`indicatif`] and otherwise behaves like [`MetropolisHastings::run`].
    */
    pub fn run_progress(self) -> Result<ChainState, RunError> {
        let pb = ProgressBar::new(self.num_samples as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        let result = self.run_inner(None, Some(&pb));
        match &result {
            Ok(_) => pb.finish_with_message("Done!"),
            Err(_) => pb.abandon_with_message("Aborted"),
        }
        result
    }

    fn run_inner(
        self,
        cancel: Option<&CancelToken>,
        pb: Option<&ProgressBar>,
    ) -> Result<ChainState, RunError> {
        let Self {
            target,
            proposal,
            proposal_mu,
            num_samples,
            mut rng,
            seed,
        } = self;
        let dim = target.dim();
        debug!(dim, num_samples, ?seed, "starting Metropolis-Hastings run");

        let initial_state = proposal.sample(&proposal_mu, &mut rng);
        let mut chain = MHMarkovChain::new(target, proposal, initial_state, rng);
        let mut state = ChainState::new(num_samples, dim);

        let outcome = match pb {
            Some(pb) => run_chain_progress(&mut chain, &mut state, cancel, pb),
            None => run_chain(&mut chain, &mut state, cancel),
        };

        match outcome {
            Ok(()) => {
                info!(
                    accept_rate = state.accept_rate(),
                    accepted = state.accept_count(),
                    num_samples,
                    "MH acceptance ratio"
                );
                Ok(state)
            }
            Err(source) => {
                warn!(
                    filled = state.filled(),
                    num_samples,
                    error = %source,
                    "Metropolis-Hastings run stopped early"
                );
                Err(RunError {
                    source,
                    partial: state,
                })
            }
        }
    }
}
