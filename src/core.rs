/*!
# Core MCMC Utilities.

This module provides the building blocks shared by the samplers:
- The [`MarkovChain`] trait, which abstracts a single chain that advances one step at a time.
- The [`RandomSource`] trait, the two random capabilities a chain needs (standard-normal and
  uniform draws). Every [`rand::Rng`] implements it, so a seeded [`rand::rngs::SmallRng`] makes
  runs reproducible.
- [`ChainState`], the trajectory container filled index by index while a chain runs.
- [`CancelToken`], a cooperative cancellation flag checked between steps.
- [`run_chain`] and [`run_chain_progress`] for driving a chain until its [`ChainState`] is full.
*/

use indicatif::ProgressBar;
use nalgebra::{DMatrix, DVector};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{NumericalError, SamplerError};

/// Bookkeeping for one Metropolis-Hastings transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// The Hastings ratio `q(x | x') p(x') / (q(x' | x) p(x))`. May be `+inf`.
    pub alpha: f64,
    /// `min(1, alpha)`.
    pub accept_prob: f64,
    /// Whether the proposed state was taken.
    pub accepted: bool,
}

/// A trait that abstracts a single MCMC chain.
pub trait MarkovChain {
    /// Performs one transition and reports how it went.
    fn step(&mut self) -> Result<StepRecord, NumericalError>;

    /// Returns the current state of the chain without advancing it.
    fn current_state(&self) -> &[f64];
}

/// Source of the random draws a chain consumes.
pub trait RandomSource {
    /// One draw from `N(0, 1)`.
    fn standard_normal(&mut self) -> f64;

    /// One draw from `Uniform[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// One draw from `N(mean, L L^T)` given the lower Cholesky factor `L`.
    fn multivariate_normal(&mut self, mean: &[f64], chol_l: &DMatrix<f64>) -> Vec<f64> {
        let z = DVector::from_fn(chol_l.ncols(), |_, _| self.standard_normal());
        let x = chol_l * z + DVector::from_column_slice(mean);
        x.as_slice().to_vec()
    }
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn standard_normal(&mut self) -> f64 {
        self.sample(StandardNormal)
    }

    fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Cooperative cancellation flag shared between a running chain and its owner.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the chain stop before its next step.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/**
The trajectory of a single chain together with its per-step diagnostics.

Storage for all `num_samples` states is allocated up front. States are written strictly in
increasing index order; the accessors only ever expose the written prefix, which is always a valid
partial result on its own.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    samples: Array2<f64>,
    alphas: Array1<f64>,
    accept_probs: Array1<f64>,
    accepted: Vec<bool>,
    accept_count: usize,
    filled: usize,
}

impl ChainState {
    /// Creates an empty chain with room for `num_samples` states of dimension `dim`.
    pub fn new(num_samples: usize, dim: usize) -> Self {
        let n_steps = num_samples.saturating_sub(1);
        Self {
            samples: Array2::zeros((num_samples, dim)),
            alphas: Array1::zeros(n_steps),
            accept_probs: Array1::zeros(n_steps),
            accepted: Vec::with_capacity(n_steps),
            accept_count: 0,
            filled: 0,
        }
    }

    /// Writes the initial state into index 0.
    pub(crate) fn push_initial(&mut self, state: &[f64]) {
        debug_assert_eq!(self.filled, 0);
        self.samples.row_mut(0).assign(&ArrayView1::from(state));
        self.filled = 1;
    }

    /// Writes the state produced by step `filled - 1` and its diagnostics.
    pub(crate) fn push_step(&mut self, state: &[f64], record: StepRecord) {
        let step = self.filled - 1;
        self.samples
            .row_mut(self.filled)
            .assign(&ArrayView1::from(state));
        self.alphas[step] = record.alpha;
        self.accept_probs[step] = record.accept_prob;
        self.accepted.push(record.accepted);
        if record.accepted {
            self.accept_count += 1;
        }
        self.filled += 1;
    }

    /// The written states, one per row.
    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.slice(s![..self.filled, ..])
    }

    /// Consumes the chain and returns the written states as an owned matrix.
    pub fn into_samples(self) -> Array2<f64> {
        if self.is_complete() {
            self.samples
        } else {
            self.samples.slice(s![..self.filled, ..]).to_owned()
        }
    }

    /// Hastings ratio of every performed step.
    pub fn alphas(&self) -> ArrayView1<'_, f64> {
        self.alphas.slice(s![..self.steps()])
    }

    /// Acceptance probability `min(1, alpha)` of every performed step.
    pub fn accept_probs(&self) -> ArrayView1<'_, f64> {
        self.accept_probs.slice(s![..self.steps()])
    }

    /// Accept flag of every performed step.
    pub fn accepted(&self) -> &[bool] {
        &self.accepted
    }

    pub fn accept_count(&self) -> usize {
        self.accept_count
    }

    /// Accepted proposals divided by `num_samples`.
    pub fn accept_rate(&self) -> f64 {
        if self.num_samples() == 0 {
            return 0.0;
        }
        self.accept_count as f64 / self.num_samples() as f64
    }

    /// The most recently written state.
    pub fn last(&self) -> Option<ArrayView1<'_, f64>> {
        self.filled.checked_sub(1).map(|i| self.samples.row(i))
    }

    /// Number of states written so far.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Number of transitions performed so far.
    pub fn steps(&self) -> usize {
        self.filled.saturating_sub(1)
    }

    pub fn num_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn dim(&self) -> usize {
        self.samples.ncols()
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.num_samples()
    }
}

fn drive<M, F>(
    chain: &mut M,
    state: &mut ChainState,
    cancel: Option<&CancelToken>,
    mut on_step: F,
) -> Result<(), SamplerError>
where
    M: MarkovChain,
    F: FnMut(&ChainState),
{
    if state.filled() == 0 && state.num_samples() > 0 {
        state.push_initial(chain.current_state());
        on_step(state);
    }
    while !state.is_complete() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SamplerError::Cancelled {
                filled: state.filled(),
            });
        }
        let record = chain.step()?;
        state.push_step(chain.current_state(), record);
        on_step(state);
    }
    Ok(())
}

/// Runs `chain` until `state` is full.
///
/// If `state` is empty, the chain's current state becomes index 0. On error `state` keeps every
/// state written before the failure.
pub fn run_chain<M: MarkovChain>(
    chain: &mut M,
    state: &mut ChainState,
    cancel: Option<&CancelToken>,
) -> Result<(), SamplerError> {
    drive(chain, state, cancel, |_| {})
}

/// Like [`run_chain`], reporting position and running acceptance rate on `pb`.
///
/// The bar is refreshed at most every 500 milliseconds and once more on the last state.
pub fn run_chain_progress<M: MarkovChain>(
    chain: &mut M,
    state: &mut ChainState,
    cancel: Option<&CancelToken>,
    pb: &ProgressBar,
) -> Result<(), SamplerError> {
    const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

    pb.set_length(state.num_samples() as u64);
    let mut last_update = Instant::now();
    drive(chain, state, cancel, |state| {
        if last_update.elapsed() >= UPDATE_INTERVAL || state.is_complete() {
            let accept_rate = state.accept_count() as f64 / state.steps().max(1) as f64;
            pb.set_position(state.filled() as u64);
            pb.set_message(format!("AcceptRate={:.3}", accept_rate));
            last_update = Instant::now();
        }
    })
}
