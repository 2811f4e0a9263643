//! # Mixture MH
//!
//! Metropolis–Hastings sampling of multivariate Gaussian mixture densities using a symmetric
//! Gaussian random-walk proposal.
//!
//! The target `p(x) = sum_k w_k N(x; mu_k, Sigma_k)` is evaluated in closed form; the chain draws
//! its first state from the proposal centred at `proposal_mu` and then performs
//! `num_samples - 1` accept/reject steps, recording the Hastings ratio of each.
//!
//! ## Example: a two-mode mixture in 2D
//!
//! ```rust
//! use mixture_mh::config::{MixtureTargetSpec, ProposalSpec, SamplerConfig};
//! use nalgebra::{DMatrix, DVector};
//!
//! let target = MixtureTargetSpec {
//!     dim: 2,
//!     n_components: 2,
//!     means: vec![DVector::from_vec(vec![4.0, 0.0]), DVector::from_vec(vec![-4.0, 0.0])],
//!     covariances: vec![
//!         DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 1.0]),
//!         DMatrix::identity(2, 2),
//!     ],
//!     weights: vec![0.4, 0.6],
//! };
//! let proposal = ProposalSpec::isotropic(2, 10.0);
//!
//! let sampler = SamplerConfig::new(5_000, vec![0.0, 0.0])
//!     .set_seed(42)
//!     .build(&target, &proposal)
//!     .expect("valid configuration");
//! let chain = sampler.run().expect("run to complete");
//!
//! assert_eq!(chain.samples().shape(), &[5_000, 2]);
//! println!("MH acceptance ratio: {:.3}", chain.accept_rate());
//! ```
//!
//! ## Features
//!
//! - `csv`: enables [`io::csv`] for writing trajectories and per-step diagnostics.

pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
pub mod io;
pub mod metropolis_hastings;
pub mod stats;

pub use crate::core::{CancelToken, ChainState};
pub use crate::error::{ConfigError, NumericalError, RunError, SamplerError};
pub use crate::metropolis_hastings::MetropolisHastings;
