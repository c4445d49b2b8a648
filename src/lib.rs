//! # Reinforce - Tabular and Neural Reinforcement Learning
//!
//! Reinforce is a small reinforcement learning library built on a
//! reverse-mode automatic differentiation tape over dense `f64` matrices.
//! It provides three agents that share one driving loop: the caller asks the
//! agent for an action, executes it in its own environment, and reports the
//! resulting reward.
//!
//! ## Key Features
//!
//! - **Autodiff**: Matrix operations recorded on a tape and replayed in reverse
//! - **Dynamic Programming**: Value iteration over a known model
//! - **Temporal Difference**: Q-learning / SARSA with eligibility traces and
//!   prioritized Dyna-style planning
//! - **Deep Q-Network**: Two-layer network with experience replay and
//!   TD-error clamping
//! - **Update Rules**: Plain SGD and an RMSProp-style solver with clipping
//!
//! ## Quick Start
//!
//! ```rust
//! use reinforce::agent::DpAgent;
//! use reinforce::config::DpOptions;
//! use reinforce::environment::{Environment, ModelEnvironment};
//!
//! // Two states; action 1 in state 0 pays 1 and moves to state 1.
//! struct Step;
//! impl Environment for Step {
//!     fn num_states(&self) -> usize { 2 }
//!     fn max_num_actions(&self) -> usize { 2 }
//!     fn allowed_actions(&self, _s: usize) -> Vec<usize> { vec![0, 1] }
//! }
//! impl ModelEnvironment for Step {
//!     fn next_state(&self, s: usize, a: usize) -> usize { if s == 0 && a == 1 { 1 } else { s } }
//!     fn reward(&self, s: usize, a: usize, _ns: usize) -> f64 { if s == 0 && a == 1 { 1.0 } else { 0.0 } }
//! }
//!
//! let mut agent = DpAgent::new(Step, DpOptions::default(), Some(0)).unwrap();
//! agent.sweep_until(1e-9, 1000).unwrap();
//! assert_eq!(agent.act(0).unwrap(), 1);
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - DP, TD and DQN agents plus the [`agent::Agent`] trait
//! - [`config`] - Serde-backed option structs with defaults and validation
//! - [`debug`] - Finite-difference gradient checks and numerical scans
//! - [`environment`] - Traits the agents consume
//! - [`error`] - Error types and result handling
//! - [`graph`] - The autodiff tape
//! - [`mat`] - Dense matrix with a gradient buffer
//! - [`net`] - Ordered named parameter collections
//! - [`optimizer`] - Update rules and gradient clipping
//! - [`replay_buffer`] - Experience replay for DQN
//! - [`sampling`] - Weighted and uniform index draws

pub mod agent;
pub mod config;
pub mod debug;
pub mod environment;
pub mod error;
pub mod graph;
pub mod mat;
pub mod net;
pub mod optimizer;
pub mod replay_buffer;
pub mod sampling;

#[cfg(test)]
mod tests;
