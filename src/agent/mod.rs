//! # Reinforcement Learning Agents Module
//!
//! Three agents driven by the same external loop: the driver calls `act`
//! with the current state, executes the action in its environment, and calls
//! `learn` with the reward that followed.
//!
//! ## Available Agents
//!
//! - **DpAgent**: Value iteration over a known finite MDP
//!   - Synchronous sweeps, greedy improvement with tie sharing
//! - **TdAgent**: Tabular Q-learning / SARSA
//!   - Optional eligibility traces (replacing or accumulating)
//!   - Optional Dyna-style prioritized sweeping
//! - **DqnAgent**: Q-learning with a two-layer tanh network
//!   - Epsilon-greedy exploration
//!   - Fixed-capacity experience replay
//!
//! ## Example Usage
//!
//! ```rust
//! use reinforce::agent::TdAgent;
//! use reinforce::config::TdOptions;
//! use reinforce::environment::Environment;
//!
//! struct Chain;
//! impl Environment for Chain {
//!     fn num_states(&self) -> usize { 3 }
//!     fn max_num_actions(&self) -> usize { 2 }
//!     fn allowed_actions(&self, _s: usize) -> Vec<usize> { vec![0, 1] }
//! }
//!
//! let mut agent = TdAgent::new(Chain, TdOptions::default(), Some(1)).unwrap();
//! let mut state = 0;
//! for _ in 0..100 {
//!     let action = agent.act(state).unwrap();
//!     let (next, reward) = if action == 1 { ((state + 1) % 3, 1.0) } else { (state, 0.0) };
//!     agent.learn(reward).unwrap();
//!     state = next;
//! }
//! ```

pub mod traits;

mod dp;
mod dqn;
mod td;

pub use dp::DpAgent;
pub use dqn::{DqnAgent, DqnAgentBuilder, DqnModel};
pub use td::TdAgent;
pub use traits::Agent;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::environment::Environment;
use crate::error::{ReinforceError, Result};

/// Seeded generator for reproducible runs, entropy-seeded otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Allowed actions at `state`, rejecting ids outside the action table.
pub(crate) fn checked_actions<E: Environment + ?Sized>(env: &E, state: usize, num_actions: usize) -> Result<Vec<usize>> {
    let poss = env.allowed_actions(state);
    if let Some(&bad) = poss.iter().find(|&&a| a >= num_actions) {
        return Err(ReinforceError::OutOfRange {
            index: bad,
            len: num_actions,
        });
    }
    Ok(poss)
}
