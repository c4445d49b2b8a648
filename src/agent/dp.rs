use log::debug;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

use super::{checked_actions, make_rng, traits::Agent};
use crate::config::DpOptions;
use crate::environment::ModelEnvironment;
use crate::error::{ReinforceError, Result};
use crate::sampling::sample_weighted;

/// Dynamic programming agent: value iteration over a known finite MDP.
///
/// Each [`learn`](DpAgent::learn) call runs one synchronous policy evaluation
/// sweep followed by greedy policy improvement. The agent never learns from
/// experience; it needs the environment's transition and reward functions.
///
/// # Example
///
/// ```rust
/// use reinforce::agent::DpAgent;
/// use reinforce::config::DpOptions;
/// use reinforce::environment::{Environment, ModelEnvironment};
///
/// struct Loop;
/// impl Environment for Loop {
///     fn num_states(&self) -> usize { 1 }
///     fn max_num_actions(&self) -> usize { 2 }
///     fn allowed_actions(&self, _s: usize) -> Vec<usize> { vec![0, 1] }
/// }
/// impl ModelEnvironment for Loop {
///     fn next_state(&self, _s: usize, _a: usize) -> usize { 0 }
///     fn reward(&self, _s: usize, a: usize, _ns: usize) -> f64 { a as f64 }
/// }
///
/// let mut agent = DpAgent::new(Loop, DpOptions { gamma: 0.5 }, Some(7)).unwrap();
/// agent.sweep_until(1e-9, 1000).unwrap();
/// assert!((agent.value(0) - 2.0).abs() < 1e-6);
/// assert_eq!(agent.act(0).unwrap(), 1);
/// ```
pub struct DpAgent<E: ModelEnvironment> {
    env: E,
    options: DpOptions,
    num_states: usize,
    num_actions: usize,
    /// State value function V(s)
    values: Array1<f64>,
    /// Policy distribution π(a|s), indexed `[[s, a]]`
    policy: Array2<f64>,
    rng: StdRng,
}

impl<E: ModelEnvironment> DpAgent<E> {
    pub fn new(env: E, options: DpOptions, seed: Option<u64>) -> Result<Self> {
        options.validate()?;
        let mut agent = DpAgent {
            env,
            options,
            num_states: 0,
            num_actions: 0,
            values: Array1::zeros(0),
            policy: Array2::zeros((0, 0)),
            rng: make_rng(seed),
        };
        agent.reset()?;
        Ok(agent)
    }

    /// Zero the value function and install a uniform policy over each state's
    /// allowed actions.
    pub fn reset(&mut self) -> Result<()> {
        self.num_states = self.env.num_states();
        self.num_actions = self.env.max_num_actions();
        self.values = Array1::zeros(self.num_states);
        self.policy = Array2::zeros((self.num_states, self.num_actions));
        for s in 0..self.num_states {
            let poss = checked_actions(&self.env, s, self.num_actions)?;
            let p = 1.0 / poss.len() as f64;
            for a in poss {
                self.policy[[s, a]] = p;
            }
        }
        Ok(())
    }

    /// Sample an action from the current policy at `state`.
    pub fn act(&mut self, state: usize) -> Result<usize> {
        self.check_state(state)?;
        let poss = checked_actions(&self.env, state, self.num_actions)?;
        if poss.is_empty() {
            return Err(ReinforceError::NoAllowedActions { state });
        }
        let probs: Vec<f64> = poss.iter().map(|&a| self.policy[[state, a]]).collect();
        let i = sample_weighted(&probs, &mut self.rng)?;
        Ok(poss[i])
    }

    /// One round of value iteration: evaluate, then improve.
    pub fn learn(&mut self) -> Result<()> {
        let delta = self.evaluate_policy()?;
        self.update_policy()?;
        debug!("value iteration sweep, max |dV| = {:.6}", delta);
        Ok(())
    }

    /// Synchronous evaluation of the current stochastic policy. All new values
    /// are computed from the previous sweep and swapped in together. Returns
    /// the largest absolute change.
    pub fn evaluate_policy(&mut self) -> Result<f64> {
        let gamma = self.options.gamma;
        let mut new_values = Array1::zeros(self.num_states);
        for s in 0..self.num_states {
            let mut v = 0.0;
            for a in checked_actions(&self.env, s, self.num_actions)? {
                let prob = self.policy[[s, a]];
                if prob == 0.0 {
                    continue;
                }
                let ns = self.successor(s, a)?;
                let r = self.env.reward(s, a, ns);
                v += prob * (r + gamma * self.values[ns]);
            }
            new_values[s] = v;
        }
        let delta = new_values
            .iter()
            .zip(self.values.iter())
            .map(|(a, b): (&f64, &f64)| (a - b).abs())
            .fold(0.0, f64::max);
        self.values = new_values;
        Ok(delta)
    }

    /// Make the policy greedy with respect to the current value function,
    /// sharing probability equally among tied actions.
    pub fn update_policy(&mut self) -> Result<()> {
        let gamma = self.options.gamma;
        for s in 0..self.num_states {
            let poss = checked_actions(&self.env, s, self.num_actions)?;
            let mut vs = Vec::with_capacity(poss.len());
            let mut vmax = f64::NEG_INFINITY;
            let mut nmax = 0usize;
            for (i, &a) in poss.iter().enumerate() {
                let ns = self.successor(s, a)?;
                let v = self.env.reward(s, a, ns) + gamma * self.values[ns];
                vs.push(v);
                if i == 0 || v > vmax {
                    vmax = v;
                    nmax = 1;
                } else if v == vmax {
                    nmax += 1;
                }
            }
            for (&a, &v) in poss.iter().zip(vs.iter()) {
                self.policy[[s, a]] = if v == vmax { 1.0 / nmax as f64 } else { 0.0 };
            }
        }
        Ok(())
    }

    /// Run sweeps until the value function moves by at most `tolerance` or
    /// `max_sweeps` is reached. Returns the number of sweeps run.
    pub fn sweep_until(&mut self, tolerance: f64, max_sweeps: usize) -> Result<usize> {
        for sweep in 1..=max_sweeps {
            let delta = self.evaluate_policy()?;
            self.update_policy()?;
            if delta <= tolerance {
                debug!("value iteration converged after {} sweeps", sweep);
                return Ok(sweep);
            }
        }
        Ok(max_sweeps)
    }

    pub fn value(&self, state: usize) -> f64 {
        self.values[state]
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn policy(&self, state: usize, action: usize) -> f64 {
        self.policy[[state, action]]
    }

    pub fn options(&self) -> &DpOptions {
        &self.options
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    fn successor(&self, state: usize, action: usize) -> Result<usize> {
        let ns = self.env.next_state(state, action);
        if ns >= self.num_states {
            return Err(ReinforceError::OutOfRange {
                index: ns,
                len: self.num_states,
            });
        }
        Ok(ns)
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.num_states {
            return Err(ReinforceError::OutOfRange {
                index: state,
                len: self.num_states,
            });
        }
        Ok(())
    }
}

impl<E: ModelEnvironment> Agent for DpAgent<E> {
    type State = usize;

    fn reset(&mut self) -> Result<()> {
        DpAgent::reset(self)
    }

    fn act(&mut self, state: &usize) -> Result<usize> {
        DpAgent::act(self, *state)
    }

    /// The reward is ignored: value iteration plans from the model.
    fn learn(&mut self, _reward: f64) -> Result<()> {
        DpAgent::learn(self)
    }
}
