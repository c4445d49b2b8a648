//! # Agent Configuration
//!
//! Options structs for the three agents. Every field has a default, so a JSON
//! document only needs the keys it overrides:
//!
//! ```rust
//! use reinforce::config::{TdOptions, UpdateRule};
//!
//! let opts = TdOptions::from_json(r#"{ "update": "sarsa", "lambda": 0.7 }"#).unwrap();
//! assert_eq!(opts.update, UpdateRule::Sarsa);
//! assert_eq!(opts.gamma, 0.75);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ReinforceError, Result};

/// Which bootstrap target a TD agent learns toward.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UpdateRule {
    /// Off-policy: `r + γ·max_a' Q(s', a')`
    #[default]
    #[serde(rename = "qlearn")]
    QLearning,
    /// On-policy: `r + γ·Q(s', a')`
    #[serde(rename = "sarsa")]
    Sarsa,
}

/// How a visited pair's eligibility is bumped.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    /// Set to 1
    #[default]
    Replacing,
    /// Incremented by 1
    Accumulating,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DpOptions {
    /// Future reward discount factor, in [0, 1)
    pub gamma: f64,
}

impl Default for DpOptions {
    fn default() -> Self {
        DpOptions { gamma: 0.75 }
    }
}

impl DpOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("gamma", self.gamma, false)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TdOptions {
    pub update: UpdateRule,
    pub gamma: f64,
    /// Probability of a uniformly random action
    pub epsilon: f64,
    /// Value function learning rate
    pub alpha: f64,
    /// Blend the policy toward the greedy target instead of replacing it
    pub smooth_policy_update: bool,
    /// Policy blend rate when `smooth_policy_update` is on
    pub beta: f64,
    /// Eligibility trace decay; 0 disables traces
    pub lambda: f64,
    pub trace: TraceKind,
    /// Optimistic initial Q value
    pub q_init_val: f64,
    /// Planning updates per learning step; 0 disables planning
    pub plan_n: usize,
}

impl Default for TdOptions {
    fn default() -> Self {
        TdOptions {
            update: UpdateRule::QLearning,
            gamma: 0.75,
            epsilon: 0.1,
            alpha: 0.01,
            smooth_policy_update: false,
            beta: 0.01,
            lambda: 0.0,
            trace: TraceKind::Replacing,
            q_init_val: 0.0,
            plan_n: 0,
        }
    }
}

impl TdOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("gamma", self.gamma, false)?;
        check_unit("epsilon", self.epsilon, true)?;
        check_unit("beta", self.beta, true)?;
        check_unit("lambda", self.lambda, true)?;
        check_non_negative("alpha", self.alpha)?;
        if !self.q_init_val.is_finite() {
            return Err(ReinforceError::invalid_parameter("q_init_val", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DqnOptions {
    pub gamma: f64,
    pub epsilon: f64,
    /// Learning rate; 0 disables learning
    pub alpha: f64,
    /// Time steps between insertions into replay memory
    pub experience_add_every: usize,
    /// Replay memory capacity
    pub experience_size: usize,
    /// Replay samples learned from per learning step
    pub learning_steps_per_iteration: usize,
    /// Bound on the TD error magnitude fed to backprop
    pub tderror_clamp: f64,
    pub num_hidden_units: usize,
}

impl Default for DqnOptions {
    fn default() -> Self {
        DqnOptions {
            gamma: 0.75,
            epsilon: 0.1,
            alpha: 0.01,
            experience_add_every: 25,
            experience_size: 5000,
            learning_steps_per_iteration: 10,
            tderror_clamp: 1.0,
            num_hidden_units: 100,
        }
    }
}

impl DqnOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("gamma", self.gamma, false)?;
        check_unit("epsilon", self.epsilon, true)?;
        check_non_negative("alpha", self.alpha)?;
        check_positive_count("experience_add_every", self.experience_add_every)?;
        check_positive_count("experience_size", self.experience_size)?;
        check_positive_count("num_hidden_units", self.num_hidden_units)?;
        if !(self.tderror_clamp > 0.0) {
            return Err(ReinforceError::invalid_parameter(
                "tderror_clamp".to_string(),
                format!("must be positive, got {}", self.tderror_clamp),
            ));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64, inclusive: bool) -> Result<()> {
    let ok = value >= 0.0 && if inclusive { value <= 1.0 } else { value < 1.0 };
    if !ok {
        let bound = if inclusive { "[0, 1]" } else { "[0, 1)" };
        return Err(ReinforceError::invalid_parameter(
            name.to_string(),
            format!("must be in {}, got {}", bound, value),
        ));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(ReinforceError::invalid_parameter(
            name.to_string(),
            format!("must be a non-negative number, got {}", value),
        ));
    }
    Ok(())
}

fn check_positive_count(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ReinforceError::invalid_parameter(name, "must be greater than 0"));
    }
    Ok(())
}
