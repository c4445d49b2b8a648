//! # Parameter Update Rules
//!
//! Two update disciplines over a [`Net`]:
//!
//! - [`Sgd`]: plain per-weight step `w += -lr * g`
//! - [`RmsProp`]: adaptive step with a decayed running average of squared
//!   gradients, value clipping and L2 regularization
//!
//! Both consume the gradient buffers and reset them to zero, so the next
//! backward pass starts from a clean slate. [`OptimizerWrapper`] selects one
//! explicitly at construction time.

pub mod gradient_clipper;

use std::collections::BTreeMap;

use log::debug;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::net::Net;

pub use gradient_clipper::GradientClipper;

/// Counters reported by one optimizer step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdateStats {
    pub num_clipped: usize,
    pub num_total: usize,
}

impl UpdateStats {
    pub fn ratio_clipped(&self) -> f64 {
        if self.num_total == 0 {
            0.0
        } else {
            self.num_clipped as f64 / self.num_total as f64
        }
    }
}

pub trait Optimizer {
    /// Apply one update to every parameter of `net` and clear its gradients.
    fn step(&mut self, net: &mut Net, learning_rate: f64) -> UpdateStats;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    Sgd(Sgd),
    RmsProp(RmsProp),
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, net: &mut Net, learning_rate: f64) -> UpdateStats {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.step(net, learning_rate),
            OptimizerWrapper::RmsProp(optimizer) => optimizer.step(net, learning_rate),
        }
    }
}

impl OptimizerWrapper {
    /// Drop any per-parameter state accumulated so far.
    pub fn reset(&mut self) {
        if let OptimizerWrapper::RmsProp(optimizer) = self {
            optimizer.reset();
        }
    }
}

impl Default for OptimizerWrapper {
    fn default() -> Self {
        OptimizerWrapper::Sgd(Sgd::new())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Sgd;

impl Sgd {
    pub fn new() -> Sgd {
        Sgd
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, net: &mut Net, learning_rate: f64) -> UpdateStats {
        let mut num_total = 0;
        for (_, m) in net.iter_mut() {
            num_total += m.len();
            Zip::from(&mut m.values)
                .and(&mut m.gradients)
                .for_each(|w, g| {
                    *w += -learning_rate * *g;
                    *g = 0.0;
                });
        }
        UpdateStats { num_clipped: 0, num_total }
    }
}

/// RMSProp-style solver with gradient clipping and L2 regularization.
///
/// Keeps one running average of squared gradients per parameter name, created
/// lazily on first use and kept for the solver's lifetime.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RmsProp {
    pub decay_rate: f64,
    pub smooth_eps: f64,
    pub regc: f64,
    pub clipper: GradientClipper,
    step_cache: BTreeMap<String, Array2<f64>>,
}

impl RmsProp {
    pub fn new(regc: f64, clipval: f64) -> Self {
        RmsProp {
            decay_rate: 0.999,
            smooth_eps: 1e-8,
            regc,
            clipper: GradientClipper::symmetric(clipval),
            step_cache: BTreeMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.step_cache.clear();
    }

    /// Running average of squared gradients for `name`, if it has been stepped.
    pub fn cache(&self, name: &str) -> Option<&Array2<f64>> {
        self.step_cache.get(name)
    }
}

impl Default for RmsProp {
    fn default() -> Self {
        Self::new(0.0, 5.0)
    }
}

impl Optimizer for RmsProp {
    fn step(&mut self, net: &mut Net, learning_rate: f64) -> UpdateStats {
        let decay = self.decay_rate;
        let eps = self.smooth_eps;
        let regc = self.regc;
        let mut stats = UpdateStats::default();

        for (name, m) in net.iter_mut() {
            let cache = self
                .step_cache
                .entry(name.to_string())
                .or_insert_with(|| Array2::zeros(m.shape()));
            if cache.dim() != m.shape() {
                *cache = Array2::zeros(m.shape());
            }

            stats.num_clipped += self.clipper.clip(&mut m.gradients);
            stats.num_total += m.len();

            Zip::from(&mut m.values)
                .and(&mut m.gradients)
                .and(cache)
                .for_each(|w, g, s| {
                    *s = *s * decay + (1.0 - decay) * *g * *g;
                    *w += -learning_rate * *g / (*s + eps).sqrt() - regc * *w;
                    *g = 0.0;
                });
        }

        if stats.num_clipped > 0 {
            debug!(
                "rmsprop clipped {}/{} gradients ({:.4})",
                stats.num_clipped,
                stats.num_total,
                stats.ratio_clipped()
            );
        }
        stats
    }
}
