use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::net::Net;

/// Gradient clipping methods
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum GradientClipper {
    /// Clip gradients by value
    ClipByValue { min: f64, max: f64 },

    /// Clip gradients by norm
    ClipByNorm { max_norm: f64 },

    /// No clipping
    #[default]
    None,
}

impl GradientClipper {
    /// Clip every entry to `[-clip, clip]`.
    pub fn symmetric(clip: f64) -> Self {
        GradientClipper::ClipByValue { min: -clip, max: clip }
    }

    /// Clip a gradient buffer in place, returning how many entries changed.
    pub fn clip(&self, gradients: &mut Array2<f64>) -> usize {
        match self {
            GradientClipper::ClipByValue { min, max } => {
                let mut clipped = 0;
                gradients.iter_mut().for_each(|g| {
                    if *g > *max {
                        *g = *max;
                        clipped += 1;
                    } else if *g < *min {
                        *g = *min;
                        clipped += 1;
                    }
                });
                clipped
            }

            GradientClipper::ClipByNorm { max_norm } => {
                let norm = gradients.iter().map(|&g| g * g).sum::<f64>().sqrt();
                if norm > *max_norm {
                    let scale = max_norm / norm;
                    gradients.mapv_inplace(|g| g * scale);
                    gradients.len()
                } else {
                    0
                }
            }

            GradientClipper::None => 0,
        }
    }

    /// Clip the gradients of every parameter in `net`.
    pub fn clip_net(&self, net: &mut Net) -> usize {
        net.iter_mut().map(|(_, m)| self.clip(&mut m.gradients)).sum()
    }
}
