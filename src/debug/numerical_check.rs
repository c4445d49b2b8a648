use log::warn;
use ndarray::Array2;

use crate::net::Net;

/// Types of numerical issues
#[derive(Debug, Clone, PartialEq)]
pub enum NumericalIssue {
    NaN { param: String, count: usize },
    Infinity { param: String, count: usize },
    Overflow { param: String, count: usize },
}

/// Check parameter values for NaN, infinities and magnitudes above 1e38.
pub fn check_weights(net: &Net) -> Vec<NumericalIssue> {
    net.iter()
        .flat_map(|(name, m)| scan(name, "weights", &m.values, 1e38))
        .collect()
}

/// Check gradient buffers for NaN, infinities and magnitudes above 1e3.
pub fn check_gradients(net: &Net) -> Vec<NumericalIssue> {
    net.iter()
        .flat_map(|(name, m)| scan(name, "gradients", &m.gradients, 1e3))
        .collect()
}

fn scan(param: &str, what: &str, array: &Array2<f64>, overflow_at: f64) -> Vec<NumericalIssue> {
    let mut nan_count = 0;
    let mut inf_count = 0;
    let mut overflow_count = 0;

    for &value in array.iter() {
        if value.is_nan() {
            nan_count += 1;
        } else if value.is_infinite() {
            inf_count += 1;
        } else if value.abs() > overflow_at {
            overflow_count += 1;
        }
    }

    let mut issues = Vec::new();
    if nan_count > 0 {
        warn!("{}: found {} NaN values in {}", param, nan_count, what);
        issues.push(NumericalIssue::NaN {
            param: param.to_string(),
            count: nan_count,
        });
    }
    if inf_count > 0 {
        warn!("{}: found {} infinite values in {}", param, inf_count, what);
        issues.push(NumericalIssue::Infinity {
            param: param.to_string(),
            count: inf_count,
        });
    }
    if overflow_count > 0 {
        warn!("{}: found {} values above {:e} in {}", param, overflow_count, overflow_at, what);
        issues.push(NumericalIssue::Overflow {
            param: param.to_string(),
            count: overflow_count,
        });
    }
    issues
}
