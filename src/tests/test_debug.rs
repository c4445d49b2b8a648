use ndarray::array;

use crate::debug::{check_gradients, check_weights, gradient_check, gradient_norms, NumericalIssue};
use crate::mat::Mat;
use crate::net::Net;

#[test]
fn test_gradient_check_on_matmul_tanh() {
    let w = Mat::from_vec(2, 3, vec![0.1, -0.4, 0.3, 0.8, 0.2, -0.6]).unwrap();
    let x = Mat::column(&[1.0, -2.0, 0.5]);
    let errors = gradient_check(
        &[w, x],
        |g, ids| {
            let y = g.matmul(ids[0], ids[1])?;
            Ok(g.tanh(y))
        },
        1e-5,
    )
    .unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|&e| e < 1e-7), "{:?}", errors);
}

#[test]
fn test_gradient_check_propagates_errors() {
    let result = gradient_check(&[Mat::new(2, 2), Mat::new(3, 1)], |g, ids| g.matmul(ids[0], ids[1]), 1e-5);
    assert!(result.is_err());
}

#[test]
fn test_gradient_norms() {
    let mut a = Mat::new(1, 2);
    a.gradients.assign(&array![[3.0, 4.0]]);
    let net = Net::new().with("a", a).unwrap().with("b", Mat::new(2, 2)).unwrap();
    assert_eq!(gradient_norms(&net), vec![5.0, 0.0]);
}

#[test]
fn test_numerical_scans() {
    let mut w = Mat::from_vec(1, 3, vec![f64::NAN, 1.0, f64::INFINITY]).unwrap();
    w.gradients.assign(&array![[0.0, 5e3, -2e3]]);
    let net = Net::new().with("W", w).unwrap().with("b", Mat::new(1, 1)).unwrap();

    let issues = check_weights(&net);
    assert_eq!(
        issues,
        vec![
            NumericalIssue::NaN { param: "W".to_string(), count: 1 },
            NumericalIssue::Infinity { param: "W".to_string(), count: 1 },
        ]
    );
    assert_eq!(
        check_gradients(&net),
        vec![NumericalIssue::Overflow { param: "W".to_string(), count: 2 }]
    );
}
