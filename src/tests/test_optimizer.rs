use ndarray::array;

use crate::mat::Mat;
use crate::net::Net;
use crate::optimizer::{GradientClipper, Optimizer, OptimizerWrapper, RmsProp, Sgd};

fn net_with_grads(grads: [f64; 2]) -> Net {
    let mut w = Mat::from_vec(1, 2, vec![1.0, -1.0]).unwrap();
    w.gradients.assign(&array![[grads[0], grads[1]]]);
    Net::new().with("W", w).unwrap()
}

#[test]
fn test_sgd_step() {
    let mut net = net_with_grads([0.5, -2.0]);
    let stats = Sgd::new().step(&mut net, 0.1);
    let w = net.get("W").unwrap();
    assert!((w.values[[0, 0]] - 0.95).abs() < 1e-12);
    assert!((w.values[[0, 1]] + 0.8).abs() < 1e-12);
    assert_eq!(w.gradients, array![[0.0, 0.0]]);
    assert_eq!(stats.num_total, 2);
    assert_eq!(stats.num_clipped, 0);
}

#[test]
fn test_zero_gradients_leave_weights_unchanged() {
    let mut optimizers = vec![
        OptimizerWrapper::Sgd(Sgd::new()),
        OptimizerWrapper::RmsProp(RmsProp::default()),
    ];
    for opt in optimizers.iter_mut() {
        let mut net = net_with_grads([0.0, 0.0]);
        let before = net.clone();
        for _ in 0..3 {
            opt.step(&mut net, 0.5);
        }
        assert_eq!(net, before);
    }
}

#[test]
fn test_rmsprop_step() {
    let mut net = net_with_grads([1.0, 0.0]);
    let mut opt = RmsProp::new(0.0, 5.0);
    opt.step(&mut net, 0.01);

    // s = 0.001 after one step, so the step is lr / sqrt(0.001)
    let expected = 1.0 - 0.01 / (0.001f64 + 1e-8).sqrt();
    let w = net.get("W").unwrap();
    assert!((w.values[[0, 0]] - expected).abs() < 1e-12);
    assert_eq!(w.values[[0, 1]], -1.0);
    assert!((opt.cache("W").unwrap()[[0, 0]] - 0.001).abs() < 1e-15);
    assert_eq!(w.gradients, array![[0.0, 0.0]]);
}

#[test]
fn test_rmsprop_clips_before_caching() {
    let mut net = net_with_grads([100.0, -100.0]);
    let mut opt = RmsProp::new(0.0, 5.0);
    let stats = opt.step(&mut net, 0.01);
    assert_eq!(stats.num_clipped, 2);
    assert_eq!(stats.ratio_clipped(), 1.0);
    let cache = opt.cache("W").unwrap();
    assert!((cache[[0, 0]] - 0.001 * 25.0).abs() < 1e-12);
}

#[test]
fn test_rmsprop_regularization_shrinks_weights() {
    let mut net = net_with_grads([0.0, 0.0]);
    let mut opt = RmsProp::new(0.1, 5.0);
    opt.step(&mut net, 0.01);
    let w = net.get("W").unwrap();
    assert!((w.values[[0, 0]] - 0.9).abs() < 1e-12);
    assert!((w.values[[0, 1]] + 0.9).abs() < 1e-12);
}

#[test]
fn test_wrapper_reset_clears_cache() {
    let mut opt = OptimizerWrapper::RmsProp(RmsProp::default());
    let mut net = net_with_grads([1.0, 1.0]);
    opt.step(&mut net, 0.01);
    opt.reset();
    match &opt {
        OptimizerWrapper::RmsProp(r) => assert!(r.cache("W").is_none()),
        OptimizerWrapper::Sgd(_) => unreachable!(),
    }
}

#[test]
fn test_clip_by_value() {
    let clipper = GradientClipper::symmetric(1.0);
    let mut g = array![[2.0, -0.5], [-3.0, 1.0]];
    assert_eq!(clipper.clip(&mut g), 2);
    assert_eq!(g, array![[1.0, -0.5], [-1.0, 1.0]]);
}

#[test]
fn test_clip_by_norm() {
    let clipper = GradientClipper::ClipByNorm { max_norm: 1.0 };
    let mut g = array![[3.0, 4.0]];
    assert_eq!(clipper.clip(&mut g), 2);
    assert!((g[[0, 0]] - 0.6).abs() < 1e-12);
    assert!((g[[0, 1]] - 0.8).abs() < 1e-12);

    let mut small = array![[0.1, 0.1]];
    assert_eq!(clipper.clip(&mut small), 0);
    assert_eq!(GradientClipper::None.clip(&mut small), 0);
}

#[test]
fn test_clip_net() {
    let mut net = net_with_grads([10.0, 0.5]);
    assert_eq!(GradientClipper::symmetric(1.0).clip_net(&mut net), 1);
    assert_eq!(net.get("W").unwrap().gradients, array![[1.0, 0.5]]);
}
