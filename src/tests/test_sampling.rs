use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ReinforceError;
use crate::sampling::{argmax, random_index, sample_weighted};

#[test]
fn test_sample_weighted_follows_mass() {
    let mut rng = StdRng::seed_from_u64(11);
    let weights = [0.0, 1.0, 0.0];
    for _ in 0..100 {
        assert_eq!(sample_weighted(&weights, &mut rng).unwrap(), 1);
    }
}

#[test]
fn test_sample_weighted_frequencies() {
    let mut rng = StdRng::seed_from_u64(5);
    let weights = [0.25, 0.75];
    let mut counts = [0usize; 2];
    for _ in 0..4000 {
        counts[sample_weighted(&weights, &mut rng).unwrap()] += 1;
    }
    let frac = counts[1] as f64 / 4000.0;
    assert!((frac - 0.75).abs() < 0.05, "got {}", frac);
}

#[test]
fn test_sample_weighted_exhausted() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = sample_weighted(&[0.0, 0.0], &mut rng).unwrap_err();
    assert!(matches!(err, ReinforceError::SamplingExhausted { total, .. } if total == 0.0));
    assert!(sample_weighted(&[], &mut rng).is_err());
}

#[test]
fn test_argmax_first_on_ties() {
    assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
    assert_eq!(argmax(&[-1.0]), Some(0));
    assert_eq!(argmax(&[]), None);
}

#[test]
fn test_random_index() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..50 {
        assert!(random_index(3, &mut rng).unwrap() < 3);
    }
    assert!(random_index(0, &mut rng).is_err());
}
