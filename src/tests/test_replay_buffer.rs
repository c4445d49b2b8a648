use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::replay_buffer::{Experience, ReplayBuffer};

fn experience(tag: usize) -> Experience {
    Experience {
        state: array![tag as f64],
        action: tag % 2,
        reward: tag as f64,
        next_state: array![tag as f64 + 1.0],
        next_action: 0,
    }
}

#[test]
fn test_fills_then_wraps() {
    let mut buffer = ReplayBuffer::new(3);
    for i in 0..3 {
        buffer.add(experience(i));
    }
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.insert_index(), 0);

    buffer.add(experience(3));
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.insert_index(), 1);
    let rewards: Vec<f64> = buffer.iter().map(|e| e.reward).collect();
    assert_eq!(rewards, vec![3.0, 1.0, 2.0]);
}

#[test]
fn test_sample_empty() {
    let buffer = ReplayBuffer::new(4);
    let mut rng = StdRng::seed_from_u64(0);
    assert!(buffer.sample(&mut rng).is_none());
    assert!(buffer.sample_batch(5, &mut rng).is_empty());
}

#[test]
fn test_sample_with_replacement() {
    let mut buffer = ReplayBuffer::new(2);
    buffer.add(experience(7));
    let mut rng = StdRng::seed_from_u64(1);
    let batch = buffer.sample_batch(4, &mut rng);
    assert_eq!(batch.len(), 4);
    assert!(batch.iter().all(|e| e.reward == 7.0));
}

#[test]
fn test_zero_capacity_stores_nothing() {
    let mut buffer = ReplayBuffer::new(0);
    buffer.add(experience(1));
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 0);
}

#[test]
fn test_clear() {
    let mut buffer = ReplayBuffer::new(2);
    buffer.add(experience(1));
    buffer.add(experience(2));
    buffer.add(experience(3));
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.insert_index(), 0);
}
