use ndarray::Array1;
use rand::Rng;

/// One stored transition `(s0, a0, r0, s1, a1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub state: Array1<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Array1<f64>,
    pub next_action: usize,
}

/// Fixed-capacity experience memory with a wrap-around insertion index.
///
/// Once full, each insertion overwrites the oldest entry.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: Vec<Experience>,
    capacity: usize,
    insert_at: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            insert_at: 0,
        }
    }

    pub fn add(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() < self.capacity {
            self.buffer.push(experience);
        } else {
            self.buffer[self.insert_at] = experience;
        }
        self.insert_at = (self.insert_at + 1) % self.capacity;
    }

    /// One uniformly drawn experience, or `None` when empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Experience> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(&self.buffer[rng.gen_range(0..self.buffer.len())])
    }

    /// `batch_size` draws with replacement.
    pub fn sample_batch<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        (0..batch_size).filter_map(|_| self.sample(rng)).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next insertion will write.
    pub fn insert_index(&self) -> usize {
        self.insert_at
    }

    /// Stored experiences in slot order (not insertion order once wrapped).
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.insert_at = 0;
    }
}
