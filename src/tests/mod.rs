pub mod test_debug;
pub mod test_optimizer;
pub mod test_replay_buffer;
pub mod test_sampling;

use crate::environment::{Environment, ModelEnvironment};

/// Single state whose only action loops back with reward 1.
pub struct Loop;

impl Environment for Loop {
    fn num_states(&self) -> usize {
        1
    }

    fn max_num_actions(&self) -> usize {
        1
    }

    fn allowed_actions(&self, _state: usize) -> Vec<usize> {
        vec![0]
    }
}

impl ModelEnvironment for Loop {
    fn next_state(&self, _state: usize, _action: usize) -> usize {
        0
    }

    fn reward(&self, _state: usize, _action: usize, _next_state: usize) -> f64 {
        1.0
    }
}

/// States `0 -> 1 -> 2` with two actions each. Action 1 advances and pays 1
/// when entering the last state, action 0 stays put. State 2 is absorbing.
pub struct Chain;

impl Environment for Chain {
    fn num_states(&self) -> usize {
        3
    }

    fn max_num_actions(&self) -> usize {
        2
    }

    fn allowed_actions(&self, state: usize) -> Vec<usize> {
        if state == 2 {
            vec![0]
        } else {
            vec![0, 1]
        }
    }
}

impl ModelEnvironment for Chain {
    fn next_state(&self, state: usize, action: usize) -> usize {
        if action == 1 && state < 2 {
            state + 1
        } else {
            state
        }
    }

    fn reward(&self, state: usize, action: usize, next_state: usize) -> f64 {
        if action == 1 && state == 1 && next_state == 2 {
            1.0
        } else {
            0.0
        }
    }
}
