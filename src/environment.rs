//! Environment contracts consumed by the agents.
//!
//! States and actions are dense integer ids. Tabular agents index their
//! tables with them directly; the DQN agent only reads the sizes.

/// A finite environment with enumerable states and actions.
pub trait Environment {
    /// Number of states (for DQN: the length of the state feature vector).
    fn num_states(&self) -> usize;

    /// Upper bound on action ids across all states.
    fn max_num_actions(&self) -> usize;

    /// Action ids available at `state`, each below `max_num_actions()`.
    fn allowed_actions(&self, state: usize) -> Vec<usize>;
}

/// An environment whose transition and reward functions are known to the
/// agent, as required by dynamic programming.
pub trait ModelEnvironment: Environment {
    /// Deterministic successor of taking `action` at `state`.
    fn next_state(&self, state: usize, action: usize) -> usize;

    fn reward(&self, state: usize, action: usize, next_state: usize) -> f64;
}

impl<E: Environment + ?Sized> Environment for &E {
    fn num_states(&self) -> usize {
        (**self).num_states()
    }

    fn max_num_actions(&self) -> usize {
        (**self).max_num_actions()
    }

    fn allowed_actions(&self, state: usize) -> Vec<usize> {
        (**self).allowed_actions(state)
    }
}

impl<E: ModelEnvironment + ?Sized> ModelEnvironment for &E {
    fn next_state(&self, state: usize, action: usize) -> usize {
        (**self).next_state(state, action)
    }

    fn reward(&self, state: usize, action: usize, next_state: usize) -> f64 {
        (**self).reward(state, action, next_state)
    }
}
