use crate::error::Result;

/// Trait for agents driven by an external act/learn loop.
///
/// The driver calls [`act`](Agent::act) with the current state, executes the
/// returned action, then calls [`learn`](Agent::learn) with the resulting
/// reward.
pub trait Agent {
    /// State representation: a state id for tabular agents, a feature vector
    /// for function approximation.
    type State: ?Sized;

    /// Reinitialize every table or parameter and forget the last transition.
    fn reset(&mut self) -> Result<()>;

    /// Select an action given a state
    fn act(&mut self, state: &Self::State) -> Result<usize>;

    /// Take the reward for the previous action and update the model
    fn learn(&mut self, reward: f64) -> Result<()>;

    /// Get the current exploration rate (if applicable)
    fn exploration_rate(&self) -> Option<f64> {
        None
    }

    /// Set the exploration rate (if applicable)
    fn set_exploration_rate(&mut self, _rate: f64) {}
}
