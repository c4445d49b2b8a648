use std::fs;
use std::path::Path;

use log::trace;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{make_rng, traits::Agent};
use crate::config::DqnOptions;
use crate::environment::Environment;
use crate::error::{ReinforceError, Result};
use crate::graph::{Graph, NodeId};
use crate::mat::Mat;
use crate::net::Net;
use crate::optimizer::{Optimizer, OptimizerWrapper};
use crate::replay_buffer::{Experience, ReplayBuffer};
use crate::sampling::{argmax, random_index};

/// Persisted DQN parameters: layer sizes plus the named weight matrices.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DqnModel {
    pub nh: usize,
    pub ns: usize,
    pub na: usize,
    pub net: Net,
}

impl DqnModel {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Deep Q-Network agent over continuous state vectors.
///
/// The Q-function is a two-layer network `W2 · tanh(W1 · s + b1) + b2`
/// producing one value per action. Learning follows the live transition and
/// then replays uniformly drawn transitions from a fixed-capacity memory.
///
/// # Example
///
/// ```rust
/// use reinforce::agent::DqnAgentBuilder;
///
/// let mut agent = DqnAgentBuilder::new()
///     .sizes(4, 2)
///     .hidden_units(16)
///     .epsilon(0.2)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let state = [0.1, -0.2, 0.3, -0.1];
/// for _ in 0..10 {
///     let action = agent.act(&state).unwrap();
///     assert!(action < 2);
///     agent.learn(1.0).unwrap();
/// }
/// assert!(agent.tderror().is_finite());
/// ```
#[derive(Debug)]
pub struct DqnAgent {
    options: DqnOptions,
    num_states: usize,
    num_actions: usize,
    num_hidden: usize,
    net: Net,
    optimizer: OptimizerWrapper,
    replay: ReplayBuffer,
    s0: Option<Array1<f64>>,
    a0: Option<usize>,
    r0: Option<f64>,
    s1: Option<Array1<f64>>,
    a1: Option<usize>,
    t: usize,
    tderror: f64,
    rng: StdRng,
}

impl DqnAgent {
    /// Size the network from `env`: its state count is the length of the
    /// feature vector, its action count the number of outputs.
    pub fn new<E: Environment + ?Sized>(env: &E, options: DqnOptions, seed: Option<u64>) -> Result<Self> {
        Self::from_sizes(env.num_states(), env.max_num_actions(), options, seed)
    }

    pub fn from_sizes(num_states: usize, num_actions: usize, options: DqnOptions, seed: Option<u64>) -> Result<Self> {
        Self::with_optimizer(num_states, num_actions, options, OptimizerWrapper::default(), seed)
    }

    fn with_optimizer(
        num_states: usize,
        num_actions: usize,
        options: DqnOptions,
        optimizer: OptimizerWrapper,
        seed: Option<u64>,
    ) -> Result<Self> {
        options.validate()?;
        if num_states == 0 || num_actions == 0 {
            return Err(ReinforceError::invalid_parameter(
                "sizes".to_string(),
                format!("need at least one state feature and one action, got {}x{}", num_states, num_actions),
            ));
        }
        let mut agent = DqnAgent {
            num_hidden: options.num_hidden_units,
            replay: ReplayBuffer::new(options.experience_size),
            options,
            num_states,
            num_actions,
            net: Net::new(),
            optimizer,
            s0: None,
            a0: None,
            r0: None,
            s1: None,
            a1: None,
            t: 0,
            tderror: 0.0,
            rng: make_rng(seed),
        };
        agent.reset()?;
        Ok(agent)
    }

    /// Draw fresh weights and forget replay memory, the last transition and
    /// any optimizer state.
    pub fn reset(&mut self) -> Result<()> {
        let (nh, ns, na) = (self.num_hidden, self.num_states, self.num_actions);
        self.net = Net::new()
            .with("W1", Mat::randn(nh, ns, 0.0, 0.01, &mut self.rng)?)?
            .with("b1", Mat::new(nh, 1))?
            .with("W2", Mat::randn(na, nh, 0.0, 0.01, &mut self.rng)?)?
            .with("b2", Mat::new(na, 1))?;
        self.replay = ReplayBuffer::new(self.options.experience_size);
        self.optimizer.reset();
        self.t = 0;
        self.tderror = 0.0;
        self.s0 = None;
        self.a0 = None;
        self.r0 = None;
        self.s1 = None;
        self.a1 = None;
        Ok(())
    }

    /// Record `W2 · tanh(W1 · state + b1) + b2` on `graph`.
    ///
    /// `params` are the ids returned by lending the agent's net, in
    /// `W1, b1, W2, b2` order.
    pub fn forward_q(graph: &mut Graph, params: &[NodeId], state: NodeId) -> Result<NodeId> {
        let &[w1, b1, w2, b2] = params else {
            return Err(ReinforceError::invalid_parameter(
                "params".to_string(),
                format!("expected 4 parameter ids, got {}", params.len()),
            ));
        };
        let h = graph.matmul(w1, state)?;
        let h = graph.add(h, b1)?;
        let h = graph.tanh(h);
        let q = graph.matmul(w2, h)?;
        graph.add(q, b2)
    }

    /// Epsilon-greedy action for the feature vector `state`.
    pub fn act(&mut self, state: &[f64]) -> Result<usize> {
        self.check_state(state)?;
        let action = if self.rng.gen::<f64>() < self.options.epsilon {
            random_index(self.num_actions, &mut self.rng)?
        } else {
            let q = self.q_values(state)?;
            argmax(&q).ok_or(ReinforceError::OutOfRange { index: 0, len: 0 })?
        };

        self.s0 = self.s1.take();
        self.a0 = self.a1.take();
        self.s1 = Some(Array1::from(state.to_vec()));
        self.a1 = Some(action);
        Ok(action)
    }

    /// Network output for `state`, one value per action. Nothing is recorded.
    pub fn q_values(&mut self, state: &[f64]) -> Result<Vec<f64>> {
        self.check_state(state)?;
        evaluate(&mut self.net, false, Mat::column(state), |graph, out| {
            Ok(graph.value(out).values.iter().copied().collect())
        })
    }

    /// Learn from the live transition, store it every `experience_add_every`
    /// steps, then learn from `learning_steps_per_iteration` replayed ones.
    pub fn learn(&mut self, reward: f64) -> Result<()> {
        if self.options.alpha > 0.0 {
            if let (Some(s0), Some(a0), Some(r0), Some(s1), Some(a1)) =
                (self.s0.clone(), self.a0, self.r0, self.s1.clone(), self.a1)
            {
                let experience = Experience {
                    state: s0,
                    action: a0,
                    reward: r0,
                    next_state: s1,
                    next_action: a1,
                };
                self.tderror = self.learn_from_experience(&experience)?;
                if self.t % self.options.experience_add_every == 0 {
                    self.replay.add(experience);
                }
                self.t += 1;

                for _ in 0..self.options.learning_steps_per_iteration {
                    let sampled = match self.replay.sample(&mut self.rng) {
                        Some(e) => e.clone(),
                        None => break,
                    };
                    self.learn_from_experience(&sampled)?;
                }
            }
        }
        self.r0 = Some(reward);
        Ok(())
    }

    /// One Q-learning step on `(s0, a0, r0, s1)`. The target bootstraps from
    /// the best action at `s1`, so the next action taken plays no part.
    /// Returns the clamped TD error.
    pub fn learn_from_tuple(&mut self, s0: &[f64], a0: usize, r0: f64, s1: &[f64]) -> Result<f64> {
        self.check_state(s0)?;
        self.check_state(s1)?;
        self.td_step(Mat::column(s0), a0, r0, Mat::column(s1))
    }

    pub fn learn_from_experience(&mut self, experience: &Experience) -> Result<f64> {
        self.check_len(experience.state.len())?;
        self.check_len(experience.next_state.len())?;
        self.td_step(
            Mat::from_array(&experience.state),
            experience.action,
            experience.reward,
            Mat::from_array(&experience.next_state),
        )
    }

    fn td_step(&mut self, s0: Mat, a0: usize, r0: f64, s1: Mat) -> Result<f64> {
        if a0 >= self.num_actions {
            return Err(ReinforceError::OutOfRange {
                index: a0,
                len: self.num_actions,
            });
        }

        let next_max = evaluate(&mut self.net, false, s1, |graph, out| {
            Ok(graph.value(out).values.fold(f64::NEG_INFINITY, |m, &v| m.max(v)))
        })?;
        let qmax = r0 + self.options.gamma * next_max;

        let clamp = self.options.tderror_clamp;
        let tderror = evaluate(&mut self.net, true, s0, |graph, out| {
            let pred = graph.value(out).get(a0, 0)?;
            let tderror = (pred - qmax).clamp(-clamp, clamp);
            graph.value_mut(out).gradients[[a0, 0]] = tderror;
            graph.backward();
            Ok(tderror)
        })?;

        self.optimizer.step(&mut self.net, self.options.alpha);
        trace!("dqn step a0={} target={:.5} tderror={:.5}", a0, qmax, tderror);
        Ok(tderror)
    }

    pub fn to_model(&self) -> DqnModel {
        DqnModel {
            nh: self.num_hidden,
            ns: self.num_states,
            na: self.num_actions,
            net: self.net.clone(),
        }
    }

    /// Restore weights from `model`. Its sizes must equal the agent's
    /// configured sizes; on any mismatch the agent is left untouched.
    pub fn load_model(&mut self, model: &DqnModel) -> Result<()> {
        if (model.nh, model.ns) != (self.num_hidden, self.num_states) {
            return Err(ReinforceError::shape_mismatch(
                "W1",
                (self.num_hidden, self.num_states),
                (model.nh, model.ns),
            ));
        }
        if model.na != self.num_actions {
            return Err(ReinforceError::shape_mismatch(
                "W2",
                (self.num_actions, self.num_hidden),
                (model.na, model.nh),
            ));
        }
        self.net.load_values(&model.net)
    }

    /// Write the model to `path` in bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(&self.to_model())?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a bincode model from `path` into this agent.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = fs::read(path)?;
        let model: DqnModel = bincode::deserialize(&bytes)?;
        self.load_model(&model)
    }

    /// Clamped TD error of the most recent live transition.
    pub fn tderror(&self) -> f64 {
        self.tderror
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    /// Number of live transitions learned from since the last reset.
    pub fn steps(&self) -> usize {
        self.t
    }

    pub fn options(&self) -> &DqnOptions {
        &self.options
    }

    fn check_state(&self, state: &[f64]) -> Result<()> {
        self.check_len(state.len())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.num_states {
            return Err(ReinforceError::dimension_mismatch(
                format!("state of {} features", self.num_states),
                format!("state of {} features", len),
            ));
        }
        Ok(())
    }
}

/// Run the Q-network on `input` inside a fresh graph and hand the output
/// node to `f`. Parameters are always returned to `net`, with whatever
/// gradients `f` produced.
fn evaluate<T, F>(net: &mut Net, recording: bool, input: Mat, f: F) -> Result<T>
where
    F: FnOnce(&mut Graph, NodeId) -> Result<T>,
{
    let mut graph = Graph::new(recording);
    let params = net.lend(&mut graph);
    let state = graph.leaf(input);
    let result = DqnAgent::forward_q(&mut graph, &params, state).and_then(|out| f(&mut graph, out));
    net.reclaim(&mut graph, &params);
    result
}

impl Agent for DqnAgent {
    type State = [f64];

    fn reset(&mut self) -> Result<()> {
        DqnAgent::reset(self)
    }

    fn act(&mut self, state: &[f64]) -> Result<usize> {
        DqnAgent::act(self, state)
    }

    fn learn(&mut self, reward: f64) -> Result<()> {
        DqnAgent::learn(self, reward)
    }

    fn exploration_rate(&self) -> Option<f64> {
        Some(self.options.epsilon)
    }

    fn set_exploration_rate(&mut self, rate: f64) {
        self.options.epsilon = rate.clamp(0.0, 1.0);
    }
}

/// Builder pattern for DqnAgent
pub struct DqnAgentBuilder {
    options: DqnOptions,
    optimizer: Option<OptimizerWrapper>,
    sizes: Option<(usize, usize)>,
    seed: Option<u64>,
}

impl DqnAgentBuilder {
    pub fn new() -> Self {
        DqnAgentBuilder {
            options: DqnOptions::default(),
            optimizer: None,
            sizes: None,
            seed: None,
        }
    }

    pub fn options(mut self, options: DqnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.options.gamma = gamma;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.options.epsilon = epsilon;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.options.alpha = alpha;
        self
    }

    pub fn hidden_units(mut self, units: usize) -> Self {
        self.options.num_hidden_units = units;
        self
    }

    pub fn experience_size(mut self, size: usize) -> Self {
        self.options.experience_size = size;
        self
    }

    pub fn experience_add_every(mut self, every: usize) -> Self {
        self.options.experience_add_every = every;
        self
    }

    pub fn learning_steps_per_iteration(mut self, steps: usize) -> Self {
        self.options.learning_steps_per_iteration = steps;
        self
    }

    pub fn tderror_clamp(mut self, clamp: f64) -> Self {
        self.options.tderror_clamp = clamp;
        self
    }

    /// Update rule for the network weights. Plain SGD when unset.
    pub fn optimizer(mut self, optimizer: OptimizerWrapper) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Length of the state vector and number of actions.
    pub fn sizes(mut self, num_states: usize, num_actions: usize) -> Self {
        self.sizes = Some((num_states, num_actions));
        self
    }

    pub fn environment<E: Environment + ?Sized>(self, env: &E) -> Self {
        self.sizes(env.num_states(), env.max_num_actions())
    }

    pub fn build(self) -> Result<DqnAgent> {
        let (num_states, num_actions) = self.sizes.ok_or_else(|| {
            ReinforceError::invalid_parameter(
                "sizes".to_string(),
                "state and action sizes must be specified".to_string(),
            )
        })?;
        DqnAgent::with_optimizer(
            num_states,
            num_actions,
            self.options,
            self.optimizer.unwrap_or_default(),
            self.seed,
        )
    }
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
