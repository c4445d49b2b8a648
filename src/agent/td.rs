use std::cmp::Ordering;

use log::debug;
use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::Rng;

use super::{checked_actions, make_rng, traits::Agent};
use crate::config::{TdOptions, TraceKind, UpdateRule};
use crate::environment::Environment;
use crate::error::{ReinforceError, Result};
use crate::sampling::{random_index, sample_weighted};

/// Updates smaller than this neither refresh the policy nor raise priorities.
const UPDATE_THRESHOLD: f64 = 1e-5;

/// Bootstrap target for `Q(s0, a0)` given the reward and successor.
type TargetFn = fn(q: &Array2<f64>, next_actions: &[usize], s1: usize, a1: Option<usize>, r0: f64, gamma: f64) -> f64;

/// `r0 + γ·max_a Q(s1, a)` over the actions allowed at `s1`; a successor with
/// no actions is worth 0.
fn q_learning_target(q: &Array2<f64>, next_actions: &[usize], s1: usize, _a1: Option<usize>, r0: f64, gamma: f64) -> f64 {
    let qmax = next_actions
        .iter()
        .map(|&a| q[[s1, a]])
        .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0);
    r0 + gamma * qmax
}

/// `r0 + γ·Q(s1, a1)`; without a next action the successor is worth 0.
fn sarsa_target(q: &Array2<f64>, _next_actions: &[usize], s1: usize, a1: Option<usize>, r0: f64, gamma: f64) -> f64 {
    r0 + gamma * a1.map_or(0.0, |a| q[[s1, a]])
}

impl UpdateRule {
    fn target_fn(self) -> TargetFn {
        match self {
            UpdateRule::QLearning => q_learning_target,
            UpdateRule::Sarsa => sarsa_target,
        }
    }
}

/// Tabular temporal-difference agent (Q-learning or SARSA).
///
/// Supports eligibility traces (`lambda > 0`) and Dyna-style prioritized
/// sweeping (`plan_n > 0`): every observed transition is stored in a
/// deterministic model, and whenever `Q(s, ·)` changes, the pairs known to
/// lead into `s` gain priority for background replay.
///
/// Tables are indexed `[[state, action]]`.
pub struct TdAgent<E: Environment> {
    env: E,
    options: TdOptions,
    target_fn: TargetFn,
    num_states: usize,
    num_actions: usize,
    q: Array2<f64>,
    policy: Array2<f64>,
    traces: Array2<f64>,
    model_next: Array2<Option<usize>>,
    model_reward: Array2<f64>,
    priority: Array2<f64>,
    seen: Vec<(usize, usize)>,
    s0: Option<usize>,
    a0: Option<usize>,
    r0: Option<f64>,
    s1: Option<usize>,
    a1: Option<usize>,
    explored: bool,
    rng: StdRng,
}

impl<E: Environment> TdAgent<E> {
    pub fn new(env: E, options: TdOptions, seed: Option<u64>) -> Result<Self> {
        options.validate()?;
        let mut agent = TdAgent {
            env,
            target_fn: options.update.target_fn(),
            options,
            num_states: 0,
            num_actions: 0,
            q: Array2::zeros((0, 0)),
            policy: Array2::zeros((0, 0)),
            traces: Array2::zeros((0, 0)),
            model_next: Array2::from_elem((0, 0), None),
            model_reward: Array2::zeros((0, 0)),
            priority: Array2::zeros((0, 0)),
            seen: Vec::new(),
            s0: None,
            a0: None,
            r0: None,
            s1: None,
            a1: None,
            explored: false,
            rng: make_rng(seed),
        };
        agent.reset()?;
        Ok(agent)
    }

    /// Reallocate every table from the environment's sizes and forget the
    /// last transition.
    pub fn reset(&mut self) -> Result<()> {
        let (ns, na) = (self.env.num_states(), self.env.max_num_actions());
        self.num_states = ns;
        self.num_actions = na;
        self.q = Array2::from_elem((ns, na), self.options.q_init_val);
        self.policy = Array2::zeros((ns, na));
        self.traces = Array2::zeros((ns, na));
        self.model_next = Array2::from_elem((ns, na), None);
        self.model_reward = Array2::zeros((ns, na));
        self.priority = Array2::zeros((ns, na));
        self.seen.clear();

        for s in 0..ns {
            let poss = checked_actions(&self.env, s, na)?;
            let p = 1.0 / poss.len() as f64;
            for a in poss {
                self.policy[[s, a]] = p;
            }
        }

        self.s0 = None;
        self.a0 = None;
        self.r0 = None;
        self.s1 = None;
        self.a1 = None;
        self.explored = false;
        Ok(())
    }

    /// Epsilon-greedy action: uniformly random with probability `epsilon`,
    /// otherwise sampled from the policy.
    pub fn act(&mut self, state: usize) -> Result<usize> {
        self.check_state(state)?;
        let poss = checked_actions(&self.env, state, self.num_actions)?;
        if poss.is_empty() {
            return Err(ReinforceError::NoAllowedActions { state });
        }

        let action = if self.rng.gen::<f64>() < self.options.epsilon {
            self.explored = true;
            poss[random_index(poss.len(), &mut self.rng)?]
        } else {
            self.explored = false;
            let probs: Vec<f64> = poss.iter().map(|&a| self.policy[[state, a]]).collect();
            poss[sample_weighted(&probs, &mut self.rng)?]
        };

        self.s0 = self.s1;
        self.a0 = self.a1;
        self.s1 = Some(state);
        self.a1 = Some(action);
        Ok(action)
    }

    /// Take the reward for the previous action. Learns from the transition
    /// completed by the last two `act` calls, then plans if enabled.
    pub fn learn(&mut self, reward: f64) -> Result<()> {
        if let (Some(r0), Some(s0), Some(a0), Some(s1), Some(a1)) = (self.r0, self.s0, self.a0, self.s1, self.a1) {
            self.learn_from_tuple(s0, a0, r0, s1, Some(a1), self.options.lambda)?;
            if self.options.plan_n > 0 {
                self.update_model(s0, a0, r0, s1)?;
                self.plan()?;
            }
        }
        self.r0 = Some(reward);
        Ok(())
    }

    /// Move `Q(s0, a0)` toward its bootstrap target. With `lambda > 0` every
    /// pair carrying eligibility is updated and its trace decayed by
    /// `lambda·gamma`.
    pub fn learn_from_tuple(
        &mut self,
        s0: usize,
        a0: usize,
        r0: f64,
        s1: usize,
        a1: Option<usize>,
        lambda: f64,
    ) -> Result<()> {
        self.check_state(s0)?;
        self.check_state(s1)?;
        self.check_action(a0)?;
        if let Some(a1) = a1 {
            self.check_action(a1)?;
        }

        let gamma = self.options.gamma;
        let alpha = self.options.alpha;
        let next_actions = checked_actions(&self.env, s1, self.num_actions)?;
        let target = (self.target_fn)(&self.q, &next_actions, s1, a1, r0, gamma);

        if lambda > 0.0 {
            match self.options.trace {
                TraceKind::Replacing => self.traces[[s0, a0]] = 1.0,
                TraceKind::Accumulating => self.traces[[s0, a0]] += 1.0,
            }
            let decay = lambda * gamma;
            let mut state_update = vec![0.0f64; self.num_states];
            for s in 0..self.num_states {
                for a in checked_actions(&self.env, s, self.num_actions)? {
                    let esa = self.traces[[s, a]];
                    if esa == 0.0 {
                        continue;
                    }
                    let update = alpha * esa * (target - self.q[[s, a]]);
                    self.q[[s, a]] += update;
                    self.update_priority(s, update);
                    self.traces[[s, a]] *= decay;
                    state_update[s] = state_update[s].max(update.abs());
                }
            }
            for (s, &u) in state_update.iter().enumerate() {
                if u > UPDATE_THRESHOLD {
                    self.update_policy(s)?;
                }
            }
            // an exploratory step breaks the greedy chain Q-learning traces assume
            if self.explored && self.options.update == UpdateRule::QLearning {
                self.traces.fill(0.0);
            }
        } else {
            let update = alpha * (target - self.q[[s0, a0]]);
            self.q[[s0, a0]] += update;
            self.update_priority(s0, update);
            self.update_policy(s0)?;
        }
        Ok(())
    }

    /// Record the observed transition `(s0, a0) -> (r0, s1)` in the model.
    pub fn update_model(&mut self, s0: usize, a0: usize, r0: f64, s1: usize) -> Result<()> {
        self.check_state(s0)?;
        self.check_state(s1)?;
        self.check_action(a0)?;
        if self.model_next[[s0, a0]].is_none() {
            self.seen.push((s0, a0));
        }
        self.model_next[[s0, a0]] = Some(s1);
        self.model_reward[[s0, a0]] = r0;
        Ok(())
    }

    /// Replay up to `plan_n` modeled transitions, highest priority first,
    /// without eligibility traces. Returns the number of planning updates.
    pub fn plan(&mut self) -> Result<usize> {
        let mut queue: Vec<((usize, usize), f64)> = self
            .seen
            .iter()
            .map(|&sa| (sa, self.priority[[sa.0, sa.1]]))
            .filter(|&(_, p)| p > UPDATE_THRESHOLD)
            .collect();
        queue.sort_by(|x, y| y.1.partial_cmp(&x.1).unwrap_or(Ordering::Equal));

        let steps = self.options.plan_n.min(queue.len());
        for &((s0, a0), _) in queue.iter().take(steps) {
            self.priority[[s0, a0]] = 0.0;
            let s1 = match self.model_next[[s0, a0]] {
                Some(s1) => s1,
                None => continue,
            };
            let r0 = self.model_reward[[s0, a0]];
            let a1 = match self.options.update {
                UpdateRule::Sarsa => {
                    let poss = checked_actions(&self.env, s1, self.num_actions)?;
                    if poss.is_empty() {
                        None
                    } else {
                        Some(poss[random_index(poss.len(), &mut self.rng)?])
                    }
                }
                UpdateRule::QLearning => None,
            };
            self.learn_from_tuple(s0, a0, r0, s1, a1, 0.0)?;
        }
        if steps > 0 {
            debug!("planning replayed {} of {} queued pairs", steps, queue.len());
        }
        Ok(steps)
    }

    /// A value at `state` changed by `update`: raise the priority of every
    /// modeled pair that leads into `state`.
    pub fn update_priority(&mut self, state: usize, update: f64) {
        let u = update.abs();
        if u < UPDATE_THRESHOLD || self.options.plan_n == 0 {
            return;
        }
        Zip::from(&mut self.priority)
            .and(&self.model_next)
            .for_each(|p, &next| {
                if next == Some(state) {
                    *p += u;
                }
            });
    }

    /// Point the policy at `state` toward the actions attaining `max_a Q`,
    /// sharing mass among ties. With smooth updates the policy is blended by
    /// `beta` and renormalized.
    pub fn update_policy(&mut self, state: usize) -> Result<()> {
        let poss = checked_actions(&self.env, state, self.num_actions)?;
        if poss.is_empty() {
            return Ok(());
        }
        let qs: Vec<f64> = poss.iter().map(|&a| self.q[[state, a]]).collect();
        let mut qmax = qs[0];
        let mut nmax = 1usize;
        for &q in &qs[1..] {
            if q > qmax {
                qmax = q;
                nmax = 1;
            } else if q == qmax {
                nmax += 1;
            }
        }

        let smooth = self.options.smooth_policy_update;
        let beta = self.options.beta;
        let mut psum = 0.0;
        for (&a, &q) in poss.iter().zip(qs.iter()) {
            let target = if q == qmax { 1.0 / nmax as f64 } else { 0.0 };
            let p = &mut self.policy[[state, a]];
            if smooth {
                *p += beta * (target - *p);
                psum += *p;
            } else {
                *p = target;
            }
        }
        if smooth && psum > 0.0 {
            for &a in &poss {
                self.policy[[state, a]] /= psum;
            }
        }
        Ok(())
    }

    pub fn q(&self, state: usize, action: usize) -> f64 {
        self.q[[state, action]]
    }

    pub fn q_table(&self) -> &Array2<f64> {
        &self.q
    }

    pub fn policy(&self, state: usize, action: usize) -> f64 {
        self.policy[[state, action]]
    }

    pub fn trace(&self, state: usize, action: usize) -> f64 {
        self.traces[[state, action]]
    }

    pub fn priority(&self, state: usize, action: usize) -> f64 {
        self.priority[[state, action]]
    }

    /// Modeled `(reward, next_state)` for a pair, if it has been observed.
    pub fn model(&self, state: usize, action: usize) -> Option<(f64, usize)> {
        self.model_next[[state, action]].map(|s1| (self.model_reward[[state, action]], s1))
    }

    /// Pairs observed so far, in first-seen order.
    pub fn seen(&self) -> &[(usize, usize)] {
        &self.seen
    }

    /// Whether the last action was an exploratory one.
    pub fn explored(&self) -> bool {
        self.explored
    }

    pub fn options(&self) -> &TdOptions {
        &self.options
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.num_states {
            return Err(ReinforceError::OutOfRange {
                index: state,
                len: self.num_states,
            });
        }
        Ok(())
    }

    fn check_action(&self, action: usize) -> Result<()> {
        if action >= self.num_actions {
            return Err(ReinforceError::OutOfRange {
                index: action,
                len: self.num_actions,
            });
        }
        Ok(())
    }
}

impl<E: Environment> Agent for TdAgent<E> {
    type State = usize;

    fn reset(&mut self) -> Result<()> {
        TdAgent::reset(self)
    }

    fn act(&mut self, state: &usize) -> Result<usize> {
        TdAgent::act(self, *state)
    }

    fn learn(&mut self, reward: f64) -> Result<()> {
        TdAgent::learn(self, reward)
    }

    fn exploration_rate(&self) -> Option<f64> {
        Some(self.options.epsilon)
    }

    fn set_exploration_rate(&mut self, rate: f64) {
        self.options.epsilon = rate.clamp(0.0, 1.0);
    }
}
