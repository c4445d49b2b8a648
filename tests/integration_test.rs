use reinforce::agent::{Agent, DpAgent, DqnAgent, DqnAgentBuilder, TdAgent};
use reinforce::config::{DpOptions, DqnOptions, TdOptions, UpdateRule};
use reinforce::environment::{Environment, ModelEnvironment};
use reinforce::optimizer::{OptimizerWrapper, RmsProp};

/// A 1-D corridor. Action 1 moves right, action 0 moves left. Moving right
/// from the last cell pays 1 and restarts at the left end.
struct Corridor {
    len: usize,
}

impl Corridor {
    fn step(&self, state: usize, action: usize) -> (usize, f64) {
        if action == 1 {
            if state + 1 >= self.len {
                (0, 1.0)
            } else {
                (state + 1, 0.0)
            }
        } else {
            (state.saturating_sub(1), 0.0)
        }
    }

    fn features(&self, state: usize) -> Vec<f64> {
        (0..self.len).map(|i| if i == state { 1.0 } else { 0.0 }).collect()
    }
}

impl Environment for Corridor {
    fn num_states(&self) -> usize {
        self.len
    }

    fn max_num_actions(&self) -> usize {
        2
    }

    fn allowed_actions(&self, _state: usize) -> Vec<usize> {
        vec![0, 1]
    }
}

impl ModelEnvironment for Corridor {
    fn next_state(&self, state: usize, action: usize) -> usize {
        self.step(state, action).0
    }

    fn reward(&self, state: usize, action: usize, _next_state: usize) -> f64 {
        self.step(state, action).1
    }
}

/// Drive any tabular agent for `steps` steps, returning the total reward.
fn run_tabular<A: Agent<State = usize>>(agent: &mut A, env: &Corridor, steps: usize) -> f64 {
    let mut state = 0;
    let mut total = 0.0;
    for _ in 0..steps {
        let action = agent.act(&state).unwrap();
        let (next, reward) = env.step(state, action);
        agent.learn(reward).unwrap();
        total += reward;
        state = next;
    }
    total
}

#[test]
fn test_dp_agent_solves_corridor() {
    let env = Corridor { len: 5 };
    let mut agent = DpAgent::new(&env, DpOptions { gamma: 0.9 }, Some(1)).unwrap();
    agent.sweep_until(1e-9, 10_000).unwrap();
    for s in 0..5 {
        assert_eq!(agent.act(s).unwrap(), 1, "state {}", s);
    }
    // one lap of the corridor takes 5 steps
    let total = run_tabular(&mut agent, &env, 40);
    assert_eq!(total, 8.0);
}

#[test]
fn test_td_agents_improve_over_random() {
    let env = Corridor { len: 5 };
    for update in [UpdateRule::QLearning, UpdateRule::Sarsa] {
        let options = TdOptions {
            update,
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.2,
            lambda: 0.5,
            plan_n: 10,
            ..TdOptions::default()
        };
        let mut agent = TdAgent::new(&env, options, Some(42)).unwrap();
        run_tabular(&mut agent, &env, 5000);

        agent.set_exploration_rate(0.0);
        let total = run_tabular(&mut agent, &env, 400);
        assert!(total >= 40.0, "{:?} collected {}", update, total);
    }
}

#[test]
fn test_dqn_agent_drives_corridor() {
    let env = Corridor { len: 4 };
    let mut agent = DqnAgentBuilder::new()
        .environment(&env)
        .hidden_units(16)
        .gamma(0.9)
        .epsilon(0.2)
        .alpha(0.05)
        .experience_add_every(1)
        .experience_size(200)
        .learning_steps_per_iteration(5)
        .seed(3)
        .build()
        .unwrap();

    let mut state = 0;
    for _ in 0..300 {
        let action = agent.act(&env.features(state)).unwrap();
        let (next, reward) = env.step(state, action);
        agent.learn(reward).unwrap();
        state = next;
    }
    assert_eq!(agent.replay().len(), 200);
    assert!(agent.tderror().is_finite());
    assert!(agent.net().iter().all(|(_, m)| m.values.iter().all(|v| v.is_finite())));
}

#[test]
fn test_dqn_save_load_across_agents() {
    let env = Corridor { len: 4 };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corridor.bin");

    let options = DqnOptions {
        num_hidden_units: 10,
        epsilon: 0.0,
        ..DqnOptions::default()
    };
    let mut trained = DqnAgent::new(&env, options.clone(), Some(11)).unwrap();
    for s in 0..3 {
        let (next, reward) = env.step(s, 1);
        trained
            .learn_from_tuple(&env.features(s), 1, reward, &env.features(next))
            .unwrap();
    }
    trained.save(&path).unwrap();

    let mut restored = DqnAgentBuilder::new()
        .environment(&env)
        .options(options)
        .optimizer(OptimizerWrapper::RmsProp(RmsProp::default()))
        .seed(99)
        .build()
        .unwrap();
    restored.load(&path).unwrap();
    for s in 0..4 {
        let x = env.features(s);
        assert_eq!(trained.act(&x).unwrap(), restored.act(&x).unwrap());
    }
}
