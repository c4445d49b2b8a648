#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use reinforce::debug::gradient_check;
    use reinforce::graph::Graph;
    use reinforce::mat::Mat;
    use reinforce::replay_buffer::{Experience, ReplayBuffer};
    use ndarray::array;

    const EPS: f64 = 1e-5;
    const TOL: f64 = 1e-6;

    // Strategy for generating matrices with moderate entries
    fn mat_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Mat> {
        prop::collection::vec(-2.0f64..2.0, rows * cols)
            .prop_map(move |v| Mat::from_vec(rows, cols, v).unwrap())
    }

    // Entries kept away from the relu kink so central differences stay valid
    fn away_from_zero(rows: usize, cols: usize) -> impl Strategy<Value = Mat> {
        prop::collection::vec(
            prop_oneof![-2.0f64..-0.01, 0.01f64..2.0],
            rows * cols,
        )
        .prop_map(move |v| Mat::from_vec(rows, cols, v).unwrap())
    }

    fn dims() -> impl Strategy<Value = (usize, usize, usize)> {
        (1usize..4, 1usize..4, 1usize..4)
    }

    fn assert_small(errors: &[f64]) -> Result<(), TestCaseError> {
        for &e in errors {
            prop_assert!(e < TOL, "relative error {}", e);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn test_matmul_gradient((a, b) in dims().prop_flat_map(|(n, k, m)| (mat_strategy(n, k), mat_strategy(k, m)))) {
            let errors = gradient_check(&[a, b], |g, ids| g.matmul(ids[0], ids[1]), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_add_gradient((a, b) in (1usize..4, 1usize..4).prop_flat_map(|(r, c)| (mat_strategy(r, c), mat_strategy(r, c)))) {
            let errors = gradient_check(&[a, b], |g, ids| g.add(ids[0], ids[1]), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_elementwise_mul_gradient((a, b) in (1usize..4, 1usize..4).prop_flat_map(|(r, c)| (mat_strategy(r, c), mat_strategy(r, c)))) {
            let errors = gradient_check(&[a, b], |g, ids| g.elementwise_mul(ids[0], ids[1]), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_tanh_gradient(a in mat_strategy(3, 2)) {
            let errors = gradient_check(&[a], |g, ids| Ok(g.tanh(ids[0])), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_sigmoid_gradient(a in mat_strategy(3, 2)) {
            let errors = gradient_check(&[a], |g, ids| Ok(g.sigmoid(ids[0])), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_relu_gradient(a in away_from_zero(3, 2)) {
            let errors = gradient_check(&[a], |g, ids| Ok(g.relu(ids[0])), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_select_row_gradient(a in mat_strategy(4, 3), row in 0usize..4) {
            let errors = gradient_check(&[a], |g, ids| g.select_row(ids[0], row), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_dot_gradient((a, b) in (1usize..6).prop_flat_map(|n| (mat_strategy(n, 1), mat_strategy(n, 1)))) {
            let errors = gradient_check(&[a, b], |g, ids| g.dot(ids[0], ids[1]), EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_composed_network_gradient(
            w1 in mat_strategy(3, 2),
            b1 in mat_strategy(3, 1),
            w2 in mat_strategy(2, 3),
            x in mat_strategy(2, 1),
        ) {
            let errors = gradient_check(&[w1, b1, w2, x], |g, ids| {
                let h = g.matmul(ids[0], ids[3])?;
                let h = g.add(h, ids[1])?;
                let h = g.tanh(h);
                let y = g.matmul(ids[2], h)?;
                // reuse h so its gradient accumulates from two consumers
                let s = g.dot(h, h)?;
                let y = g.sigmoid(y);
                let r = g.select_row(y, 1)?;
                g.elementwise_mul(r, s)
            }, EPS).unwrap();
            assert_small(&errors)?;
        }

        #[test]
        fn test_replay_buffer_never_exceeds_capacity(capacity in 1usize..20, inserts in 0usize..60) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..inserts {
                buffer.add(Experience {
                    state: array![i as f64],
                    action: 0,
                    reward: i as f64,
                    next_state: array![0.0],
                    next_action: 0,
                });
            }
            prop_assert_eq!(buffer.len(), inserts.min(capacity));
            prop_assert_eq!(buffer.insert_index(), inserts % capacity);
            // the newest insertion sits just before the insertion index
            if inserts > 0 {
                let newest = (buffer.insert_index() + capacity - 1) % capacity;
                prop_assert_eq!(buffer.iter().nth(newest).map(|e| e.reward), Some((inserts - 1) as f64));
            }
        }
    }

    #[test]
    fn test_gradient_check_reports_wrong_gradients() {
        // a forward pass whose recorded gradient disagrees with its value:
        // the detached copy contributes value but no gradient
        let errors = gradient_check(
            &[Mat::column(&[1.0, 2.0])],
            |g: &mut Graph, ids| {
                let copy = g.value(ids[0]).clone();
                let detached = g.leaf(copy);
                g.elementwise_mul(ids[0], detached)
            },
            EPS,
        )
        .unwrap();
        assert!(errors[0] > 0.1);
    }
}
