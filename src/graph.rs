//! # Reverse-Mode Autodiff Tape
//!
//! A [`Graph`] records differentiable matrix operations during the forward pass
//! and replays them in reverse during [`Graph::backward`] to propagate
//! gradients into every operand.
//!
//! The graph owns its nodes in an arena and hands out [`NodeId`] handles.
//! Each recorded step is a small reified record (operation kind, operand ids,
//! output id) interpreted by a single dispatcher during replay, so nothing in
//! the backward pass depends on captured state.
//!
//! ```rust
//! use reinforce::graph::Graph;
//! use reinforce::mat::Mat;
//!
//! let mut g = Graph::new(true);
//! let w = g.leaf(Mat::from_vec(1, 2, vec![0.5, -1.0]).unwrap());
//! let x = g.leaf(Mat::column(&[2.0, 3.0]));
//! let y = g.matmul(w, x).unwrap();
//! let y = g.tanh(y);
//!
//! g.value_mut(y).gradients[[0, 0]] = 1.0;
//! g.backward();
//! assert!(g.value(w).gradients[[0, 0]] != 0.0);
//! ```

use ndarray::{Array2, Axis, Zip};

use crate::error::{ReinforceError, Result};
use crate::mat::Mat;

/// Handle to a matrix living in a [`Graph`]. Only valid for the graph that
/// produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One recorded backward step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    MatMul { lhs: NodeId, rhs: NodeId, out: NodeId },
    Add { lhs: NodeId, rhs: NodeId, out: NodeId },
    ElementwiseMul { lhs: NodeId, rhs: NodeId, out: NodeId },
    Tanh { input: NodeId, out: NodeId },
    Sigmoid { input: NodeId, out: NodeId },
    Relu { input: NodeId, out: NodeId },
    SelectRow { input: NodeId, row: usize, out: NodeId },
    Dot { lhs: NodeId, rhs: NodeId, out: NodeId },
}

/// Autodiff tape over dense matrices.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Mat>,
    tape: Vec<Op>,
    recording: bool,
    spent: bool,
}

impl Graph {
    /// Create a graph. A non-recording graph evaluates operations but never
    /// records backward steps, so its `backward` is a no-op.
    pub fn new(recording: bool) -> Self {
        Graph {
            nodes: Vec::new(),
            tape: Vec::new(),
            recording,
            spent: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of nodes held by the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `backward` has already run. A spent graph still evaluates
    /// operations but records no further backward steps.
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Number of backward steps waiting to be replayed.
    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    /// Move a matrix into the graph as an input node.
    pub fn leaf(&mut self, mat: Mat) -> NodeId {
        self.push(mat)
    }

    pub fn value(&self, id: NodeId) -> &Mat {
        &self.nodes[id.0]
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut Mat {
        &mut self.nodes[id.0]
    }

    /// Move a matrix out of the graph, leaving an empty matrix behind.
    pub fn take(&mut self, id: NodeId) -> Mat {
        std::mem::take(&mut self.nodes[id.0])
    }

    /// Matrix product `lhs · rhs`.
    pub fn matmul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let (a, b) = (&self.nodes[lhs.0], &self.nodes[rhs.0]);
        if a.cols() != b.rows() {
            return Err(ReinforceError::dimension_mismatch(
                format!("rhs with {} rows", a.cols()),
                format!("{}x{} · {}x{}", a.rows(), a.cols(), b.rows(), b.cols()),
            ));
        }
        let values = a.values.dot(&b.values);
        let out = self.push_values(values);
        self.record(Op::MatMul { lhs, rhs, out });
        Ok(out)
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.check_same_shape(lhs, rhs, "add")?;
        let values = &self.nodes[lhs.0].values + &self.nodes[rhs.0].values;
        let out = self.push_values(values);
        self.record(Op::Add { lhs, rhs, out });
        Ok(out)
    }

    pub fn elementwise_mul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.check_same_shape(lhs, rhs, "elementwise_mul")?;
        let values = &self.nodes[lhs.0].values * &self.nodes[rhs.0].values;
        let out = self.push_values(values);
        self.record(Op::ElementwiseMul { lhs, rhs, out });
        Ok(out)
    }

    /// Elementwise activations cannot fail, so they return the node directly.
    pub fn tanh(&mut self, input: NodeId) -> NodeId {
        let values = self.nodes[input.0].values.mapv(f64::tanh);
        let out = self.push_values(values);
        self.record(Op::Tanh { input, out });
        out
    }

    pub fn sigmoid(&mut self, input: NodeId) -> NodeId {
        let values = self.nodes[input.0].values.mapv(sigmoid);
        let out = self.push_values(values);
        self.record(Op::Sigmoid { input, out });
        out
    }

    pub fn relu(&mut self, input: NodeId) -> NodeId {
        let values = self.nodes[input.0].values.mapv(|v| v.max(0.0));
        let out = self.push_values(values);
        self.record(Op::Relu { input, out });
        out
    }

    /// Extract row `row` of `input` as a column vector.
    pub fn select_row(&mut self, input: NodeId, row: usize) -> Result<NodeId> {
        let m = &self.nodes[input.0];
        if row >= m.rows() {
            return Err(ReinforceError::OutOfRange {
                index: row,
                len: m.rows(),
            });
        }
        let values = m.values.row(row).to_owned().insert_axis(Axis(1));
        let out = self.push_values(values);
        self.record(Op::SelectRow { input, row, out });
        Ok(out)
    }

    /// Inner product of two equally shaped matrices (usually column vectors),
    /// as a 1x1 matrix.
    pub fn dot(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.check_same_shape(lhs, rhs, "dot")?;
        let dot = Zip::from(&self.nodes[lhs.0].values)
            .and(&self.nodes[rhs.0].values)
            .fold(0.0, |acc, &a, &b| acc + a * b);
        let out = self.push_values(Array2::from_elem((1, 1), dot));
        self.record(Op::Dot { lhs, rhs, out });
        Ok(out)
    }

    /// Replay every recorded step in reverse insertion order, accumulating
    /// gradients into the operands. The tape is spent afterwards: later calls
    /// do nothing and later operations are not recorded.
    pub fn backward(&mut self) {
        if self.spent {
            return;
        }
        self.spent = true;
        let tape = std::mem::take(&mut self.tape);
        for op in tape.into_iter().rev() {
            self.backprop(op);
        }
    }

    fn backprop(&mut self, op: Op) {
        match op {
            Op::MatMul { lhs, rhs, out } => {
                let dout = &self.nodes[out.0].gradients;
                let dl = dout.dot(&self.nodes[rhs.0].values.t());
                let dr = self.nodes[lhs.0].values.t().dot(dout);
                self.nodes[lhs.0].gradients += &dl;
                self.nodes[rhs.0].gradients += &dr;
            }
            Op::Add { lhs, rhs, out } => {
                let dout = self.nodes[out.0].gradients.clone();
                self.nodes[lhs.0].gradients += &dout;
                self.nodes[rhs.0].gradients += &dout;
            }
            Op::ElementwiseMul { lhs, rhs, out } => {
                let dout = &self.nodes[out.0].gradients;
                let dl = &self.nodes[rhs.0].values * dout;
                let dr = &self.nodes[lhs.0].values * dout;
                self.nodes[lhs.0].gradients += &dl;
                self.nodes[rhs.0].gradients += &dr;
            }
            Op::Tanh { input, out } => {
                let o = &self.nodes[out.0];
                let delta = Zip::from(&o.values)
                    .and(&o.gradients)
                    .map_collect(|&y, &g| (1.0 - y * y) * g);
                self.nodes[input.0].gradients += &delta;
            }
            Op::Sigmoid { input, out } => {
                let o = &self.nodes[out.0];
                let delta = Zip::from(&o.values)
                    .and(&o.gradients)
                    .map_collect(|&y, &g| y * (1.0 - y) * g);
                self.nodes[input.0].gradients += &delta;
            }
            Op::Relu { input, out } => {
                let delta = Zip::from(&self.nodes[input.0].values)
                    .and(&self.nodes[out.0].gradients)
                    .map_collect(|&x, &g| if x > 0.0 { g } else { 0.0 });
                self.nodes[input.0].gradients += &delta;
            }
            Op::SelectRow { input, row, out } => {
                let dout = self.nodes[out.0].gradients.column(0).to_owned();
                let mut target = self.nodes[input.0].gradients.row_mut(row);
                target += &dout;
            }
            Op::Dot { lhs, rhs, out } => {
                let g = self.nodes[out.0].gradients[[0, 0]];
                let dl = self.nodes[rhs.0].values.mapv(|v| v * g);
                let dr = self.nodes[lhs.0].values.mapv(|v| v * g);
                self.nodes[lhs.0].gradients += &dl;
                self.nodes[rhs.0].gradients += &dr;
            }
        }
    }

    fn push(&mut self, mat: Mat) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(mat);
        id
    }

    fn push_values(&mut self, values: Array2<f64>) -> NodeId {
        let gradients = Array2::zeros(values.dim());
        self.push(Mat { values, gradients })
    }

    fn record(&mut self, op: Op) {
        if self.recording && !self.spent {
            self.tape.push(op);
        }
    }

    fn check_same_shape(&self, lhs: NodeId, rhs: NodeId, op: &str) -> Result<()> {
        let (a, b) = (self.nodes[lhs.0].shape(), self.nodes[rhs.0].shape());
        if a != b {
            return Err(ReinforceError::dimension_mismatch(
                format!("{}: {}x{}", op, a.0, a.1),
                format!("{}x{}", b.0, b.1),
            ));
        }
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
