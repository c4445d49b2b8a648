use crate::error::Result;
use crate::graph::{Graph, NodeId};
use crate::mat::Mat;
use crate::net::Net;

/// Compare the tape's gradients against central finite differences.
///
/// `forward` records a computation over the leaves built from `inputs` and
/// returns its output node; the scalar under test is the sum of that output.
/// Returns, per input, the largest error over its elements, measured as
/// `|analytic - numeric| / max(1, |analytic|, |numeric|)`.
pub fn gradient_check<F>(inputs: &[Mat], forward: F, epsilon: f64) -> Result<Vec<f64>>
where
    F: Fn(&mut Graph, &[NodeId]) -> Result<NodeId>,
{
    let mut graph = Graph::new(true);
    let ids: Vec<NodeId> = inputs.iter().map(|m| graph.leaf(m.clone())).collect();
    let out = forward(&mut graph, &ids)?;
    graph.value_mut(out).gradients.fill(1.0);
    graph.backward();

    let mut errors = Vec::with_capacity(inputs.len());
    for (i, &id) in ids.iter().enumerate() {
        let analytic = graph.value(id).gradients.clone();
        let mut perturbed = inputs.to_vec();
        let mut worst: f64 = 0.0;

        for (flat, &grad) in analytic.iter().enumerate() {
            let (r, c) = (flat / analytic.ncols(), flat % analytic.ncols());
            let original = inputs[i].values[[r, c]];

            perturbed[i].values[[r, c]] = original + epsilon;
            let plus = evaluate_sum(&perturbed, &forward)?;
            perturbed[i].values[[r, c]] = original - epsilon;
            let minus = evaluate_sum(&perturbed, &forward)?;
            perturbed[i].values[[r, c]] = original;

            let numeric = (plus - minus) / (2.0 * epsilon);
            let scale = grad.abs().max(numeric.abs()).max(1.0);
            worst = worst.max((grad - numeric).abs() / scale);
        }
        errors.push(worst);
    }
    Ok(errors)
}

fn evaluate_sum<F>(inputs: &[Mat], forward: &F) -> Result<f64>
where
    F: Fn(&mut Graph, &[NodeId]) -> Result<NodeId>,
{
    let mut graph = Graph::new(false);
    let ids: Vec<NodeId> = inputs.iter().map(|m| graph.leaf(m.clone())).collect();
    let out = forward(&mut graph, &ids)?;
    Ok(graph.value(out).values.sum())
}

/// L2 norm of each parameter's gradient, in parameter order.
pub fn gradient_norms(net: &Net) -> Vec<f64> {
    net.iter()
        .map(|(_, m)| m.gradients.iter().map(|&g| g * g).sum::<f64>().sqrt())
        .collect()
}
