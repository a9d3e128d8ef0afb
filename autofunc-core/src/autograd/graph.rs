use crate::autograd::backward_op::{Edge, Node};
use crate::autograd::grad_mode::set_grad_enabled;
use crate::error::AutofuncError;
use crate::tensor::create::ones_like;
use crate::tensor::Tensor;
use log::{debug, trace};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Identity of a graph node for the duration of one backward pass.
pub(crate) type NodeId = *const Node;

fn node_id(node: &Arc<Node>) -> NodeId {
    Arc::as_ptr(node)
}

/// Options for [`Tensor::backward_with`](crate::Tensor::backward_with).
#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardOptions {
    /// Keep saved tensors so the graph can be traversed again. Defaults to `create_graph`.
    pub retain_graph: Option<bool>,
    /// Record the backward computation itself, enabling higher-order derivatives.
    pub create_graph: bool,
}

/// Options for [`grad`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GradOptions {
    /// Keep saved tensors so the graph can be traversed again. Defaults to `create_graph`.
    pub retain_graph: Option<bool>,
    /// Record the backward computation itself, enabling higher-order derivatives.
    pub create_graph: bool,
    /// Return `None` for inputs the outputs do not depend on instead of failing.
    pub allow_unused: bool,
}

/// Sum of gradients arriving at one place.
fn accumulate(slot: &mut Option<Tensor>, incoming: Tensor) -> Result<(), AutofuncError> {
    *slot = Some(match slot.take() {
        Some(existing) => existing.add(&incoming)?,
        None => incoming,
    });
    Ok(())
}

/// Gradients to hand back to the caller of `grad` instead of accumulating into leaves.
struct Captures {
    leaves: Vec<(Tensor, usize)>,
    slots: HashMap<(NodeId, usize), Vec<usize>>,
    results: Vec<Option<Tensor>>,
}

impl Captures {
    fn new(inputs: &[Tensor]) -> Self {
        let mut leaves = Vec::new();
        let mut slots: HashMap<(NodeId, usize), Vec<usize>> = HashMap::new();
        for (index, input) in inputs.iter().enumerate() {
            let guard = input.read_data();
            match guard.grad_fn.as_ref() {
                Some(node) => slots
                    .entry((node_id(node), guard.output_nr))
                    .or_default()
                    .push(index),
                None => leaves.push((input.clone(), index)),
            }
        }
        Captures {
            leaves,
            slots,
            results: vec![None; inputs.len()],
        }
    }

    fn wants_leaf(&self, leaf: &Tensor) -> bool {
        self.leaves.iter().any(|(t, _)| t.is_same(leaf))
    }

    fn wants_node(&self, id: NodeId) -> bool {
        self.slots.keys().any(|(node, _)| *node == id)
    }
}

/// Every node reachable from the roots, with the number of edges pointing at it.
fn discover(roots: &[Arc<Node>]) -> (HashMap<NodeId, Arc<Node>>, HashMap<NodeId, usize>) {
    let mut nodes: HashMap<NodeId, Arc<Node>> = HashMap::new();
    let mut dependencies: HashMap<NodeId, usize> = HashMap::new();
    let mut stack: Vec<Arc<Node>> = Vec::new();
    for root in roots {
        if nodes.insert(node_id(root), Arc::clone(root)).is_none() {
            stack.push(Arc::clone(root));
        }
    }
    while let Some(node) = stack.pop() {
        for edge in node.next_edges.iter().flatten() {
            if let Edge::Node { node: next, .. } = edge {
                let id = node_id(next);
                *dependencies.entry(id).or_insert(0) += 1;
                if nodes.insert(id, Arc::clone(next)).is_none() {
                    stack.push(Arc::clone(next));
                }
            }
        }
    }
    (nodes, dependencies)
}

/// Nodes that lead to a captured input and therefore have to run.
fn needed_nodes(nodes: &HashMap<NodeId, Arc<Node>>, captures: &Captures) -> HashSet<NodeId> {
    fn visit(
        node: &Arc<Node>,
        captures: &Captures,
        memo: &mut HashMap<NodeId, bool>,
    ) -> bool {
        let id = node_id(node);
        if let Some(&known) = memo.get(&id) {
            return known;
        }
        let mut needed = false;
        for edge in node.next_edges.iter().flatten() {
            needed |= match edge {
                Edge::Leaf(leaf) => captures.wants_leaf(leaf),
                Edge::Node { node: next, .. } => {
                    captures.wants_node(node_id(next)) | visit(next, captures, memo)
                }
            };
        }
        memo.insert(id, needed);
        needed
    }

    let mut memo = HashMap::new();
    nodes
        .values()
        .filter(|node| visit(node, captures, &mut memo))
        .map(node_id)
        .collect()
}

/// Routes a gradient that reached a leaf: into the capture slots in `grad` mode,
/// otherwise into the leaf's `.grad`.
fn deliver_to_leaf(
    leaf: &Tensor,
    grad: Tensor,
    create_graph: bool,
    captures: Option<&mut Captures>,
) -> Result<(), AutofuncError> {
    match captures {
        Some(captures) => {
            let indices: Vec<usize> = captures
                .leaves
                .iter()
                .filter(|(t, _)| t.is_same(leaf))
                .map(|(_, i)| *i)
                .collect();
            for index in indices {
                accumulate(&mut captures.results[index], grad.clone())?;
            }
            Ok(())
        }
        None => leaf.accumulate_grad(grad, create_graph),
    }
}

/// Reverse-mode traversal shared by `Tensor::backward_with` and `grad`.
///
/// Without `captures`, gradients reaching leaves are accumulated into their `.grad`.
/// With them, the gradients of the requested tensors are collected instead and leaves
/// are left untouched.
fn execute(
    roots: &[Tensor],
    root_grads: Vec<Tensor>,
    retain_graph: bool,
    create_graph: bool,
    mut captures: Option<&mut Captures>,
) -> Result<(), AutofuncError> {
    let _mode = set_grad_enabled(create_graph);

    let mut buffers: HashMap<NodeId, Vec<Option<Tensor>>> = HashMap::new();
    let mut root_nodes = Vec::new();

    for (root, grad) in roots.iter().zip(root_grads) {
        let (grad_fn, output_nr) = {
            let guard = root.read_data();
            (guard.grad_fn.clone(), guard.output_nr)
        };
        match grad_fn {
            Some(node) => {
                let slots = buffers
                    .entry(node_id(&node))
                    .or_insert_with(|| vec![None; node.num_outputs()]);
                accumulate(&mut slots[output_nr], grad)?;
                root_nodes.push(node);
            }
            None => deliver_to_leaf(root, grad, create_graph, captures.as_deref_mut())?,
        }
    }

    let (nodes, mut dependencies) = discover(&root_nodes);
    let needed = captures.as_deref().map(|c| needed_nodes(&nodes, c));
    debug!(
        "Backward over {} nodes (retain_graph={}, create_graph={})",
        nodes.len(),
        retain_graph,
        create_graph
    );

    let mut ready: VecDeque<Arc<Node>> = nodes
        .values()
        .filter(|node| dependencies.get(&node_id(node)).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    while let Some(node) = ready.pop_front() {
        let id = node_id(&node);
        let grad_outputs = buffers
            .remove(&id)
            .unwrap_or_else(|| vec![None; node.num_outputs()]);

        if let Some(captures) = captures.as_deref_mut() {
            for (output_nr, grad) in grad_outputs.iter().enumerate() {
                let (Some(grad), Some(indices)) = (grad, captures.slots.get(&(id, output_nr)))
                else {
                    continue;
                };
                for index in indices.clone() {
                    accumulate(&mut captures.results[index], grad.clone())?;
                }
            }
        }

        let runs = needed.as_ref().map_or(true, |needed| needed.contains(&id));
        let has_gradient = grad_outputs.iter().any(Option::is_some);
        if runs && has_gradient {
            let input_grads = node.apply(grad_outputs)?;
            if !retain_graph {
                node.op.release_saved_tensors();
            }
            for (edge, grad) in node.next_edges.iter().zip(input_grads) {
                let (Some(edge), Some(grad)) = (edge, grad) else {
                    continue;
                };
                match edge {
                    Edge::Leaf(leaf) => {
                        trace!("{} -> leaf", node.name());
                        deliver_to_leaf(leaf, grad, create_graph, captures.as_deref_mut())?;
                    }
                    Edge::Node {
                        node: next,
                        output_nr,
                    } => {
                        trace!("{} -> {}[{}]", node.name(), next.name(), output_nr);
                        let slots = buffers
                            .entry(node_id(next))
                            .or_insert_with(|| vec![None; next.num_outputs()]);
                        accumulate(&mut slots[*output_nr], grad)?;
                    }
                }
            }
        }

        for edge in node.next_edges.iter().flatten() {
            if let Edge::Node { node: next, .. } = edge {
                let next_id = node_id(next);
                if let Some(count) = dependencies.get_mut(&next_id) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(Arc::clone(next));
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_roots(roots: &[Tensor], grads: &[Tensor]) -> Result<(), AutofuncError> {
    if roots.len() != grads.len() {
        return Err(AutofuncError::InvalidInput {
            op: "backward",
            message: format!("{} outputs but {} gradients", roots.len(), grads.len()),
        });
    }
    for (root, grad) in roots.iter().zip(grads) {
        if !root.requires_grad() {
            return Err(AutofuncError::RequiresGradNotMet);
        }
        if root.shape() != grad.shape() {
            return Err(AutofuncError::ShapeMismatch {
                expected: root.shape(),
                actual: grad.shape(),
                operation: "backward (initial gradient)".to_string(),
            });
        }
    }
    Ok(())
}

/// Implicit seed for scalar outputs.
fn default_grads(roots: &[Tensor]) -> Result<Vec<Tensor>, AutofuncError> {
    roots
        .iter()
        .map(|root| {
            if root.numel() != 1 {
                return Err(AutofuncError::BackwardNonScalar);
            }
            ones_like(root)
        })
        .collect()
}

/// Accumulates gradients of `roots` into the `.grad` of every leaf they depend on.
pub(crate) fn run_backward(
    roots: &[Tensor],
    grads: Option<Vec<Tensor>>,
    options: BackwardOptions,
) -> Result<(), AutofuncError> {
    let grads = match grads {
        Some(grads) => grads,
        None => default_grads(roots)?,
    };
    check_roots(roots, &grads)?;
    let retain_graph = options.retain_graph.unwrap_or(options.create_graph);
    execute(roots, grads, retain_graph, options.create_graph, None)
}

/// Computes and returns the gradients of `outputs` with respect to `inputs`.
///
/// Unlike `backward`, nothing is accumulated into `.grad`, and only the part of the graph
/// between the outputs and the requested inputs runs. `grad_outputs` may be omitted when
/// every output has a single element.
///
/// # Errors
/// `RequiresGradNotMet` if an output or input does not require grad, `UnusedInput` for an
/// input the outputs do not depend on (unless `allow_unused`), and any error raised by a
/// node's backward.
pub fn grad(
    outputs: &[Tensor],
    inputs: &[Tensor],
    grad_outputs: Option<&[Tensor]>,
    options: GradOptions,
) -> Result<Vec<Option<Tensor>>, AutofuncError> {
    let grads = match grad_outputs {
        Some(grads) => grads.to_vec(),
        None => default_grads(outputs)?,
    };
    check_roots(outputs, &grads)?;
    if inputs.iter().any(|input| !input.requires_grad()) {
        return Err(AutofuncError::RequiresGradNotMet);
    }

    let retain_graph = options.retain_graph.unwrap_or(options.create_graph);
    let mut captures = Captures::new(inputs);
    execute(
        outputs,
        grads,
        retain_graph,
        options.create_graph,
        Some(&mut captures),
    )?;

    let results = captures.results;
    if !options.allow_unused {
        if let Some(input_index) = results.iter().position(Option::is_none) {
            return Err(AutofuncError::UnusedInput { input_index });
        }
    }
    Ok(results)
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
