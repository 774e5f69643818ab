//! Execution planning over a workflow graph.
//!
//! [`ExecutionPlan::new`] checks the graph is runnable; [`Walk`] then hands
//! out nodes one at a time in dependency order. A node becomes ready once
//! every incoming edge has been resolved by its source. It runs when at
//! least one of those edges is active; otherwise it is skipped and its own
//! outgoing edges resolve as inactive.

use std::collections::{HashMap, VecDeque};

use crate::workflow::{Edge, Node};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Workflow has no nodes")]
    Empty,

    #[error("Workflow has {count} nodes, maximum is {max}")]
    TooManyNodes { count: usize, max: usize },

    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("Workflow has no trigger node")]
    MissingTrigger,

    #[error("Workflow has {0} trigger nodes, expected exactly one")]
    MultipleTriggers(usize),

    #[error("Trigger node '{0}' must not have incoming edges")]
    TriggerHasIncoming(String),

    #[error("Edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },

    #[error("Node '{0}' has no incoming edge")]
    Unreachable(String),

    #[error("Workflow graph contains a cycle")]
    Cycle,
}

/// Which outgoing edges of a completed node carry control onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch<'a> {
    /// Every outgoing edge is active.
    All,
    /// Only edges whose `sourceHandle` equals the handle, plus edges with no
    /// handle, are active.
    Handle(&'a str),
}

#[derive(Debug, Clone)]
struct OutEdge {
    target: usize,
    handle: Option<String>,
}

/// A validated, runnable graph.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    nodes: Vec<Node>,
    outgoing: Vec<Vec<OutEdge>>,
    in_degree: Vec<usize>,
    trigger: usize,
    order: Vec<usize>,
}

impl ExecutionPlan {
    /// Validate `nodes`/`edges` and build the plan.
    ///
    /// Requires exactly one trigger with no incoming edges, at least one
    /// incoming edge on every other node, edges between existing nodes, and
    /// no cycles.
    pub fn new(nodes: Vec<Node>, edges: &[Edge]) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let triggers: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_trigger())
            .map(|(i, _)| i)
            .collect();
        let trigger = match triggers.as_slice() {
            [] => return Err(GraphError::MissingTrigger),
            [only] => *only,
            many => return Err(GraphError::MultipleTriggers(many.len())),
        };

        let mut outgoing: Vec<Vec<OutEdge>> = vec![Vec::new(); nodes.len()];
        let mut in_degree = vec![0usize; nodes.len()];
        for edge in edges {
            let lookup = |id: &String| {
                index.get(id).copied().ok_or_else(|| GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: id.clone(),
                })
            };
            let source = lookup(&edge.source)?;
            let target = lookup(&edge.target)?;
            outgoing[source].push(OutEdge {
                target,
                handle: edge.source_handle().map(str::to_string),
            });
            in_degree[target] += 1;
        }

        if in_degree[trigger] > 0 {
            return Err(GraphError::TriggerHasIncoming(nodes[trigger].id.clone()));
        }
        if let Some(orphan) = (0..nodes.len()).find(|&i| i != trigger && in_degree[i] == 0) {
            return Err(GraphError::Unreachable(nodes[orphan].id.clone()));
        }

        // Kahn's algorithm; the trigger is the only zero in-degree node.
        let mut remaining = in_degree.clone();
        let mut queue = VecDeque::from([trigger]);
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for out in &outgoing[i] {
                remaining[out.target] -= 1;
                if remaining[out.target] == 0 {
                    queue.push_back(out.target);
                }
            }
        }
        if order.len() != nodes.len() {
            return Err(GraphError::Cycle);
        }

        Ok(Self {
            nodes,
            outgoing,
            in_degree,
            trigger,
            order,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn trigger(&self) -> &Node {
        &self.nodes[self.trigger]
    }

    /// Node ids in topological order, assuming every branch is taken.
    pub fn topological_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|&i| self.nodes[i].id.as_str())
    }

    /// Start a walk from the trigger.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            plan: self,
            unresolved: self.in_degree.clone(),
            active: vec![0; self.nodes.len()],
            ready: VecDeque::from([self.trigger]),
            skipped: Vec::new(),
        }
    }
}

/// Incremental traversal of an [`ExecutionPlan`].
///
/// Call [`Walk::next_ready`] for the next node to run, then
/// [`Walk::complete`] with the branch it took before asking again.
#[derive(Debug)]
pub struct Walk<'a> {
    plan: &'a ExecutionPlan,
    unresolved: Vec<usize>,
    active: Vec<usize>,
    ready: VecDeque<usize>,
    skipped: Vec<usize>,
}

impl<'a> Walk<'a> {
    /// Index of the next node to run, skipping nodes whose incoming edges
    /// are all inactive.
    pub fn next_ready(&mut self) -> Option<usize> {
        while let Some(i) = self.ready.pop_front() {
            if i == self.plan.trigger || self.active[i] > 0 {
                return Some(i);
            }
            self.skipped.push(i);
            self.resolve(i, None);
        }
        None
    }

    /// Mark node `index` finished and release its successors.
    pub fn complete(&mut self, index: usize, branch: Branch<'_>) {
        self.resolve(index, Some(branch));
    }

    /// Nodes skipped so far because no active edge reached them.
    pub fn skipped(&self) -> impl Iterator<Item = &'a Node> + '_ {
        let plan = self.plan;
        self.skipped.iter().map(move |&i| plan.node(i))
    }

    fn resolve(&mut self, index: usize, branch: Option<Branch<'_>>) {
        let plan = self.plan;
        for out in &plan.outgoing[index] {
            let taken = match (branch, out.handle.as_deref()) {
                (None, _) => false,
                (Some(Branch::All), _) | (Some(Branch::Handle(_)), None) => true,
                (Some(Branch::Handle(wanted)), Some(handle)) => handle == wanted,
            };
            if taken {
                self.active[out.target] += 1;
            }
            self.unresolved[out.target] -= 1;
            if self.unresolved[out.target] == 0 {
                self.ready.push_back(out.target);
            }
        }
    }
}
