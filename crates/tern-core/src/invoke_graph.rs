//! Invoke graph: the units a unit declares it cascades into.
//!
//! Built from a root by walking declared invokes, validated for cycles, and
//! flattened into the order in which a cascade executes.

use crate::error::{CoreError, CoreResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Directed graph of invoke declarations (invoker -> invoked)
#[derive(Debug, Default)]
pub struct InvokeGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    declared: HashMap<String, Vec<String>>,
}

impl InvokeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit to the graph
    pub fn add_unit(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            idx
        } else {
            let idx = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), idx);
            idx
        }
    }

    /// Record that `from` invokes `to`
    pub fn add_invoke(&mut self, from: &str, to: &str) {
        let from_idx = self.add_unit(from);
        let to_idx = self.add_unit(to);
        self.graph.add_edge(from_idx, to_idx, ());
        self.declared
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
    }

    /// Build the graph reachable from `root`.
    ///
    /// `invokes_of` returns the declared invokes of a unit. Each unit is
    /// asked once.
    pub fn build<F>(root: &str, mut invokes_of: F) -> CoreResult<Self>
    where
        F: FnMut(&str) -> CoreResult<Vec<String>>,
    {
        let mut graph = Self::new();
        graph.add_unit(root);

        let mut queue = VecDeque::from([root.to_string()]);
        let mut expanded: HashSet<String> = HashSet::new();

        while let Some(name) = queue.pop_front() {
            if !expanded.insert(name.clone()) {
                continue;
            }
            for invoked in invokes_of(&name)? {
                graph.add_invoke(&name, &invoked);
                if !expanded.contains(&invoked) {
                    queue.push_back(invoked);
                }
            }
        }

        Ok(graph)
    }

    /// Validate the graph has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CyclicInvoke {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path through `start` for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        // Depth-first search for a path that returns to `start`
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(start, vec![start])];
        let mut visited = HashSet::new();

        while let Some((node, path)) = stack.pop() {
            for edge in self.graph.edges(node) {
                let target = edge.target();
                if target == start {
                    let mut names: Vec<&str> =
                        path.iter().map(|idx| self.graph[*idx].as_str()).collect();
                    names.push(self.graph[start].as_str());
                    return names.join(" -> ");
                }
                if visited.insert(target) {
                    let mut next = path.clone();
                    next.push(target);
                    stack.push((target, next));
                }
            }
        }

        self.graph[start].clone()
    }

    /// Units in cascade order starting at `root`: the root first, then each
    /// declared invoke depth-first in declaration order, every unit once.
    pub fn cascade_order(&self, root: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![root];

        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            order.push(name.to_string());
            if let Some(invokes) = self.declared.get(name) {
                for invoked in invokes.iter().rev() {
                    if !seen.contains(invoked.as_str()) {
                        stack.push(invoked.as_str());
                    }
                }
            }
        }

        order
    }

    /// Declared invokes of a unit
    pub fn invokes_of(&self, name: &str) -> &[String] {
        self.declared.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of units in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
#[path = "invoke_graph_test.rs"]
mod tests;
