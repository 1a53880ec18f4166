// src/dag/graph.rs

use crate::script::{Line, LineIndex};

/// Immediate dependencies and dependents of one line.
#[derive(Debug, Clone, Default)]
struct LineNode {
    deps: Vec<LineIndex>,
    dependents: Vec<LineIndex>,
}

/// Dependency adjacency of a script, indexed by line number.
///
/// Acyclicity is checked when the script is loaded; here we only keep the
/// adjacency for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<LineNode>,
}

impl DependencyGraph {
    pub fn from_lines(lines: &[Line]) -> Self {
        let mut nodes = vec![LineNode::default(); lines.len()];

        for line in lines {
            if let Some(node) = nodes.get_mut(line.index - 1) {
                node.deps = line.dependencies.iter().copied().collect();
            }
            for &dep in &line.dependencies {
                if let Some(dep_node) = nodes.get_mut(dep.wrapping_sub(1)) {
                    dep_node.dependents.push(line.index);
                }
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lines that must finish before `index` may run.
    pub fn dependencies_of(&self, index: LineIndex) -> &[LineIndex] {
        self.node(index).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Lines that wait on `index`, in ascending order.
    pub fn dependents_of(&self, index: LineIndex) -> &[LineIndex] {
        self.node(index)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Lines with no dependencies at all.
    pub fn roots(&self) -> impl Iterator<Item = LineIndex> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(i, _)| i + 1)
    }

    fn node(&self, index: LineIndex) -> Option<&LineNode> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }
}
