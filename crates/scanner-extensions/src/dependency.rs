//! Dependency graph and stable topological ordering of extensions.
//!
//! Edges carry "must precede" semantics: an edge `a -> b` means `a` is
//! emitted before `b`. [`DependencyGraph::from_candidates`] derives the edges
//! of a filtered extension set from its declarations, phases and the
//! build-breaker rule; [`DependencyGraph::topological_sort`] orders it.
//!
//! # Example
//!
//! ```
//! use scanner_extensions::dependency::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! let consumer = graph.add_node("consumer");
//! let provider = graph.add_node("provider");
//! graph.add_edge(provider, consumer);
//!
//! let order = graph.topological_sort(|n| n.to_string()).unwrap();
//! assert_eq!(order, vec!["provider", "consumer"]);
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionId};
use crate::metadata::{DependencyKey, EffectiveDeclarations, Phase};

/// Directed graph over nodes kept in input order.
#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    nodes: Vec<T>,
    /// Successors of each node: nodes that must come after it.
    edges: Vec<BTreeSet<usize>>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl<T> DependencyGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its index. Input order is the tie-break
    /// order of the sort.
    pub fn add_node(&mut self, node: T) -> usize {
        self.nodes.push(node);
        self.edges.push(BTreeSet::new());
        self.nodes.len() - 1
    }

    /// Declare that `before` must precede `after`. Self edges are ignored.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn add_edge(&mut self, before: usize, after: usize) {
        assert!(after < self.nodes.len(), "edge target out of bounds");
        if before != after {
            self.edges[before].insert(after);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(BTreeSet::len).sum()
    }

    pub fn nodes(&self) -> &[T] {
        &self.nodes
    }

    /// Nodes that must come after `index`.
    pub fn successors_of(&self, index: usize) -> Vec<usize> {
        self.edges
            .get(index)
            .map(|succ| succ.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Stable topological sort (Kahn's algorithm).
    ///
    /// Among the nodes whose predecessors are all emitted, the one added
    /// first is emitted next. Unconstrained nodes therefore keep their
    /// relative input order and the output is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyCycle` naming, via `label`, the nodes that
    /// sit on or between cycles.
    pub fn topological_sort<F>(self, label: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> String,
    {
        let count = self.nodes.len();
        let mut in_degree = vec![0usize; count];
        for successors in &self.edges {
            for &next in successors {
                in_degree[next] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(current)) = ready.pop() {
            order.push(current);
            for &next in &self.edges[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != count {
            let mut participants: Vec<String> = self
                .cycle_participants(&in_degree)
                .into_iter()
                .map(|index| label(&self.nodes[index]))
                .collect();
            participants.sort();
            return Err(Error::DependencyCycle { participants });
        }

        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect())
    }

    /// Nodes left after Kahn's pass, minus those merely downstream of a
    /// cycle: repeatedly drop leftovers with no leftover successor.
    fn cycle_participants(&self, in_degree: &[usize]) -> Vec<usize> {
        let mut remaining: BTreeSet<usize> = (0..self.nodes.len())
            .filter(|&index| in_degree[index] > 0)
            .collect();

        loop {
            let sinks: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&index| !self.edges[index].iter().any(|n| remaining.contains(n)))
                .collect();
            if sinks.is_empty() {
                break;
            }
            for sink in sinks {
                remaining.remove(&sink);
            }
        }

        remaining.into_iter().collect()
    }
}

impl DependencyGraph<Arc<dyn Extension>> {
    /// Derive the ordering constraints of a filtered candidate set.
    ///
    /// - every candidate both generates and requires a key referring to
    ///   itself, so "depended upon by B" puts the declarer before B;
    /// - "requires K" links every *other* candidate generating K before the
    ///   requirer; a key nobody generates adds nothing;
    /// - `Pre` candidates precede all others, `Post` candidates follow all
    ///   others;
    /// - when `capability` is `PostJob`, build breakers follow every other
    ///   post-job whatever their phase or declarations say.
    ///
    /// # Errors
    ///
    /// Fails as soon as one candidate's declarations cannot be evaluated.
    pub fn from_candidates(
        candidates: Vec<Arc<dyn Extension>>,
        capability: Capability,
    ) -> Result<Self> {
        let declarations = candidates
            .iter()
            .map(|c| EffectiveDeclarations::resolve(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = Self::new();
        for candidate in candidates {
            graph.add_node(candidate);
        }

        let breakers: Vec<bool> = declarations
            .iter()
            .map(|decl| {
                capability == Capability::PostJob
                    && decl.roles.is_assignable_to(Capability::BuildBreaker)
            })
            .collect();
        // A breaker never precedes a regular post-job.
        let allowed = |before: usize, after: usize| !(breakers[before] && !breakers[after]);

        let own_keys: Vec<DependencyKey> = graph
            .nodes
            .iter()
            .map(|candidate| DependencyKey::Extension(ExtensionId::from(candidate)))
            .collect();

        let mut generators: HashMap<&DependencyKey, Vec<usize>> = HashMap::new();
        for (index, decl) in declarations.iter().enumerate() {
            for key in std::iter::once(&own_keys[index]).chain(&decl.generates) {
                generators.entry(key).or_default().push(index);
            }
        }

        let mut edges = Vec::new();
        for (index, decl) in declarations.iter().enumerate() {
            for key in decl.requires.iter().chain(std::iter::once(&own_keys[index])) {
                match generators.get(key) {
                    Some(providers) => {
                        for &provider in providers {
                            if allowed(provider, index) {
                                edges.push((provider, index, "declared dependency"));
                            }
                        }
                    }
                    None => {
                        tracing::trace!(
                            extension = %graph.nodes[index].name(),
                            %key,
                            "No candidate generates required key"
                        );
                    }
                }
            }
        }

        let phases: Vec<Phase> = declarations
            .iter()
            .zip(&breakers)
            .map(|(decl, &breaker)| if breaker { Phase::Post } else { decl.phase })
            .collect();
        for (i, left) in phases.iter().enumerate() {
            for (j, right) in phases.iter().enumerate() {
                if breakers[i] != breakers[j] {
                    continue;
                }
                if *left == Phase::Pre && *right != Phase::Pre {
                    edges.push((i, j, "pre phase"));
                }
                if *left == Phase::Post && *right != Phase::Post {
                    edges.push((j, i, "post phase"));
                }
            }
        }

        for breaker in (0..breakers.len()).filter(|&i| breakers[i]) {
            for other in (0..breakers.len()).filter(|&i| !breakers[i]) {
                edges.push((other, breaker, "build breaker"));
            }
        }

        for (before, after, reason) in edges {
            graph.link(before, after, reason);
        }

        Ok(graph)
    }

    fn link(&mut self, before: usize, after: usize, reason: &'static str) {
        if before == after {
            return;
        }
        tracing::trace!(
            before = %self.nodes[before].name(),
            after = %self.nodes[after].name(),
            reason,
            "Ordering constraint"
        );
        self.add_edge(before, after);
    }
}
