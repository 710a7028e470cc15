//! Which singletons were wired with which other instances.

use std::collections::{HashMap, HashSet, VecDeque};

/// Reverse dependency edges: target name to the singletons holding it.
#[derive(Default)]
pub(crate) struct DependentGraph {
    edges: HashMap<String, Vec<String>>,
}

impl DependentGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` was populated with the instance of `target`.
    pub(crate) fn record(&mut self, target: &str, dependent: &str) {
        let dependents = self.edges.entry(target.to_string()).or_default();
        if !dependents.iter().any(|d| d == dependent) {
            dependents.push(dependent.to_string());
        }
    }

    /// Every name that transitively holds `name`, nearest first. `name`
    /// itself is never included.
    pub(crate) fn dependents_of(&self, name: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut out = Vec::new();
        seen.insert(name);
        queue.push_back(name);
        while let Some(current) = queue.pop_front() {
            for dependent in self.edges.get(current).into_iter().flatten() {
                if seen.insert(dependent.as_str()) {
                    out.push(dependent.clone());
                    queue.push_back(dependent.as_str());
                }
            }
        }
        out
    }

    /// Drops every edge to or from `name`.
    pub(crate) fn forget(&mut self, name: &str) {
        self.edges.remove(name);
        for dependents in self.edges.values_mut() {
            dependents.retain(|d| d != name);
        }
        self.edges.retain(|_, dependents| !dependents.is_empty());
    }

    pub(crate) fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_are_transitive_and_cycle_safe() {
        let mut graph = DependentGraph::new();
        graph.record("a", "b");
        graph.record("b", "a");
        graph.record("b", "c");
        graph.record("b", "c");
        graph.record("c", "d");

        assert_eq!(graph.dependents_of("a"), vec!["b", "c", "d"]);
        assert!(graph.dependents_of("d").is_empty());
    }

    #[test]
    fn forget_removes_both_directions() {
        let mut graph = DependentGraph::new();
        graph.record("a", "b");
        graph.record("b", "c");
        graph.forget("b");
        assert!(graph.dependents_of("a").is_empty());
        assert!(graph.dependents_of("b").is_empty());
    }
}
