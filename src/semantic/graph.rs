//! The cross-stage dependency graph.
//!
//! Index-based: an edge `dependent → dependency` exists for `FROM <stage>`
//! and for every `COPY --from` that resolves to a prior stage. ONBUILD
//! copies never create edges. Reachability from the final stage defines
//! which stages contribute to the built image.

use std::collections::VecDeque;

/// Forward and reverse dependency edges between stages.
#[derive(Debug, Clone)]
pub struct StageGraph {
    /// `forward[i]` = stages that stage `i` depends on.
    forward: Vec<Vec<usize>>,
    /// `reverse[i]` = stages that depend on stage `i`.
    reverse: Vec<Vec<usize>>,
    /// Raw external `COPY --from` references per stage (registry images).
    external_refs: Vec<Vec<String>>,
}

impl StageGraph {
    pub fn new(stage_count: usize) -> Self {
        StageGraph {
            forward: vec![Vec::new(); stage_count],
            reverse: vec![Vec::new(); stage_count],
            external_refs: vec![Vec::new(); stage_count],
        }
    }

    pub fn stage_count(&self) -> usize {
        self.forward.len()
    }

    /// Records that `dependent` uses the output of `dependency`.
    pub fn add_dependency(&mut self, dependent: usize, dependency: usize) {
        if dependent >= self.forward.len() || dependency >= self.forward.len() {
            return;
        }
        if !self.forward[dependent].contains(&dependency) {
            self.forward[dependent].push(dependency);
            self.reverse[dependency].push(dependent);
        }
    }

    pub fn add_external_ref(&mut self, stage: usize, raw: impl Into<String>) {
        if let Some(refs) = self.external_refs.get_mut(stage) {
            refs.push(raw.into());
        }
    }

    pub fn dependencies(&self, stage: usize) -> &[usize] {
        self.forward.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents(&self, stage: usize) -> &[usize] {
        self.reverse.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn external_refs(&self, stage: usize) -> &[String] {
        self.external_refs.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// BFS over forward edges from the final stage.
    pub fn reachable(&self) -> Vec<bool> {
        let count = self.stage_count();
        let mut reachable = vec![false; count];
        let Some(last) = count.checked_sub(1) else {
            return reachable;
        };

        let mut queue = VecDeque::from([last]);
        reachable[last] = true;
        while let Some(stage) = queue.pop_front() {
            for &dep in &self.forward[stage] {
                if !reachable[dep] {
                    reachable[dep] = true;
                    queue.push_back(dep);
                }
            }
        }
        reachable
    }

    /// Stages that never contribute to the final image, in index order.
    pub fn unreachable_stages(&self) -> Vec<usize> {
        self.reachable()
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| (!r).then_some(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_stage_is_reachable() {
        let graph = StageGraph::new(1);
        assert!(graph.unreachable_stages().is_empty());
    }

    #[test]
    fn test_unused_middle_stage() {
        // 0: builder, 1: unused, 2: final copies from 0
        let mut graph = StageGraph::new(3);
        graph.add_dependency(2, 0);
        assert_eq!(graph.unreachable_stages(), [1]);
    }

    #[test]
    fn test_transitive_reachability() {
        // 3 -> 2 -> 1 -> 0
        let mut graph = StageGraph::new(4);
        graph.add_dependency(3, 2);
        graph.add_dependency(2, 1);
        graph.add_dependency(1, 0);
        assert!(graph.unreachable_stages().is_empty());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = StageGraph::new(2);
        graph.add_dependency(1, 0);
        graph.add_dependency(1, 0);
        assert_eq!(graph.dependencies(1), [0]);
        assert_eq!(graph.dependents(0), [1]);
    }

    #[test]
    fn test_out_of_range_edge_ignored() {
        let mut graph = StageGraph::new(2);
        graph.add_dependency(1, 7);
        assert!(graph.dependencies(1).is_empty());
    }

    #[test]
    fn test_empty_graph() {
        let graph = StageGraph::new(0);
        assert!(graph.reachable().is_empty());
        assert!(graph.unreachable_stages().is_empty());
    }
}
