//! Dependency graph construction and cycle detection.
//!
//! The graph is ephemeral: it is rebuilt from the current live edge set on
//! every validation or chain query. Edges can change between calls, so a
//! cached graph would silently admit cycles.

use crate::types::{DependencyEdge, TaskId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Structured outcome of validating a candidate edge.
///
/// Validation failures are results, not errors: the caller renders the
/// specific message (and cycle path, when present) to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_path: Option<Vec<TaskId>>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            circular_path: None,
        }
    }

    pub fn self_dependency() -> Self {
        Self {
            valid: false,
            error: Some("Task cannot depend on itself".to_string()),
            circular_path: None,
        }
    }

    /// A cycle was found. `path` is the ordered loop: first and last task id
    /// match, and each consecutive pair is an edge in the graph.
    pub fn cycle(path: Vec<TaskId>) -> Self {
        Self {
            valid: false,
            error: Some("Circular dependency detected".to_string()),
            circular_path: Some(path),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Adjacency-list view of the precedence edges: predecessor -> successors.
///
/// Every task referenced by any edge (plus explicitly registered endpoints)
/// is a node, even when it has no outgoing edges.
pub struct DependencyGraph {
    adjacency: HashMap<TaskId, Vec<TaskId>>,
    /// Node ids in insertion order, for deterministic traversal.
    nodes: Vec<TaskId>,
}

impl DependencyGraph {
    /// Build the graph from a live edge slice. Soft-deleted edges are skipped.
    pub fn build(edges: &[DependencyEdge]) -> Self {
        let mut graph = Self {
            adjacency: HashMap::new(),
            nodes: Vec::new(),
        };
        for edge in edges.iter().filter(|e| e.is_live()) {
            graph.add_edge(edge.predecessor_id, edge.successor_id);
        }
        graph
    }

    /// Build the graph from the live edges plus a hypothetical new edge.
    pub fn with_candidate(
        edges: &[DependencyEdge],
        predecessor_id: TaskId,
        successor_id: TaskId,
    ) -> Self {
        let mut graph = Self::build(edges);
        graph.add_edge(predecessor_id, successor_id);
        graph
    }

    fn ensure_node(&mut self, id: TaskId) {
        if !self.adjacency.contains_key(&id) {
            self.adjacency.insert(id, Vec::new());
            self.nodes.push(id);
        }
    }

    fn add_edge(&mut self, predecessor_id: TaskId, successor_id: TaskId) {
        self.ensure_node(predecessor_id);
        self.ensure_node(successor_id);
        if let Some(successors) = self.adjacency.get_mut(&predecessor_id) {
            successors.push(successor_id);
        }
    }

    /// Find a cycle, preferring a search rooted at `start` (the successor of
    /// a candidate edge reaches any cycle the edge would close), then
    /// sweeping the remaining unvisited nodes.
    pub fn find_cycle(&self, start: TaskId) -> Option<Vec<TaskId>> {
        let mut visited: HashSet<TaskId> = HashSet::new();

        if self.adjacency.contains_key(&start)
            && let Some(path) = self.cycle_from(start, &mut visited)
        {
            return Some(path);
        }
        for &node in &self.nodes {
            if !visited.contains(&node)
                && let Some(path) = self.cycle_from(node, &mut visited)
            {
                return Some(path);
            }
        }
        None
    }

    /// Iterative depth-first search from one root. Carries the current path
    /// explicitly so cycle reconstruction is a slice of the path, and so
    /// stack depth never depends on graph size.
    fn cycle_from(&self, start: TaskId, visited: &mut HashSet<TaskId>) -> Option<Vec<TaskId>> {
        if visited.contains(&start) {
            return None;
        }

        // (node, index of the next successor to explore)
        let mut stack: Vec<(TaskId, usize)> = vec![(start, 0)];
        let mut path: Vec<TaskId> = vec![start];
        // Maps each on-path node to its position in `path`.
        let mut on_path: HashMap<TaskId, usize> = HashMap::new();
        on_path.insert(start, 0);

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let successors = self
                .adjacency
                .get(&node)
                .map(Vec::as_slice)
                .unwrap_or_default();

            if frame.1 < successors.len() {
                let next = successors[frame.1];
                frame.1 += 1;

                if let Some(&pos) = on_path.get(&next) {
                    // Back edge: the loop is path[pos..] closed with `next`.
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                if !visited.contains(&next) {
                    on_path.insert(next, path.len());
                    path.push(next);
                    stack.push((next, 0));
                }
            } else {
                visited.insert(node);
                stack.pop();
                path.pop();
                on_path.remove(&node);
            }
        }
        None
    }
}

/// Validate a candidate precedence edge (predecessor -> successor) against the
/// supplied live edge set.
///
/// Pure function: nothing is persisted here. The caller must supply enough
/// edges to see any cycle the candidate could close; [`crate::db::Database::add_dependency`]
/// does so inside a single transaction.
pub fn validate_new_edge(
    predecessor_id: TaskId,
    successor_id: TaskId,
    existing_edges: &[DependencyEdge],
) -> ValidationResult {
    if predecessor_id == successor_id {
        return ValidationResult::self_dependency();
    }

    let graph = DependencyGraph::with_candidate(existing_edges, predecessor_id, successor_id);
    match graph.find_cycle(successor_id) {
        Some(path) => ValidationResult::cycle(path),
        None => ValidationResult::ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyKind;

    fn edge(id: i64, predecessor: TaskId, successor: TaskId) -> DependencyEdge {
        DependencyEdge {
            id,
            successor_id: successor,
            predecessor_id: predecessor,
            kind: DependencyKind::FinishToStart,
            created_at: 0,
            deleted_at: None,
        }
    }

    /// Check that a reported path is a genuine cycle: non-empty, closed, and
    /// every consecutive pair is an edge of the graph (or the candidate).
    fn assert_valid_cycle(path: &[TaskId], edges: &[DependencyEdge], candidate: (TaskId, TaskId)) {
        assert!(path.len() >= 2, "cycle path too short: {path:?}");
        assert_eq!(path.first(), path.last(), "cycle not closed: {path:?}");
        for pair in path.windows(2) {
            let found = edges
                .iter()
                .any(|e| e.predecessor_id == pair[0] && e.successor_id == pair[1])
                || (candidate.0 == pair[0] && candidate.1 == pair[1]);
            assert!(found, "{} -> {} is not an edge", pair[0], pair[1]);
        }
    }

    #[test]
    fn self_dependency_rejected_regardless_of_edges() {
        let edges = vec![edge(1, 1, 2), edge(2, 2, 3)];

        let result = validate_new_edge(7, 7, &edges);

        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Task cannot depend on itself"));
        assert!(result.circular_path.is_none());

        // Also with no edges at all.
        assert!(!validate_new_edge(7, 7, &[]).valid);
    }

    #[test]
    fn first_edge_on_empty_graph_is_valid() {
        let result = validate_new_edge(1, 2, &[]);
        assert!(result.valid);
        assert!(result.error.is_none());
    }

    #[test]
    fn direct_two_node_cycle_rejected() {
        let edges = vec![edge(1, 1, 2)]; // 1 -> 2

        let result = validate_new_edge(2, 1, &edges); // candidate 2 -> 1

        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Circular dependency detected"));
        let path = result.circular_path.expect("cycle path");
        assert_valid_cycle(&path, &edges, (2, 1));
    }

    #[test]
    fn three_node_cycle_rejected_with_full_path() {
        // 1 -> 2 -> 3, candidate 3 -> 1 closes the loop.
        let edges = vec![edge(1, 1, 2), edge(2, 2, 3)];

        let result = validate_new_edge(3, 1, &edges);

        assert!(!result.valid);
        let path = result.circular_path.expect("cycle path");
        assert_valid_cycle(&path, &edges, (3, 1));
        // All three tasks participate.
        for id in [1, 2, 3] {
            assert!(path.contains(&id), "task {id} missing from {path:?}");
        }
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn safe_edge_into_existing_chain_is_valid() {
        // 1 -> 2 -> 3; adding 1 -> 3 is a shortcut, not a cycle.
        let edges = vec![edge(1, 1, 2), edge(2, 2, 3)];

        assert!(validate_new_edge(1, 3, &edges).valid);
    }

    #[test]
    fn diamond_shape_is_not_a_cycle() {
        // 1 -> 2, 1 -> 3, 2 -> 4; candidate 3 -> 4 closes a diamond, still a DAG.
        let edges = vec![edge(1, 1, 2), edge(2, 1, 3), edge(3, 2, 4)];

        assert!(validate_new_edge(3, 4, &edges).valid);
    }

    #[test]
    fn soft_deleted_edges_do_not_count() {
        let mut removed = edge(1, 1, 2);
        removed.deleted_at = Some(1000);
        let edges = vec![removed];

        // With 1 -> 2 gone, 2 -> 1 is fine.
        assert!(validate_new_edge(2, 1, &edges).valid);
    }

    #[test]
    fn cycle_away_from_candidate_is_still_found() {
        // Pre-existing cycle 5 -> 6 -> 5 disconnected from the candidate edge.
        // The caller should never supply a cyclic slice, but the sweep over
        // remaining nodes reports it rather than declaring the graph valid.
        let edges = vec![edge(1, 5, 6), edge(2, 6, 5)];

        let result = validate_new_edge(1, 2, &edges);

        assert!(!result.valid);
        let path = result.circular_path.expect("cycle path");
        assert_valid_cycle(&path, &edges, (1, 2));
    }

    #[test]
    fn isolated_endpoints_become_nodes() {
        let graph = DependencyGraph::with_candidate(&[], 10, 20);
        assert!(graph.find_cycle(20).is_none());
        assert!(graph.adjacency.contains_key(&10));
        assert!(graph.adjacency.contains_key(&20));
    }

    #[test]
    fn validation_result_omits_absent_fields_on_the_wire() {
        let ok = serde_json::to_value(ValidationResult::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({ "valid": true }));

        let cycle = serde_json::to_value(ValidationResult::cycle(vec![1, 2, 1])).unwrap();
        assert_eq!(cycle["valid"], false);
        assert_eq!(cycle["circular_path"], serde_json::json!([1, 2, 1]));
    }

    #[test]
    fn long_chain_does_not_overflow() {
        // 10k-node chain exercises the iterative DFS; a recursive version
        // would risk blowing the stack here.
        let edges: Vec<DependencyEdge> = (0..10_000).map(|i| edge(i, i, i + 1)).collect();

        let result = validate_new_edge(10_000, 0, &edges);
        assert!(!result.valid);
        let path = result.circular_path.expect("cycle path");
        assert_eq!(path.len(), 10_002);

        assert!(validate_new_edge(0, 10_000, &edges).valid);
    }
}
