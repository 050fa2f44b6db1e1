//! Dependency edge operations: DAG-guarded creation, soft removal, chain and
//! eligibility queries.

use super::tasks::{get_task_internal, parse_task_row};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::graph;
use crate::types::{DependencyEdge, DependencyKind, EdgeId, Task, TaskId};
use anyhow::Result;
use rusqlite::{Connection, Row, TransactionBehavior, params};
use std::collections::{HashMap, HashSet};
use tracing::warn;

fn parse_edge_row(row: &Row) -> rusqlite::Result<DependencyEdge> {
    let kind_raw: String = row.get("kind")?;

    Ok(DependencyEdge {
        id: row.get("id")?,
        successor_id: row.get("successor_id")?,
        predecessor_id: row.get("predecessor_id")?,
        kind: DependencyKind::parse(&kind_raw).unwrap_or_default(),
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

/// Read the full live edge set. Validation needs to see every edge that could
/// participate in a cycle, and a partial slice read outside the insert
/// transaction could miss one.
fn all_live_edges(conn: &Connection) -> Result<Vec<DependencyEdge>> {
    let mut stmt =
        conn.prepare("SELECT * FROM task_dependencies WHERE deleted_at IS NULL ORDER BY id")?;
    let edges = stmt
        .query_map([], parse_edge_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(edges)
}

impl Database {
    /// Add a precedence edge (predecessor must resolve before successor).
    ///
    /// The read-validate-write sequence runs inside one immediate transaction
    /// so two concurrent inserts cannot jointly commit a cycle that neither
    /// would form alone. On validation failure nothing is written and the
    /// structured error carries the offending cycle path.
    pub fn add_dependency(
        &self,
        successor_id: TaskId,
        predecessor_id: TaskId,
        kind: DependencyKind,
    ) -> Result<DependencyEdge> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing = all_live_edges(&tx)?;
            let validation = graph::validate_new_edge(predecessor_id, successor_id, &existing);
            if !validation.is_valid() {
                return Err(match validation.circular_path {
                    Some(path) => ApiError::dependency_cycle(path),
                    None => ApiError::self_dependency(),
                }
                .into());
            }

            let now = now_ms();
            tx.execute(
                "INSERT INTO task_dependencies (successor_id, predecessor_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![successor_id, predecessor_id, kind.as_str(), now],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok(DependencyEdge {
                id,
                successor_id,
                predecessor_id,
                kind,
                created_at: now,
                deleted_at: None,
            })
        })
    }

    /// Soft-remove a dependency edge. Never hard-deletes; repeat calls (and
    /// unknown edge ids) silently succeed, matching update-regardless
    /// semantics.
    pub fn remove_dependency(&self, edge_id: EdgeId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE task_dependencies SET deleted_at = ?2
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![edge_id, now_ms()],
            )?;
            Ok(())
        })
    }

    /// Live edges for which the given task is the successor (what it depends on).
    pub fn get_dependencies(&self, successor_id: TaskId) -> Result<Vec<DependencyEdge>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_dependencies
                 WHERE successor_id = ?1 AND deleted_at IS NULL
                 ORDER BY id",
            )?;
            let edges = stmt
                .query_map(params![successor_id], parse_edge_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(edges)
        })
    }

    /// Live edges for which the given task is the predecessor (what depends on it).
    pub fn get_successor_edges(&self, predecessor_id: TaskId) -> Result<Vec<DependencyEdge>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_dependencies
                 WHERE predecessor_id = ?1 AND deleted_at IS NULL
                 ORDER BY id",
            )?;
            let edges = stmt
                .query_map(params![predecessor_id], parse_edge_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(edges)
        })
    }

    /// All tasks that must transitively resolve before `task_id`, depth-first,
    /// predecessor-before-dependent, no duplicates. Empty for a task with no
    /// predecessors.
    pub fn get_dependency_chain(&self, task_id: TaskId) -> Result<Vec<TaskId>> {
        self.with_conn(|conn| {
            // successor -> direct predecessors, from one consistent read.
            let mut predecessors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
            for edge in all_live_edges(conn)? {
                predecessors
                    .entry(edge.successor_id)
                    .or_default()
                    .push(edge.predecessor_id);
            }

            let empty: Vec<TaskId> = Vec::new();
            let mut chain: Vec<TaskId> = Vec::new();
            let mut in_chain: HashSet<TaskId> = HashSet::new();
            let mut visited: HashSet<TaskId> = HashSet::from([task_id]);
            // (task, index of the next predecessor to explore)
            let mut stack: Vec<(TaskId, usize)> = vec![(task_id, 0)];

            // Post-order: a task enters the chain only after all of its own
            // predecessors have. The visited guard bounds the walk even if a
            // cycle ever slipped into the stored edges.
            while let Some(frame) = stack.last_mut() {
                let preds = predecessors.get(&frame.0).unwrap_or(&empty);
                if frame.1 < preds.len() {
                    let pred = preds[frame.1];
                    frame.1 += 1;
                    if visited.insert(pred) {
                        stack.push((pred, 0));
                    }
                } else {
                    let (done, _) = match stack.pop() {
                        Some(f) => f,
                        None => break,
                    };
                    if done != task_id && in_chain.insert(done) {
                        chain.push(done);
                    }
                }
            }

            Ok(chain)
        })
    }

    /// Whether a task is eligible to start: every direct predecessor must be
    /// completed or cancelled.
    ///
    /// Fail-open by policy: a dangling predecessor id or an internal lookup
    /// error yields `true`. Blocking work on a broken lookup was judged worse
    /// than admitting a possibly-premature start; callers relying on a hard
    /// guarantee must not, and the policy is deliberate, inherited product
    /// behavior. The dependency kind is stored but not consulted here.
    pub fn can_task_start(&self, task_id: TaskId) -> bool {
        match self.can_task_start_checked(task_id) {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(task_id, error = %e, "Eligibility lookup failed; failing open");
                true
            }
        }
    }

    fn can_task_start_checked(&self, task_id: TaskId) -> Result<bool> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT predecessor_id FROM task_dependencies
                 WHERE successor_id = ?1 AND deleted_at IS NULL",
            )?;
            let predecessor_ids = stmt
                .query_map(params![task_id], |row| row.get::<_, TaskId>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for predecessor_id in predecessor_ids {
                // Dangling predecessor (task deleted out from under the edge):
                // non-blocking.
                if let Some(predecessor) = get_task_internal(conn, predecessor_id)?
                    && predecessor.status.blocks_successors()
                {
                    return Ok(false);
                }
            }

            Ok(true)
        })
    }

    /// Full task records of the direct successors of `task_id`: what
    /// completing this task would unblock.
    pub fn get_blocked_tasks(&self, task_id: TaskId) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT t.*
                 FROM tasks t
                 INNER JOIN task_dependencies d ON t.id = d.successor_id
                 WHERE d.predecessor_id = ?1
                 AND d.deleted_at IS NULL
                 AND t.deleted_at IS NULL
                 ORDER BY t.created_at",
            )?;
            let tasks = stmt
                .query_map(params![task_id], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Candidate predecessor tasks for a successor: every live task except the
    /// successor itself, optionally scoped to a team. Cycle safety is still
    /// checked at insert time; this only trims the obvious non-candidates.
    pub fn get_available_predecessors(
        &self,
        successor_id: TaskId,
        team_id: Option<&str>,
    ) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let tasks = if let Some(team) = team_id {
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks
                     WHERE id <> ?1 AND team_id = ?2 AND deleted_at IS NULL
                     ORDER BY created_at",
                )?;
                stmt.query_map(params![successor_id, team], parse_task_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks
                     WHERE id <> ?1 AND deleted_at IS NULL
                     ORDER BY created_at",
                )?;
                stmt.query_map(params![successor_id], parse_task_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };

            Ok(tasks)
        })
    }
}
