//! Core types for the task dependency service.

use serde::{Deserialize, Serialize};

/// Opaque task identifier. Tasks are assigned ids by the store on creation.
pub type TaskId = i64;

/// Unique identifier of a dependency edge.
pub type EdgeId = i64;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a predecessor in this status still blocks its successors.
    /// Completed and cancelled predecessors are considered resolved.
    pub fn blocks_successors(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// A task row. Lifecycle is owned by the wider task store; the dependency
/// service reads id and status and never mutates anything beyond status and
/// soft-delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub team_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Relationship kind of a precedence edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Predecessor must fully complete before the successor starts.
    #[default]
    FinishToStart,
    /// Predecessor must have started before the successor starts.
    StartToStart,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "finish_to_start",
            DependencyKind::StartToStart => "start_to_start",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "finish_to_start" => Some(DependencyKind::FinishToStart),
            "start_to_start" => Some(DependencyKind::StartToStart),
            _ => None,
        }
    }
}

/// A directed precedence edge: `predecessor_id` must resolve before
/// `successor_id` may proceed. Identity is immutable once created; only
/// `deleted_at` changes afterwards (soft removal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: EdgeId,
    pub successor_id: TaskId,
    pub predecessor_id: TaskId,
    pub kind: DependencyKind,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl DependencyEdge {
    /// Whether this edge participates in graph computations.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
