use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::job::{Assignee, JobStatus};

/// The fixed set of mutations the job list supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Archive,
    Delete,
    BulkStatusChange,
    BulkAssign,
    BulkExport,
    BulkDelete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
            Self::BulkStatusChange => "bulk_status_change",
            Self::BulkAssign => "bulk_assign",
            Self::BulkExport => "bulk_export",
            Self::BulkDelete => "bulk_delete",
        }
    }

    /// Batch kinds report per-item results and drive selection reconciliation.
    pub fn is_batch(&self) -> bool {
        !matches!(self, Self::Archive | Self::Delete)
    }
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export file format requested by a bulk export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

/// A mutation together with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationOp {
    Archive,
    Delete,
    BulkStatusChange { status: JobStatus },
    BulkAssign { assignee: Option<Assignee> },
    BulkExport { format: ExportFormat },
    BulkDelete,
}

impl MutationOp {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Archive => MutationKind::Archive,
            Self::Delete => MutationKind::Delete,
            Self::BulkStatusChange { .. } => MutationKind::BulkStatusChange,
            Self::BulkAssign { .. } => MutationKind::BulkAssign,
            Self::BulkExport { .. } => MutationKind::BulkExport,
            Self::BulkDelete => MutationKind::BulkDelete,
        }
    }

    /// Whether the op removes its targets from the list.
    pub fn removes_items(&self) -> bool {
        matches!(self, Self::Archive | Self::Delete | Self::BulkDelete)
    }

    /// Read-only ops never change the cached collection.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::BulkExport { .. })
    }
}
