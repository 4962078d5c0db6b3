use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error_codes;
use crate::ids::JobId;

/// Why one id in a batch was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: JobId,
    pub error_code: String,
    pub message: String,
}

impl ItemFailure {
    pub fn new(id: JobId, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

/// Partitioned result of a batch mutation as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub succeeded_ids: Vec<JobId>,
    pub failed: Vec<ItemFailure>,
}

/// Result of a single-item mutation.
///
/// On the wire this is `{"ok": true}` or
/// `{"ok": false, "error_code": "...", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SingleResultWire", into = "SingleResultWire")]
pub enum SingleResult {
    Ok,
    Err { error_code: String, message: String },
}

#[derive(Clone, Serialize, Deserialize)]
struct SingleResultWire {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<SingleResultWire> for SingleResult {
    fn from(wire: SingleResultWire) -> Self {
        if wire.ok {
            Self::Ok
        } else {
            Self::Err {
                error_code: wire
                    .error_code
                    .unwrap_or_else(|| error_codes::INTERNAL_ERROR.to_string()),
                message: wire.message.unwrap_or_default(),
            }
        }
    }
}

impl From<SingleResult> for SingleResultWire {
    fn from(result: SingleResult) -> Self {
        match result {
            SingleResult::Ok => Self {
                ok: true,
                error_code: None,
                message: None,
            },
            SingleResult::Err {
                error_code,
                message,
            } => Self {
                ok: false,
                error_code: Some(error_code),
                message: Some(message),
            },
        }
    }
}

/// What the mutation executor hands back when the request itself went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutorResponse {
    Batch(BatchResult),
    Single(SingleResult),
}

impl BatchResult {
    pub fn all_succeeded(targets: &[JobId]) -> Self {
        Self {
            succeeded_ids: targets.to_vec(),
            failed: Vec::new(),
        }
    }

    pub fn all_failed(targets: &[JobId], error_code: &str, message: &str) -> Self {
        Self {
            succeeded_ids: Vec::new(),
            failed: targets
                .iter()
                .map(|id| ItemFailure::new(id.clone(), error_code, message))
                .collect(),
        }
    }

    /// Bring a server result in line with the targets that were sent.
    ///
    /// - ids that were not targeted are dropped
    /// - an id reported both ways counts as failed
    /// - duplicates collapse to their first occurrence
    /// - targets the server never mentioned are failed with `NOT_FOUND`
    ///
    /// Succeeded ids come back in target order. Failures keep the server's
    /// order, followed by the synthesised ones in target order.
    pub fn normalize(self, targets: &[JobId]) -> Self {
        let target_set: HashSet<&JobId> = targets.iter().collect();

        let mut failed = Vec::with_capacity(self.failed.len());
        let mut failed_ids: HashSet<JobId> = HashSet::new();
        for failure in self.failed {
            if !target_set.contains(&failure.id) || failed_ids.contains(&failure.id) {
                continue;
            }
            failed_ids.insert(failure.id.clone());
            failed.push(failure);
        }

        let reported_ok: HashSet<&JobId> = self.succeeded_ids.iter().collect();
        let mut succeeded_ids = Vec::new();
        for id in targets {
            if failed_ids.contains(id) {
                continue;
            }
            if reported_ok.contains(id) {
                if !succeeded_ids.contains(id) {
                    succeeded_ids.push(id.clone());
                }
            } else {
                failed_ids.insert(id.clone());
                failed.push(ItemFailure::new(
                    id.clone(),
                    error_codes::NOT_FOUND,
                    "id missing from server response",
                ));
            }
        }

        Self {
            succeeded_ids,
            failed,
        }
    }

    pub fn failed_ids(&self) -> Vec<JobId> {
        self.failed.iter().map(|f| f.id.clone()).collect()
    }
}

impl ExecutorResponse {
    /// Expand into a normalised batch result over `targets`.
    pub fn into_batch(self, targets: &[JobId]) -> BatchResult {
        match self {
            Self::Batch(batch) => batch.normalize(targets),
            Self::Single(SingleResult::Ok) => BatchResult::all_succeeded(targets),
            Self::Single(SingleResult::Err {
                error_code,
                message,
            }) => BatchResult::all_failed(targets, &error_code, &message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<JobId> {
        raw.iter().map(|s| JobId::from(*s)).collect()
    }

    #[test]
    fn test_normalize_marks_silently_dropped_ids_as_not_found() {
        let result = BatchResult {
            succeeded_ids: ids(&["1"]),
            failed: vec![ItemFailure::new("2".into(), "LOCKED", "locked")],
        }
        .normalize(&ids(&["1", "2", "3"]));

        assert_eq!(result.succeeded_ids, ids(&["1"]));
        assert_eq!(result.failed_ids(), ids(&["2", "3"]));
        assert_eq!(result.failed[1].error_code, error_codes::NOT_FOUND);
    }

    #[test]
    fn test_normalize_drops_untargeted_ids_and_prefers_failure_on_conflict() {
        let result = BatchResult {
            succeeded_ids: ids(&["1", "2", "9"]),
            failed: vec![
                ItemFailure::new("2".into(), "HAS_AUDIT_HISTORY", "audit"),
                ItemFailure::new("8".into(), "X", "x"),
            ],
        }
        .normalize(&ids(&["1", "2"]));

        assert_eq!(result.succeeded_ids, ids(&["1"]));
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].error_code, "HAS_AUDIT_HISTORY");
    }

    #[test]
    fn test_single_error_fails_every_target_with_the_same_code() {
        let batch = ExecutorResponse::Single(SingleResult::Err {
            error_code: "NOT_ELIGIBLE_FOR_DELETE".into(),
            message: "nope".into(),
        })
        .into_batch(&ids(&["4"]));
        assert!(batch.succeeded_ids.is_empty());
        assert_eq!(batch.failed[0].error_code, "NOT_ELIGIBLE_FOR_DELETE");
    }

    #[test]
    fn test_executor_response_parses_both_wire_shapes() {
        let single: ExecutorResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(single, ExecutorResponse::Single(SingleResult::Ok));

        let batch: ExecutorResponse = serde_json::from_str(
            r#"{"succeeded_ids":["1"],"failed":[{"id":"2","error_code":"LOCKED","message":"m"}]}"#,
        )
        .unwrap();
        assert!(matches!(batch, ExecutorResponse::Batch(_)));

        let rejected: ExecutorResponse =
            serde_json::from_str(r#"{"ok":false,"error_code":"LOCKED","message":"m"}"#).unwrap();
        assert_eq!(
            rejected,
            ExecutorResponse::Single(SingleResult::Err {
                error_code: "LOCKED".into(),
                message: "m".into(),
            })
        );
    }
}
