use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Identifier of a work item ("job") as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

/// Identifier of a user that jobs can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl_id!(JobId, UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_from_number_and_str_compare_equal() {
        let a: JobId = 42u64.into();
        let b: JobId = "42".into();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42");
    }

    #[test]
    fn test_job_id_serializes_as_plain_string() {
        let id = JobId::new("job-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"job-7\"");
    }
}
