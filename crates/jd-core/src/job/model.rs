use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::ids::{JobId, UserId};
use crate::job::CollectionItem;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "on_hold" => Some(Self::OnHold),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user a job is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// A tracked work item as listed on the job dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub status: JobStatus,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Convenience constructor used by fixtures and tests.
    pub fn new(id: impl Into<JobId>, title: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            assignee: None,
            site: None,
            due_date: None,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl CollectionItem for Job {
    fn item_id(&self) -> &JobId {
        &self.id
    }

    fn set_status(&mut self, status: &JobStatus) {
        self.status = *status;
    }

    fn set_assignee(&mut self, assignee: Option<&Assignee>) {
        self.assignee = assignee.cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Active,
            JobStatus::OnHold,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("archived"), None);
    }

    #[test]
    fn test_job_deserializes_with_optional_fields_missing() {
        let job: Job = serde_json::from_str(
            r#"{"id":"1","title":"Boiler check","status":"on_hold","updated_at":"2025-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::OnHold);
        assert!(job.assignee.is_none());
        assert!(job.due_date.is_none());
    }

    #[test]
    fn test_set_assignee_none_clears_assignment() {
        let mut job = Job::new("1", "Inspect", JobStatus::Active);
        job.set_assignee(Some(&Assignee {
            user_id: UserId::new("u1"),
            name: "Sam".into(),
            email: "sam@example.com".into(),
        }));
        assert!(job.assignee.is_some());
        job.set_assignee(None);
        assert!(job.assignee.is_none());
    }
}
