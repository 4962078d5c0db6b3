//! Command line surface: seed a backend, run one list operation, report.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use jd_core::{
    AppConfig, Assignee, CollectionSnapshot, ExportFormat, Job, JobId, JobQuery, JobStatus,
    MutationOp, MutationOutcome, UserId,
};
use jd_infra::load_fixture;

use crate::bootstrap::wiring::wire_in_memory;

const EMBEDDED_FIXTURE: &str = include_str!("../fixtures/jobs.json");

#[derive(Parser, Debug)]
#[command(name = "jobdesk")]
#[command(about = "Job list cache with optimistic batch mutations", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON array of jobs to seed the backend with
    #[arg(short, long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Make the backend refuse a job, as ID=ERROR_CODE (repeatable)
    #[arg(long = "reject", value_parser = parse_rejection, global = true)]
    pub rejections: Vec<(String, String)>,

    /// Override the mutation timeout
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the job list
    List {
        /// Only jobs in this status
        #[arg(short, long, value_parser = parse_status)]
        status: Option<JobStatus>,
        /// Title search term
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Change the status of several jobs
    Status {
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        #[arg(short, long, value_parser = parse_status)]
        to: JobStatus,
    },
    /// Assign several jobs; without --user they are unassigned
    Assign {
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        user: Option<String>,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Archive one job
    Archive {
        #[arg(short, long)]
        id: String,
    },
    /// Delete several jobs
    Delete {
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
    /// Export several jobs
    Export {
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        #[arg(short, long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

fn parse_rejection(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, code)) if !id.is_empty() && !code.is_empty() => {
            Ok((id.to_string(), code.to_string()))
        }
        _ => Err(format!("expected ID=ERROR_CODE, got `{raw}`")),
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    JobStatus::parse(raw).ok_or_else(|| {
        format!("unknown status `{raw}` (pending, active, on_hold, completed, cancelled)")
    })
}

/// What a command printed: the mutation outcome if there was one, and the list
/// as the cache holds it afterwards.
#[derive(Debug, Serialize)]
pub struct CommandReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MutationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub snapshot: Option<CollectionSnapshot<Job>>,
}

impl Commands {
    fn query(&self) -> JobQuery {
        match self {
            Self::List { status, search } => {
                let mut query = JobQuery::default();
                if let Some(status) = status {
                    query = query.with_filter("status", status.as_str());
                }
                query.search = search.clone();
                query
            }
            _ => JobQuery::default(),
        }
    }

    fn mutation(self) -> Option<(MutationOp, Vec<JobId>)> {
        let to_ids = |ids: Vec<String>| ids.into_iter().map(JobId::from).collect::<Vec<_>>();
        match self {
            Self::List { .. } => None,
            Self::Status { ids, to } => {
                Some((MutationOp::BulkStatusChange { status: to }, to_ids(ids)))
            }
            Self::Assign {
                ids,
                user,
                name,
                email,
            } => {
                let assignee = user.map(|user| Assignee {
                    name: name.unwrap_or_else(|| user.clone()),
                    email: email.unwrap_or_default(),
                    user_id: UserId::new(user),
                });
                Some((MutationOp::BulkAssign { assignee }, to_ids(ids)))
            }
            Self::Archive { id } => Some((MutationOp::Archive, vec![JobId::from(id)])),
            Self::Delete { ids } => Some((MutationOp::BulkDelete, to_ids(ids))),
            Self::Export { ids, format } => Some((
                MutationOp::BulkExport {
                    format: format.into(),
                },
                to_ids(ids),
            )),
        }
    }
}

async fn seed_jobs(fixture: Option<&PathBuf>) -> anyhow::Result<Vec<Job>> {
    match fixture {
        Some(path) => load_fixture(path).await,
        None => serde_json::from_str(EMBEDDED_FIXTURE).context("parse embedded fixture failed"),
    }
}

/// Run one command against a freshly seeded in-memory backend.
pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<CommandReport> {
    if let Some(timeout_ms) = cli.timeout_ms {
        config.cache.mutation_timeout_ms = timeout_ms;
    }

    let jobs = seed_jobs(cli.fixture.as_ref()).await?;
    let wired = wire_in_memory(&config, jobs);
    for (id, code) in &cli.rejections {
        wired.backend.reject(id.as_str(), code.as_str());
    }

    let key = cli.command.query().key();
    wired
        .cache
        .refresh(&key)
        .await
        .with_context(|| format!("initial fetch failed for {key}"))?;

    let outcome = match cli.command.mutation() {
        Some((op, targets)) => {
            info!(kind = %op.kind(), targets = targets.len(), "running mutation");
            Some(
                wired
                    .cache
                    .execute_with_timeout(&key, op, &targets, Duration::from_millis(config.cache.mutation_timeout_ms))
                    .await,
            )
        }
        None => None,
    };

    Ok(CommandReport {
        summary: outcome.as_ref().map(MutationOutcome::summary),
        outcome,
        snapshot: wired.cache.snapshot(&key),
    })
}
