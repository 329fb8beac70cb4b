use crate::conditions::Condition;
use crate::dispatch::Platform;
use crate::owner::Owner;
use crate::range::RangeRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Grid Models
// ============================================================================

/// A fetched snapshot of cell values. Rows may be ragged: a missing row or
/// trailing cell is read back as the empty string.
pub type Grid = Vec<Vec<String>>;

/// Read a cell from a possibly ragged grid, treating absent cells as empty
pub fn cell_value(grid: &Grid, row: usize, col: usize) -> &str {
    grid.get(row)
        .and_then(|cells| cells.get(col))
        .map(String::as_str)
        .unwrap_or("")
}

/// A single changed cell, addressed in sheet coordinates.
///
/// `row` and `col` are zero-based positions on the sheet itself, not offsets
/// into the monitored slice, so `address` matches what a user sees in the
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellChange {
    pub row: u32,
    pub col: u32,
    pub address: String,
    pub old_value: String,
    pub new_value: String,
}

// ============================================================================
// Job Models
// ============================================================================

/// A running monitoring job owned by the registry
#[derive(Debug, Clone)]
pub struct MonitoringJob {
    pub id: Uuid,
    pub source_id: String,
    pub source_name: String,
    pub range_expr: String,
    pub range: RangeRef,
    pub frequency: Duration,
    pub webhook_url: String,
    pub platform: Platform,
    pub mention: Option<String>,
    pub conditions: Vec<Condition>,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Caller-supplied job definition, as accepted by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub range: String,
    pub frequency_seconds: u64,
    pub webhook_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Durable job record, sufficient on its own to recreate a running job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedJob {
    pub id: Uuid,
    pub source_id: String,
    pub source_name: String,
    pub range: String,
    pub frequency_seconds: u64,
    pub webhook_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PersistedJob {
    /// Snapshot the durable fields of a running job
    pub fn from_job(job: &MonitoringJob) -> Self {
        Self {
            id: job.id,
            source_id: job.source_id.clone(),
            source_name: job.source_name.clone(),
            range: job.range_expr.clone(),
            frequency_seconds: job.frequency.as_secs(),
            webhook_url: job.webhook_url.clone(),
            mention: job.mention.clone(),
            conditions: job.conditions.clone(),
            owner_id: job.owner.session_id.clone(),
            email: job.owner.email.clone(),
            created_at: job.created_at,
        }
    }

    /// The owner identity carried by this record
    pub fn owner(&self) -> Owner {
        Owner {
            session_id: self.owner_id.clone(),
            email: self.email.clone(),
        }
    }

    /// The job spec carried by this record
    pub fn spec(&self) -> JobSpec {
        JobSpec {
            source_id: self.source_id.clone(),
            source_name: Some(self.source_name.clone()),
            range: self.range.clone(),
            frequency_seconds: self.frequency_seconds,
            webhook_url: self.webhook_url.clone(),
            mention: self.mention.clone(),
            conditions: self.conditions.clone(),
        }
    }
}
