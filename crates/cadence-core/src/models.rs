use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Namespace for deriving deterministic instance ids from their
/// (task, due date) key.
pub const INSTANCE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x1f3a_9c52_7b6d_4e01_8a2c_5d90_e7b4_c613);

/// Stable id for the instance of `task_id` due on `due_date`. Repeated
/// generation for the same date always lands on the same id, which is what
/// makes regeneration detectable by key.
pub fn instance_id(task_id: Uuid, due_date: NaiveDate) -> Uuid {
    let key = format!("{}:{}", task_id, due_date);
    Uuid::new_v5(&INSTANCE_ID_NAMESPACE, key.as_bytes())
}

/// Why a single occurrence date deviates from its pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExceptionReason {
    /// Hide this occurrence; the slot stays empty
    Skipped,
    /// The occurrence moved; a scheduled instance exists at the new date
    Rescheduled,
    /// The occurrence was removed outright
    Deleted,
}

impl std::fmt::Display for ExceptionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExceptionReason::Skipped => write!(f, "skipped"),
            ExceptionReason::Rescheduled => write!(f, "rescheduled"),
            ExceptionReason::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for ExceptionReason {
    type Err = ParseExceptionReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skipped" => Ok(ExceptionReason::Skipped),
            "rescheduled" => Ok(ExceptionReason::Rescheduled),
            "deleted" => Ok(ExceptionReason::Deleted),
            _ => Err(ParseExceptionReasonError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid exception reason: {0}")]
pub struct ParseExceptionReasonError(String);

/// A materialized occurrence of a recurring task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurrenceInstance {
    /// Deterministic UUIDv5 of (`task_id`, `due_date`)
    pub id: Uuid,
    pub task_id: Uuid,
    /// The originating task the series is derived from
    pub base_task_id: Uuid,
    /// Day precision; start-of-day normalization is carried by the type
    pub due_date: NaiveDate,
    pub is_exception: bool,
    /// Mirrors the ledger entry when `is_exception` is set
    pub exception_reason: Option<ExceptionReason>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrenceInstance {
    pub fn new(task_id: Uuid, base_task_id: Uuid, due_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: instance_id(task_id, due_date),
            task_id,
            base_task_id,
            due_date,
            is_exception: false,
            exception_reason: None,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Still on the schedule, not overridden by an exception.
    pub fn is_scheduled(&self) -> bool {
        !self.is_exception
    }
}

/// A per-date overlay on a recurring series. At most one overlay is active
/// per (`task_id`, `date`); an upsert replaces any previous one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurrenceException {
    pub task_id: Uuid,
    /// The originally scheduled date being overridden
    pub date: NaiveDate,
    pub reason: ExceptionReason,
    /// Where the occurrence moved; present iff `reason` is `Rescheduled`
    pub new_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Data for recording a new exception overlay
#[derive(Debug, Clone)]
pub struct NewExceptionData {
    pub task_id: Uuid,
    pub date: NaiveDate,
    pub reason: ExceptionReason,
    pub new_date: Option<NaiveDate>,
}

/// Configuration for instance generation behavior
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Hard cap on instances produced by a single generation call, bounding
    /// the cost of open-ended patterns with no end date
    pub max_instances_per_call: usize,
    /// Default generation window in days
    pub lookahead_days: i64,
    /// Include near-past occurrences in default windows (days)
    pub grace_days: i64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_instances_per_call: 366,
            lookahead_days: 30,
            grace_days: 3,
        }
    }
}

impl GenerationConfig {
    /// Default generation window around `today`.
    pub fn window_around(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            today - chrono::Duration::days(self.grace_days),
            today + chrono::Duration::days(self.lookahead_days),
        )
    }
}
