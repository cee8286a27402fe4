use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{GenerationConfig, NewExceptionData, RecurrenceException, RecurrenceInstance};
use crate::pattern::RecurrencePattern;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

// Re-export domain modules
pub mod exceptions;
pub mod generation;
pub mod instances;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for instance queries and state changes
#[async_trait]
pub trait InstanceRepository {
    async fn find_instance_by_id(&self, id: Uuid) -> Result<Option<RecurrenceInstance>, CoreError>;
    /// All instances of a task, ascending by due date
    async fn find_instances_by_task(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<RecurrenceInstance>, CoreError>;
    /// Instances of a task with `due_date` in `[start, end)`, ascending
    async fn find_instances_in_range(
        &self,
        task_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError>;
    /// Toggles completion; `completed_at` is set iff `completed` is true.
    /// An unknown id is rejected with `NotFound` and nothing is mutated.
    async fn set_instance_completed(
        &self,
        id: Uuid,
        completed: bool,
    ) -> Result<RecurrenceInstance, CoreError>;
    /// Removes every instance of `task_id` with `due_date >= from_date`,
    /// leaving other tasks' series untouched. Returns the removed count.
    async fn delete_future_instances(
        &self,
        task_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<usize, CoreError>;
}

/// Domain-specific trait for the exception ledger
#[async_trait]
pub trait ExceptionRepository {
    async fn find_exception(
        &self,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<RecurrenceException>, CoreError>;
    async fn find_task_exceptions(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<RecurrenceException>, CoreError>;
    /// Records an overlay, replacing any previous one for the same date
    async fn upsert_exception(
        &self,
        data: NewExceptionData,
    ) -> Result<RecurrenceException, CoreError>;
    /// Clears an overlay; the date becomes eligible for regeneration again
    async fn remove_exception(&self, task_id: Uuid, date: NaiveDate) -> Result<(), CoreError>;
    async fn skip_occurrence(&self, task_id: Uuid, date: NaiveDate) -> Result<(), CoreError>;
    /// Moves the occurrence at `old_date` to `new_date` and returns the
    /// instance now scheduled there. Rejected with `NotFound` when no
    /// instance exists at `old_date`.
    async fn reschedule_occurrence(
        &self,
        task_id: Uuid,
        old_date: NaiveDate,
        new_date: NaiveDate,
    ) -> Result<RecurrenceInstance, CoreError>;
    /// Deletes a single occurrence and records a `Deleted` overlay so
    /// regeneration does not resurrect the slot
    async fn delete_occurrence(&self, instance_id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for windowed instance generation
#[async_trait]
pub trait GenerationRepository {
    /// Materializes instances of `pattern` in `[range_start, range_end)` and
    /// returns everything present in the window afterwards. Upserts keyed by
    /// (`task_id`, `due_date`) make repeated and overlapping calls
    /// idempotent. An empty or inverted range yields an empty list.
    async fn ensure_instances(
        &self,
        task_id: Uuid,
        base_task_id: Uuid,
        pattern: &RecurrencePattern,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError>;
    /// `ensure_instances` over the configured default window around `today`
    async fn ensure_upcoming_instances(
        &self,
        task_id: Uuid,
        base_task_id: Uuid,
        pattern: &RecurrencePattern,
        today: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError>;
    /// Read-only window query; never generates
    async fn instances_in_range(
        &self,
        task_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository: InstanceRepository + ExceptionRepository + GenerationRepository {
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    config: GenerationConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, config: GenerationConfig) -> Self {
        Self { pool, config }
    }

    pub fn with_defaults(pool: DbPool) -> Self {
        Self::new(pool, GenerationConfig::default())
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a reference to the generation configuration for internal use
    pub(crate) fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

impl Repository for SqliteRepository {}
