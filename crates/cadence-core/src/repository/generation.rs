use crate::error::CoreError;
use crate::models::{RecurrenceException, RecurrenceInstance};
use crate::pattern::RecurrencePattern;
use crate::repository::{InstanceRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
impl super::GenerationRepository for SqliteRepository {
    async fn ensure_instances(
        &self,
        task_id: Uuid,
        base_task_id: Uuid,
        pattern: &RecurrencePattern,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError> {
        // Empty and inverted windows are a defined no-op, not an error
        if range_end <= range_start {
            return Ok(Vec::new());
        }

        let mut tx = self.pool().begin().await?;

        // Overlays win over the matcher, so load them up front for O(1)
        // lookup during the walk
        let exceptions: Vec<RecurrenceException> =
            sqlx::query_as("SELECT * FROM recurrence_exceptions WHERE task_id = $1")
                .bind(task_id)
                .fetch_all(&mut *tx)
                .await?;
        let overlay_dates: HashSet<NaiveDate> = exceptions.iter().map(|e| e.date).collect();

        let existing: Vec<RecurrenceInstance> = sqlx::query_as(
            r#"SELECT * FROM recurrence_instances
            WHERE task_id = $1 AND due_date >= $2 AND due_date < $3"#,
        )
        .bind(task_id)
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&mut *tx)
        .await?;
        let existing_dates: HashSet<NaiveDate> = existing.iter().map(|i| i.due_date).collect();

        let mut materialized = 0usize;
        let mut cursor = pattern.start_date.max(range_start);

        while cursor < range_end {
            if let Some(end) = pattern.end_date {
                if cursor >= end {
                    break;
                }
            }

            if overlay_dates.contains(&cursor) || pattern.is_excluded(cursor) {
                // The slot is overridden; a rescheduled occurrence is
                // represented at its new date instead
            } else if pattern.matches(cursor) {
                if !existing_dates.contains(&cursor) {
                    let instance = RecurrenceInstance::new(task_id, base_task_id, cursor);
                    Self::upsert_instance_in_transaction(&mut tx, &instance).await?;
                }
                materialized += 1;
                if materialized >= self.config().max_instances_per_call {
                    warn!(%task_id, materialized, "generation cap reached, stopping early");
                    break;
                }
            }

            cursor = match cursor.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        tx.commit().await?;
        debug!(%task_id, materialized, "ensured instances in window");

        self.find_instances_in_range(task_id, range_start, range_end)
            .await
    }

    async fn ensure_upcoming_instances(
        &self,
        task_id: Uuid,
        base_task_id: Uuid,
        pattern: &RecurrencePattern,
        today: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError> {
        let (window_start, window_end) = self.config().window_around(today);
        self.ensure_instances(task_id, base_task_id, pattern, window_start, window_end)
            .await
    }

    async fn instances_in_range(
        &self,
        task_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError> {
        self.find_instances_in_range(task_id, start, end).await
    }
}
