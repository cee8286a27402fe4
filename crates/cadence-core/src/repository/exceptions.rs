use crate::error::CoreError;
use crate::models::{ExceptionReason, NewExceptionData, RecurrenceException, RecurrenceInstance};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
impl super::ExceptionRepository for SqliteRepository {
    async fn find_exception(
        &self,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<RecurrenceException>, CoreError> {
        let exception =
            sqlx::query_as("SELECT * FROM recurrence_exceptions WHERE task_id = $1 AND date = $2")
                .bind(task_id)
                .bind(date)
                .fetch_optional(self.pool())
                .await?;
        Ok(exception)
    }

    async fn find_task_exceptions(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<RecurrenceException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM recurrence_exceptions WHERE task_id = $1 ORDER BY date",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn upsert_exception(
        &self,
        data: NewExceptionData,
    ) -> Result<RecurrenceException, CoreError> {
        let mut tx = self.pool().begin().await?;
        let exception = Self::upsert_exception_in_transaction(&mut tx, data).await?;
        tx.commit().await?;
        Ok(exception)
    }

    async fn remove_exception(&self, task_id: Uuid, date: NaiveDate) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let result =
            sqlx::query("DELETE FROM recurrence_exceptions WHERE task_id = $1 AND date = $2")
                .bind(task_id)
                .bind(date)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Exception not found for task {} at {}",
                task_id, date
            )));
        }

        // The slot becomes a plain scheduled occurrence again
        sqlx::query(
            r#"UPDATE recurrence_instances
            SET is_exception = 0, exception_reason = NULL, updated_at = $1
            WHERE task_id = $2 AND due_date = $3"#,
        )
        .bind(Utc::now())
        .bind(task_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn skip_occurrence(&self, task_id: Uuid, date: NaiveDate) -> Result<(), CoreError> {
        self.upsert_exception(NewExceptionData {
            task_id,
            date,
            reason: ExceptionReason::Skipped,
            new_date: None,
        })
        .await?;
        Ok(())
    }

    async fn reschedule_occurrence(
        &self,
        task_id: Uuid,
        old_date: NaiveDate,
        new_date: NaiveDate,
    ) -> Result<RecurrenceInstance, CoreError> {
        if old_date == new_date {
            return Err(CoreError::InvalidInput(
                "Cannot reschedule an occurrence onto its own date".to_string(),
            ));
        }

        let mut tx = self.pool().begin().await?;

        let old_instance: Option<RecurrenceInstance> =
            sqlx::query_as("SELECT * FROM recurrence_instances WHERE task_id = $1 AND due_date = $2")
                .bind(task_id)
                .bind(old_date)
                .fetch_optional(&mut *tx)
                .await?;
        let old_instance = old_instance.ok_or_else(|| {
            CoreError::NotFound(format!("No instance for task {} at {}", task_id, old_date))
        })?;

        // The new-date instance lands first, so a failure part-way leaves a
        // harmless duplicate rather than a lost occurrence
        let moved = RecurrenceInstance::new(task_id, old_instance.base_task_id, new_date);
        Self::upsert_instance_in_transaction(&mut tx, &moved).await?;

        Self::upsert_exception_in_transaction(
            &mut tx,
            NewExceptionData {
                task_id,
                date: old_date,
                reason: ExceptionReason::Rescheduled,
                new_date: Some(new_date),
            },
        )
        .await?;

        tx.commit().await?;
        debug!(%task_id, %old_date, %new_date, "occurrence rescheduled");

        let instance = sqlx::query_as("SELECT * FROM recurrence_instances WHERE id = $1")
            .bind(moved.id)
            .fetch_one(self.pool())
            .await?;
        Ok(instance)
    }

    async fn delete_occurrence(&self, instance_id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let instance: Option<RecurrenceInstance> =
            sqlx::query_as("SELECT * FROM recurrence_instances WHERE id = $1")
                .bind(instance_id)
                .fetch_optional(&mut *tx)
                .await?;
        let instance = instance.ok_or_else(|| {
            CoreError::NotFound(format!("Instance with id {} not found", instance_id))
        })?;

        sqlx::query("DELETE FROM recurrence_instances WHERE id = $1")
            .bind(instance_id)
            .execute(&mut *tx)
            .await?;

        // A deleted overlay keeps regeneration from resurrecting the slot
        Self::upsert_exception_in_transaction(
            &mut tx,
            NewExceptionData {
                task_id: instance.task_id,
                date: instance.due_date,
                reason: ExceptionReason::Deleted,
                new_date: None,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

impl SqliteRepository {
    /// Validate exception data for consistency and business rules
    pub(crate) fn validate_exception_data(data: &NewExceptionData) -> Result<(), CoreError> {
        match data.reason {
            ExceptionReason::Rescheduled => {
                if data.new_date.is_none() {
                    return Err(CoreError::InvalidInput(
                        "Rescheduled exceptions require a new_date".to_string(),
                    ));
                }
            }
            ExceptionReason::Skipped | ExceptionReason::Deleted => {
                if data.new_date.is_some() {
                    return Err(CoreError::InvalidInput(format!(
                        "{} exceptions cannot have a new_date",
                        data.reason
                    )));
                }
            }
        }
        Ok(())
    }

    /// Records an overlay within an existing transaction and mirrors it onto
    /// any already materialized instance at that date.
    pub(crate) async fn upsert_exception_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        data: NewExceptionData,
    ) -> Result<RecurrenceException, CoreError> {
        Self::validate_exception_data(&data)?;

        let exception = RecurrenceException {
            task_id: data.task_id,
            date: data.date,
            reason: data.reason,
            new_date: data.new_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO recurrence_exceptions (task_id, date, reason, new_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (task_id, date) DO UPDATE SET
                reason = excluded.reason,
                new_date = excluded.new_date,
                created_at = excluded.created_at"#,
        )
        .bind(exception.task_id)
        .bind(exception.date)
        .bind(&exception.reason)
        .bind(exception.new_date)
        .bind(exception.created_at)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"UPDATE recurrence_instances
            SET is_exception = 1, exception_reason = $1, updated_at = $2
            WHERE task_id = $3 AND due_date = $4"#,
        )
        .bind(&exception.reason)
        .bind(Utc::now())
        .bind(exception.task_id)
        .bind(exception.date)
        .execute(&mut **tx)
        .await?;

        Ok(exception)
    }
}
