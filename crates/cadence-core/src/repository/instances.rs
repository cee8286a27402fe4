use crate::error::CoreError;
use crate::models::RecurrenceInstance;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::InstanceRepository for SqliteRepository {
    async fn find_instance_by_id(&self, id: Uuid) -> Result<Option<RecurrenceInstance>, CoreError> {
        let instance = sqlx::query_as("SELECT * FROM recurrence_instances WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(instance)
    }

    async fn find_instances_by_task(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<RecurrenceInstance>, CoreError> {
        let instances = sqlx::query_as(
            "SELECT * FROM recurrence_instances WHERE task_id = $1 ORDER BY due_date",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;
        Ok(instances)
    }

    async fn find_instances_in_range(
        &self,
        task_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceInstance>, CoreError> {
        let instances = sqlx::query_as(
            r#"SELECT * FROM recurrence_instances
            WHERE task_id = $1 AND due_date >= $2 AND due_date < $3
            ORDER BY due_date"#,
        )
        .bind(task_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        Ok(instances)
    }

    async fn set_instance_completed(
        &self,
        id: Uuid,
        completed: bool,
    ) -> Result<RecurrenceInstance, CoreError> {
        let now = Utc::now();
        let completed_at = completed.then_some(now);

        let result = sqlx::query(
            "UPDATE recurrence_instances SET completed = $1, completed_at = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(completed)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Instance with id {} not found",
                id
            )));
        }

        let instance = sqlx::query_as("SELECT * FROM recurrence_instances WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(instance)
    }

    async fn delete_future_instances(
        &self,
        task_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<usize, CoreError> {
        let result =
            sqlx::query("DELETE FROM recurrence_instances WHERE task_id = $1 AND due_date >= $2")
                .bind(task_id)
                .bind(from_date)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() as usize)
    }
}

impl SqliteRepository {
    /// Upserts an instance keyed by (`task_id`, `due_date`) within an
    /// existing transaction. An existing row keeps its completion and
    /// exception state; only `updated_at` is touched.
    pub(crate) async fn upsert_instance_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        instance: &RecurrenceInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO recurrence_instances
            (id, task_id, base_task_id, due_date, is_exception, exception_reason, completed, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (task_id, due_date) DO UPDATE SET updated_at = excluded.updated_at"#,
        )
        .bind(instance.id)
        .bind(instance.task_id)
        .bind(instance.base_task_id)
        .bind(instance.due_date)
        .bind(instance.is_exception)
        .bind(&instance.exception_reason)
        .bind(instance.completed)
        .bind(instance.completed_at)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
