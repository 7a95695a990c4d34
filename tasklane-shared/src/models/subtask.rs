/// Subtask model: checklist items under a task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSubtask {
    pub task_id: Uuid,
    pub title: String,
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<i32>,
}

impl Subtask {
    pub async fn create(pool: &PgPool, data: CreateSubtask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            INSERT INTO subtasks (task_id, title, "order")
            VALUES ($1, $2, $3)
            RETURNING id, task_id, title, completed, "order", created_at
            "#,
        )
        .bind(data.task_id)
        .bind(&data.title)
        .bind(data.order)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, task_id, title, completed, "order", created_at
            FROM subtasks
            WHERE task_id = $1
            ORDER BY "order" ASC, created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn max_order(pool: &PgPool, task_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let (max,): (Option<i32>,) =
            sqlx::query_as(r#"SELECT MAX("order") FROM subtasks WHERE task_id = $1"#)
                .bind(task_id)
                .fetch_one(pool)
                .await?;

        Ok(max)
    }

    /// Scoped to `task_id` so a subtask id from another task never matches
    pub async fn update(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE subtasks SET id = id");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(completed) = data.completed {
            query.push(", completed = ").push_bind(completed);
        }
        if let Some(order) = data.order {
            query.push(r#", "order" = "#).push_bind(order);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND task_id = ")
            .push_bind(task_id)
            .push(r#" RETURNING id, task_id, title, completed, "order", created_at"#);

        query.build_query_as::<Subtask>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, task_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = $1 AND task_id = $2")
            .bind(id)
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
