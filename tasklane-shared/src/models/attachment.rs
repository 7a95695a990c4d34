/// Attachment metadata
///
/// Only the descriptor is stored. The bytes live wherever `url` points and
/// are never read or written by this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub name: String,
    pub url: String,
    /// Size in bytes
    pub size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub name: String,
    pub url: String,
    pub size: i64,
    pub mime_type: String,
}

impl Attachment {
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (task_id, name, url, size, mime_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, name, url, size, mime_type, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(&data.name)
        .bind(&data.url)
        .bind(data.size)
        .bind(&data.mime_type)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, name, url, size, mime_type, created_at
            FROM attachments
            WHERE task_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, task_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1 AND task_id = $2")
            .bind(id)
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
