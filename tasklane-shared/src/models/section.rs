/// Section model: ordered buckets inside a project
///
/// `order` is a display hint. It is assigned as max + 1 within the project
/// and is neither unique nor re-compacted after deletes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// One section to insert; the project is supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub name: String,
    pub order: i32,
}

impl NewSection {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        NewSection {
            name: name.into(),
            order,
        }
    }
}

impl Section {
    /// Inserts all sections in one transaction, returning them in input order
    pub async fn create_many(
        pool: &PgPool,
        project_id: Uuid,
        sections: Vec<NewSection>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(sections.len());

        for section in sections {
            let row = sqlx::query_as::<_, Section>(
                r#"
                INSERT INTO sections (project_id, name, "order")
                VALUES ($1, $2, $3)
                RETURNING id, project_id, name, "order", created_at
                "#,
            )
            .bind(project_id)
            .bind(&section.name)
            .bind(section.order)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"
            SELECT id, project_id, name, "order", created_at
            FROM sections
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Ascending by order, creation time breaking ties
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"
            SELECT id, project_id, name, "order", created_at
            FROM sections
            WHERE project_id = $1
            ORDER BY "order" ASC, created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn max_order(pool: &PgPool, project_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let (max,): (Option<i32>,) =
            sqlx::query_as(r#"SELECT MAX("order") FROM sections WHERE project_id = $1"#)
                .bind(project_id)
                .fetch_one(pool)
                .await?;

        Ok(max)
    }

    pub async fn count_tasks(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE section_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
