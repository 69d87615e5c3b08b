use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Todo, TodoChanges};

/// Todo persistence. Every call is scoped to the owning user; a todo that
/// belongs to someone else behaves as if it did not exist.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn list(&self, user_id: Uuid) -> anyhow::Result<Vec<Todo>>;
    async fn create(&self, user_id: Uuid, title: &str) -> anyhow::Result<Todo>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>>;
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> anyhow::Result<Option<Todo>>;
    /// Returns whether a row was deleted.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn list(&self, user_id: Uuid) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, completed, created_at, updated_at
              FROM todos
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list todos")?;
        Ok(rows)
    }

    async fn create(&self, user_id: Uuid, title: &str) -> anyhow::Result<Todo> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, user_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.db)
        .await
        .context("insert todo")?;
        Ok(todo)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, completed, created_at, updated_at
              FROM todos
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get todo")?;
        Ok(todo)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = COALESCE($3, title),
                   completed = COALESCE($4, completed),
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.completed)
        .fetch_optional(&self.db)
        .await
        .context("update todo")?;
        Ok(todo)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete todo")?;
        Ok(res.rows_affected() > 0)
    }
}
