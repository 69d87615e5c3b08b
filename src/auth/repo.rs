use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, is_verified, \
     verification_token, reset_token, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Inserts the user, or returns `None` when the email is already taken.
    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    /// Sets `is_verified` and clears the verification token, but only while
    /// the user is unverified and still holds `token`. Returns whether the
    /// row changed.
    async fn mark_verified(&self, id: Uuid, token: &str) -> anyhow::Result<bool>;
    async fn set_reset_token(&self, id: Uuid, token: &str) -> anyhow::Result<()>;
    /// Replaces the password hash and clears the reset token, but only while
    /// `reset_token` is the stored one. Returns whether the row changed.
    async fn update_password(
        &self,
        id: Uuid,
        reset_token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, verification_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(&new.verification_token)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("insert user")),
        }
    }

    async fn mark_verified(&self, id: Uuid, token: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE, verification_token = NULL, updated_at = now()
             WHERE id = $1 AND is_verified = FALSE AND verification_token = $2
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await
        .context("mark user verified")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_reset_token(&self, id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .context("store reset token")?;
        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        reset_token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, reset_token = NULL, updated_at = now()
             WHERE id = $1 AND reset_token = $3
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(reset_token)
        .execute(&self.db)
        .await
        .context("update password")?;
        Ok(res.rows_affected() > 0)
    }
}
