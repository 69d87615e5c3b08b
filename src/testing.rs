//! In-memory stand-ins for the database and the mail provider.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::mail::{Notification, NotificationKind, NotificationSender};
use crate::todos::repo::TodoStore;
use crate::todos::repo_types::{Todo, TodoChanges};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn update(&self, id: Uuid, f: impl FnOnce(&mut User)) -> anyhow::Result<()> {
        self.update_if(id, |_| true, f).map(|_| ())
    }

    /// Applies `f` only when `guard` holds, under one lock, like a
    /// conditional `UPDATE ... WHERE`.
    fn update_if(
        &self,
        id: Uuid,
        guard: impl FnOnce(&User) -> bool,
        f: impl FnOnce(&mut User),
    ) -> anyhow::Result<bool> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| anyhow::anyhow!("no user {id}"))?;
        if !guard(user) {
            return Ok(false);
        }
        f(user);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let found = {
            let users = self.users.lock().unwrap();
            users.iter().find(|u| u.email == email).cloned()
        };
        // suspend after the read, like a database round trip, so concurrent
        // requests can act on the same snapshot
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_verified: false,
            verification_token: Some(new.verification_token),
            reset_token: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(Some(user))
    }

    async fn mark_verified(&self, id: Uuid, token: &str) -> anyhow::Result<bool> {
        self.update_if(
            id,
            |u| !u.is_verified && u.verification_token.as_deref() == Some(token),
            |u| {
                u.is_verified = true;
                u.verification_token = None;
            },
        )
    }

    async fn set_reset_token(&self, id: Uuid, token: &str) -> anyhow::Result<()> {
        self.update(id, |u| u.reset_token = Some(token.to_string()))
    }

    async fn update_password(
        &self,
        id: Uuid,
        reset_token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        self.update_if(
            id,
            |u| u.reset_token.as_deref() == Some(reset_token),
            |u| {
                u.password_hash = password_hash.to_string();
                u.reset_token = None;
            },
        )
    }
}

#[derive(Default)]
pub struct MemoryTodoStore {
    todos: Mutex<Vec<Todo>>,
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list(&self, user_id: Uuid) -> anyhow::Result<Vec<Todo>> {
        let todos = self.todos.lock().unwrap();
        // newest first, matching the SQL ordering
        Ok(todos.iter().rev().filter(|t| t.user_id == user_id).cloned().collect())
    }

    async fn create(&self, user_id: Uuid, title: &str) -> anyhow::Result<Todo> {
        let now = OffsetDateTime::now_utc();
        let todo = Todo {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.lock().unwrap().push(todo.clone());
        Ok(todo)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> anyhow::Result<Option<Todo>> {
        let mut todos = self.todos.lock().unwrap();
        let Some(todo) = todos.iter_mut().find(|t| t.id == id && t.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            todo.title = title;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        todo.updated_at = OffsetDateTime::now_utc();
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut todos = self.todos.lock().unwrap();
        let before = todos.len();
        todos.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(todos.len() != before)
    }
}

/// Keeps every notification instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
    fail: Mutex<bool>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes subsequent sends fail like an unreachable provider.
    pub fn fail_sends(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Token at the end of the most recent link of `kind` sent to `email`.
    pub fn last_token(&self, kind: NotificationKind, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|n| n.kind == kind && n.email == email)
            .and_then(|n| n.link.rsplit('/').next().map(str::to_string))
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("mail provider unavailable");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub mod http {
    use axum::{
        body::Body,
        http::{header, HeaderMap, Method, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: String,
    }

    impl TestResponse {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
        }

        pub fn message(&self) -> String {
            self.json()["message"].as_str().unwrap_or_default().to_string()
        }

        pub fn set_cookie(&self) -> Option<String> {
            self.headers
                .get(header::SET_COOKIE)
                .map(|v| v.to_str().unwrap().to_string())
        }

        /// `name=value` part of the `Set-Cookie` header, ready to send back.
        pub fn cookie_pair(&self) -> Option<String> {
            self.set_cookie()
                .and_then(|c| c.split(';').next().map(str::to_string))
        }
    }

    pub async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
