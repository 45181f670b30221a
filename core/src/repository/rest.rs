use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::model::session::Session;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repository::error::RemoteError;
use crate::repository::feed::{diff_snapshots, FeedHandle};
use crate::repository::traits::{AuthApi, BlobStore, ChangeFeed, TaskStore};

const TABLE: &str = "todos";
const FEED_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Client for a Supabase-style hosted backend: PostgREST rows, GoTrue
/// auth, object storage. One instance serves all four contract traits.
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
    poll_interval: Duration,
}

impl RestBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            bucket: config.bucket.clone(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn authed(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
    }

    async fn patch_row(
        &self,
        session: &Session,
        id: TaskId,
        context: &'static str,
        body: serde_json::Value,
    ) -> Result<(), RemoteError> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .authed(self.http.patch(self.rows_url()), session)
            .query(&[("id", id_filter.as_str())])
            .json(&body)
            .send()
            .await?;
        check(context, response).await?;
        Ok(())
    }
}

/// Wire shape of one row, exactly the store's column names.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct TaskRow {
    id: i64,
    text: String,
    is_completed: bool,
    is_important: bool,
    created_at: DateTime<Utc>,
    image_url: Option<String>,
    user_id: Uuid,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: TaskId(row.id),
            text: row.text,
            completed: row.is_completed,
            important: row.is_important,
            created_at: row.created_at,
            image_url: row.image_url,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    email: String,
}

async fn check(
    context: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        context,
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TaskStore for RestBackend {
    async fn list(&self, session: &Session) -> Result<Vec<Task>, RemoteError> {
        let user_filter = format!("eq.{}", session.user_id);
        let response = self
            .authed(self.http.get(self.rows_url()), session)
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.asc"),
            ])
            .send()
            .await?;
        let rows: Vec<TaskRow> = check("task list", response).await?.json().await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn insert(&self, session: &Session, draft: TaskDraft) -> Result<Task, RemoteError> {
        let body = json!({
            "text": draft.text,
            "user_id": session.user_id,
            "is_completed": false,
            "is_important": false,
            "image_url": draft.image_url,
        });
        let response = self
            .authed(self.http.post(self.rows_url()), session)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let mut rows: Vec<TaskRow> = check("task insert", response).await?.json().await?;
        rows.pop().map(Task::from).ok_or(RemoteError::Api {
            context: "task insert",
            status: 200,
            message: "empty representation".to_string(),
        })
    }

    async fn update_text(
        &self,
        session: &Session,
        id: TaskId,
        text: &str,
    ) -> Result<(), RemoteError> {
        self.patch_row(session, id, "task edit", json!({ "text": text }))
            .await
    }

    async fn set_completed(
        &self,
        session: &Session,
        id: TaskId,
        completed: bool,
    ) -> Result<(), RemoteError> {
        self.patch_row(
            session,
            id,
            "task toggle",
            json!({ "is_completed": completed }),
        )
        .await
    }

    async fn set_important(
        &self,
        session: &Session,
        id: TaskId,
        important: bool,
    ) -> Result<(), RemoteError> {
        self.patch_row(
            session,
            id,
            "task flag",
            json!({ "is_important": important }),
        )
        .await
    }

    async fn delete(&self, session: &Session, id: TaskId) -> Result<(), RemoteError> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .authed(self.http.delete(self.rows_url()), session)
            .query(&[("id", id_filter.as_str())])
            .send()
            .await?;
        check("task delete", response).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for RestBackend {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        let response = self
            .authed(self.http.post(self.object_url(path)), session)
            .header("Content-Type", content_type.to_string())
            .body(bytes)
            .send()
            .await?;
        check("image upload", response).await?;
        Ok(self.public_url(path))
    }
}

#[async_trait]
impl AuthApi for RestBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        check("sign-up", response).await?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = check("sign-in", response).await?.json().await?;
        Ok(Session {
            user_id: token.user.id,
            email: token.user.email,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), RemoteError> {
        let response = self
            .authed(self.http.post(self.auth_url("logout")), session)
            .send()
            .await?;
        check("sign-out", response).await?;
        Ok(())
    }

    async fn restore(&self, session: &Session) -> Result<Option<Session>, RemoteError> {
        let response = self
            .authed(self.http.get(self.auth_url("user")), session)
            .send()
            .await?;
        // An expired or revoked token is a normal outcome here, not an error.
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        let user: WireUser = check("session restore", response).await?.json().await?;
        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            ..session.clone()
        }))
    }
}

#[async_trait]
impl ChangeFeed for RestBackend {
    /// The platform's realtime transport stays on the platform side; we
    /// derive the same event stream by polling the rows endpoint and
    /// diffing consecutive snapshots.
    async fn subscribe(&self, session: &Session) -> Result<FeedHandle, RemoteError> {
        // Baseline snapshot, so rows that already exist don't replay as inserts.
        let mut last = self.list(session).await?;

        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let backend = self.clone();
        let session = session.clone();
        let worker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(backend.poll_interval).await;
                let current = match backend.list(&session).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        log::debug!("feed poll failed: {}", err);
                        continue;
                    }
                };
                for event in diff_snapshots(&last, &current) {
                    if tx.send(event).await.is_err() {
                        // Receiver dropped; the subscription is released.
                        return;
                    }
                }
                last = current;
            }
        });

        Ok(FeedHandle::new(rx, worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RestBackend {
        RestBackend::new(&Config {
            base_url: "https://example.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            bucket: "todolist-files".to_string(),
        })
    }

    #[test]
    fn row_maps_to_task() {
        let row: TaskRow = serde_json::from_str(
            r#"{
                "id": 7,
                "text": "Buy milk",
                "is_completed": false,
                "is_important": true,
                "created_at": "2024-05-01T09:30:00+00:00",
                "image_url": null,
                "user_id": "c8b3f6e2-9a41-4a47-a2a3-0a1f6a2b9c01"
            }"#,
        )
        .expect("row should parse");
        let task = Task::from(row);

        assert_eq!(task.id, TaskId(7));
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert!(task.important);
        assert_eq!(task.image_url, None);
    }

    #[test]
    fn urls_drop_trailing_slash() {
        let backend = backend();
        assert_eq!(
            backend.rows_url(),
            "https://example.supabase.co/rest/v1/todos"
        );
        assert_eq!(
            backend.auth_url("token"),
            "https://example.supabase.co/auth/v1/token"
        );
    }

    #[test]
    fn public_url_points_at_public_object_route() {
        let backend = backend();
        assert_eq!(
            backend.public_url("user-1/123.png"),
            "https://example.supabase.co/storage/v1/object/public/todolist-files/user-1/123.png"
        );
    }
}
