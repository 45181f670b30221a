use async_trait::async_trait;

use crate::model::session::Session;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repository::error::RemoteError;
use crate::repository::feed::FeedHandle;

/// Row-level CRUD against the hosted store, always scoped to the
/// session's user. Every call goes over the wire; callers decide what
/// to do with the local view afterwards.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All of the user's rows, ascending by creation time.
    async fn list(&self, session: &Session) -> Result<Vec<Task>, RemoteError>;
    /// Insert and return the stored row (id and created_at assigned remotely).
    async fn insert(&self, session: &Session, draft: TaskDraft) -> Result<Task, RemoteError>;
    async fn update_text(
        &self,
        session: &Session,
        id: TaskId,
        text: &str,
    ) -> Result<(), RemoteError>;
    async fn set_completed(
        &self,
        session: &Session,
        id: TaskId,
        completed: bool,
    ) -> Result<(), RemoteError>;
    async fn set_important(
        &self,
        session: &Session,
        id: TaskId,
        important: bool,
    ) -> Result<(), RemoteError>;
    async fn delete(&self, session: &Session, id: TaskId) -> Result<(), RemoteError>;
}

/// Blob upload; returns the public retrieval URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Registers the account. The platform sends a confirmation mail,
    /// so no session comes back from this call.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), RemoteError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError>;
    async fn sign_out(&self, session: &Session) -> Result<(), RemoteError>;
    /// Validates a persisted session once at startup. `None` means the
    /// session is no longer accepted and the caller starts signed out.
    async fn restore(&self, session: &Session) -> Result<Option<Session>, RemoteError>;
}

/// Push feed of row changes scoped to the session's user. The handle
/// owns the subscription; dropping it releases the feed.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, session: &Session) -> Result<FeedHandle, RemoteError>;
}
