use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::model::session::Session;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repository::error::RemoteError;
use crate::repository::feed::{ChangeEvent, FeedHandle};
use crate::repository::traits::{AuthApi, BlobStore, ChangeFeed, TaskStore};
use crate::sync::list::{ListEvent, TaskList, TaskStats};

#[derive(Debug, Clone)]
pub enum SessionState {
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedOut => None,
            SessionState::SignedIn(session) => Some(session),
        }
    }
}

/// What a mutating action did. `NeedsLogin` means nothing ran and the
/// front end should route to the login surface instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    NeedsLogin,
}

/// An image picked for the add flow, already read into memory.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub content_type: String,
}

impl ImageAttachment {
    pub fn from_file(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("image file {} has no extension", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("could not read image {}", path.display()))?;
        let content_type = content_type_for(&extension).to_string();
        Ok(Self {
            bytes,
            extension,
            content_type,
        })
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Upload path the store expects: `<user_id>/<millis>.<extension>`.
pub fn upload_path(user_id: &Uuid, extension: &str) -> String {
    format!("{}/{}.{}", user_id, Utc::now().timestamp_millis(), extension)
}

/// Orchestrates the session gate, the remote-first mutations and the
/// feed subscription over one backend client.
///
/// Every mutation goes to the store first; local state only changes
/// after the remote call succeeds, so a failure needs no rollback.
/// Store failures are logged and swallowed (the view simply doesn't
/// change); auth failures surface to the caller for inline display.
pub struct TodoService<B> {
    backend: B,
    session: SessionState,
    list: TaskList,
    feed: Option<FeedHandle>,
}

impl<B> TodoService<B>
where
    B: TaskStore + BlobStore + AuthApi + ChangeFeed,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: SessionState::SignedOut,
            list: TaskList::default(),
            feed: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.list.tasks()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.list.get(id)
    }

    pub fn stats(&self) -> TaskStats {
        self.list.stats()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.session()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }

    /// Validates a persisted session once at startup; the result fixes
    /// the initial gate state.
    pub async fn restore_session(&mut self, saved: Option<Session>) {
        let Some(saved) = saved else { return };
        match self.backend.restore(&saved).await {
            Ok(Some(session)) => {
                self.session = SessionState::SignedIn(session);
                self.refresh().await;
            }
            Ok(None) => {}
            Err(err) => log::warn!("session restore failed: {}", err),
        }
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), RemoteError> {
        self.backend.sign_up(email, password).await
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), RemoteError> {
        let session = self.backend.sign_in(email, password).await?;
        self.session = SessionState::SignedIn(session);
        self.refresh().await;
        Ok(())
    }

    /// The view clears before the remote call: in-flight requests never
    /// resurrect a signed-out list.
    pub async fn sign_out(&mut self) {
        self.feed = None;
        self.list.apply(ListEvent::Cleared);
        let SessionState::SignedIn(session) =
            std::mem::replace(&mut self.session, SessionState::SignedOut)
        else {
            return;
        };
        if let Err(err) = self.backend.sign_out(&session).await {
            log::warn!("sign-out failed: {}", err);
        }
    }

    /// Acquires the push feed. Called by the list view when it mounts;
    /// signing out (or dropping the service) releases it.
    pub async fn subscribe_feed(&mut self) {
        let SessionState::SignedIn(session) = &self.session else {
            return;
        };
        match self.backend.subscribe(session).await {
            Ok(handle) => self.feed = Some(handle),
            Err(err) => log::warn!("change feed unavailable: {}", err),
        }
    }

    /// Drains pending feed events into the view. UI tick loops call
    /// this between redraws.
    pub fn pump_feed(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        while let Some(event) = feed.try_next() {
            self.list.apply(ListEvent::Remote(event));
        }
    }

    pub fn handle_feed_event(&mut self, event: ChangeEvent) {
        self.list.apply(ListEvent::Remote(event));
    }

    pub async fn refresh(&mut self) {
        let SessionState::SignedIn(session) = &self.session else {
            return;
        };
        match self.backend.list(session).await {
            Ok(tasks) => self.list.apply(ListEvent::Loaded(tasks)),
            Err(err) => log::warn!("task fetch failed: {}", err),
        }
    }

    pub async fn add_task(&mut self, text: &str, image: Option<ImageAttachment>) -> ActionOutcome {
        let Some(session) = self.session.session().cloned() else {
            return ActionOutcome::NeedsLogin;
        };
        if text.trim().is_empty() {
            return ActionOutcome::Done;
        }

        let image_url = match image {
            Some(image) => {
                let path = upload_path(&session.user_id, &image.extension);
                match self
                    .backend
                    .upload(&session, &path, image.bytes, &image.content_type)
                    .await
                {
                    Ok(url) => Some(url),
                    Err(err) => {
                        // Without the upload there is nothing to attach,
                        // so the whole add is abandoned.
                        log::warn!("image upload failed: {}", err);
                        return ActionOutcome::Done;
                    }
                }
            }
            None => None,
        };

        let draft = TaskDraft {
            text: text.to_string(),
            image_url,
        };
        match self.backend.insert(&session, draft).await {
            Ok(task) => self.list.apply(ListEvent::Upserted(task)),
            Err(err) => log::warn!("task insert failed: {}", err),
        }
        ActionOutcome::Done
    }

    pub async fn edit_text(&mut self, id: TaskId, text: &str) -> ActionOutcome {
        let Some(session) = self.session.session().cloned() else {
            return ActionOutcome::NeedsLogin;
        };
        // Empty edits are dropped before anything goes on the wire.
        if text.trim().is_empty() {
            return ActionOutcome::Done;
        }
        let Some(task) = self.list.get(id) else {
            return ActionOutcome::Done;
        };
        let mut updated = task.clone();
        updated.text = text.to_string();

        match self.backend.update_text(&session, id, text).await {
            Ok(()) => self.list.apply(ListEvent::Upserted(updated)),
            Err(err) => log::warn!("task edit failed: {}", err),
        }
        ActionOutcome::Done
    }

    pub async fn toggle_completed(&mut self, id: TaskId) -> ActionOutcome {
        let Some(session) = self.session.session().cloned() else {
            return ActionOutcome::NeedsLogin;
        };
        let Some(task) = self.list.get(id) else {
            return ActionOutcome::Done;
        };
        let mut updated = task.clone();
        updated.completed = !task.completed;

        match self
            .backend
            .set_completed(&session, id, updated.completed)
            .await
        {
            Ok(()) => self.list.apply(ListEvent::Upserted(updated)),
            Err(err) => log::warn!("task toggle failed: {}", err),
        }
        ActionOutcome::Done
    }

    pub async fn toggle_important(&mut self, id: TaskId) -> ActionOutcome {
        let Some(session) = self.session.session().cloned() else {
            return ActionOutcome::NeedsLogin;
        };
        let Some(task) = self.list.get(id) else {
            return ActionOutcome::Done;
        };
        let mut updated = task.clone();
        updated.important = !task.important;

        match self
            .backend
            .set_important(&session, id, updated.important)
            .await
        {
            Ok(()) => self.list.apply(ListEvent::Upserted(updated)),
            Err(err) => log::warn!("task flag failed: {}", err),
        }
        ActionOutcome::Done
    }

    pub async fn delete(&mut self, id: TaskId) -> ActionOutcome {
        let Some(session) = self.session.session().cloned() else {
            return ActionOutcome::NeedsLogin;
        };
        match self.backend.delete(&session, id).await {
            Ok(()) => self.list.apply(ListEvent::Removed(id)),
            Err(err) => log::warn!("task delete failed: {}", err),
        }
        ActionOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct MockState {
        rows: Mutex<Vec<Task>>,
        next_id: AtomicI64,
        fail_writes: AtomicBool,
        write_calls: AtomicUsize,
        uploads: Mutex<Vec<String>>,
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        state: Arc<MockState>,
    }

    impl MockBackend {
        fn fail_writes(&self) {
            self.state.fail_writes.store(true, Ordering::SeqCst);
        }

        fn rows(&self) -> Vec<Task> {
            self.state.rows.lock().unwrap().clone()
        }

        fn write_calls(&self) -> usize {
            self.state.write_calls.load(Ordering::SeqCst)
        }

        fn uploads(&self) -> Vec<String> {
            self.state.uploads.lock().unwrap().clone()
        }

        fn boom(context: &'static str) -> RemoteError {
            RemoteError::Api {
                context,
                status: 500,
                message: "boom".to_string(),
            }
        }

        fn check_write(&self, context: &'static str) -> Result<(), RemoteError> {
            self.state.write_calls.fetch_add(1, Ordering::SeqCst);
            if self.state.fail_writes.load(Ordering::SeqCst) {
                Err(Self::boom(context))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TaskStore for MockBackend {
        async fn list(&self, _session: &Session) -> Result<Vec<Task>, RemoteError> {
            Ok(self.rows())
        }

        async fn insert(&self, _session: &Session, draft: TaskDraft) -> Result<Task, RemoteError> {
            self.check_write("task insert")?;
            let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let task = Task {
                id: TaskId(id),
                text: draft.text,
                completed: false,
                important: false,
                created_at: Utc::now(),
                image_url: draft.image_url,
            };
            self.state.rows.lock().unwrap().push(task.clone());
            Ok(task)
        }

        async fn update_text(
            &self,
            _session: &Session,
            id: TaskId,
            text: &str,
        ) -> Result<(), RemoteError> {
            self.check_write("task edit")?;
            let mut rows = self.state.rows.lock().unwrap();
            let task = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(Self::boom("task edit"))?;
            task.text = text.to_string();
            Ok(())
        }

        async fn set_completed(
            &self,
            _session: &Session,
            id: TaskId,
            completed: bool,
        ) -> Result<(), RemoteError> {
            self.check_write("task toggle")?;
            let mut rows = self.state.rows.lock().unwrap();
            let task = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(Self::boom("task toggle"))?;
            task.completed = completed;
            Ok(())
        }

        async fn set_important(
            &self,
            _session: &Session,
            id: TaskId,
            important: bool,
        ) -> Result<(), RemoteError> {
            self.check_write("task flag")?;
            let mut rows = self.state.rows.lock().unwrap();
            let task = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(Self::boom("task flag"))?;
            task.important = important;
            Ok(())
        }

        async fn delete(&self, _session: &Session, id: TaskId) -> Result<(), RemoteError> {
            self.check_write("task delete")?;
            self.state.rows.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl BlobStore for MockBackend {
        async fn upload(
            &self,
            _session: &Session,
            path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, RemoteError> {
            self.state.uploads.lock().unwrap().push(path.to_string());
            Ok(format!("https://cdn.example/{}", path))
        }
    }

    #[async_trait]
    impl AuthApi for MockBackend {
        async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
            if password != "secret" {
                return Err(RemoteError::Api {
                    context: "sign-in",
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
            Ok(Session {
                user_id: Uuid::new_v4(),
                email: email.to_string(),
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            })
        }

        async fn sign_out(&self, _session: &Session) -> Result<(), RemoteError> {
            if self.state.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::boom("sign-out"));
            }
            Ok(())
        }

        async fn restore(&self, session: &Session) -> Result<Option<Session>, RemoteError> {
            Ok(Some(session.clone()))
        }
    }

    #[async_trait]
    impl ChangeFeed for MockBackend {
        async fn subscribe(&self, _session: &Session) -> Result<FeedHandle, RemoteError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(FeedHandle::new(rx, tokio::spawn(async {})))
        }
    }

    async fn signed_in_service() -> (TodoService<MockBackend>, MockBackend) {
        let backend = MockBackend::default();
        let mut service = TodoService::new(backend.clone());
        service
            .sign_in("user@example.com", "secret")
            .await
            .expect("sign in");
        (service, backend)
    }

    #[tokio::test]
    async fn add_then_feed_insert_keeps_one_row() {
        let (mut service, _backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;

        let stored = service.tasks()[0].clone();
        service.handle_feed_event(ChangeEvent::Insert(stored.clone()));

        assert_eq!(service.tasks().len(), 1);
        assert_eq!(service.tasks()[0], stored);
    }

    #[tokio::test]
    async fn toggle_twice_restores_flags_locally_and_remotely() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        let id = service.tasks()[0].id;
        let calls_before = backend.write_calls();

        service.toggle_completed(id).await;
        assert!(service.get(id).expect("task").completed);
        service.toggle_completed(id).await;
        assert!(!service.get(id).expect("task").completed);
        assert!(!backend.rows()[0].completed);

        service.toggle_important(id).await;
        service.toggle_important(id).await;
        assert!(!service.get(id).expect("task").important);
        assert!(!backend.rows()[0].important);

        // Each toggle really went to the store.
        assert_eq!(backend.write_calls(), calls_before + 4);
    }

    #[tokio::test]
    async fn delete_removes_local_and_remote() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        let id = service.tasks()[0].id;

        service.delete(id).await;

        assert!(service.tasks().is_empty());
        assert!(backend.rows().is_empty());
        service.refresh().await;
        assert!(service.tasks().is_empty());
    }

    #[tokio::test]
    async fn empty_edit_sends_nothing_and_changes_nothing() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        let id = service.tasks()[0].id;
        let calls_before = backend.write_calls();

        let outcome = service.edit_text(id, "   ").await;

        assert_eq!(outcome, ActionOutcome::Done);
        assert_eq!(backend.write_calls(), calls_before);
        assert_eq!(service.get(id).expect("task").text, "Buy milk");
    }

    #[tokio::test]
    async fn edit_replaces_text() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        let id = service.tasks()[0].id;

        service.edit_text(id, "Buy oat milk").await;

        assert_eq!(service.get(id).expect("task").text, "Buy oat milk");
        assert_eq!(backend.rows()[0].text, "Buy oat milk");
    }

    #[tokio::test]
    async fn sign_out_clears_the_list_even_when_the_remote_call_fails() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        backend.fail_writes();

        service.sign_out().await;

        assert!(service.tasks().is_empty());
        assert!(!service.is_signed_in());
    }

    #[tokio::test]
    async fn failed_writes_leave_the_view_unchanged() {
        let (mut service, backend) = signed_in_service().await;
        service.add_task("Buy milk", None).await;
        let id = service.tasks()[0].id;
        backend.fail_writes();

        let outcome = service.toggle_completed(id).await;
        assert_eq!(outcome, ActionOutcome::Done);
        assert!(!service.get(id).expect("task").completed);

        let outcome = service.delete(id).await;
        assert_eq!(outcome, ActionOutcome::Done);
        assert_eq!(service.tasks().len(), 1);

        let outcome = service.add_task("Another", None).await;
        assert_eq!(outcome, ActionOutcome::Done);
        assert_eq!(service.tasks().len(), 1);
    }

    #[tokio::test]
    async fn mutations_while_signed_out_ask_for_login() {
        let backend = MockBackend::default();
        let mut service = TodoService::new(backend.clone());

        assert_eq!(
            service.add_task("Buy milk", None).await,
            ActionOutcome::NeedsLogin
        );
        assert_eq!(
            service.toggle_completed(TaskId(1)).await,
            ActionOutcome::NeedsLogin
        );
        assert_eq!(service.delete(TaskId(1)).await, ActionOutcome::NeedsLogin);
        assert!(backend.rows().is_empty());
        assert_eq!(backend.write_calls(), 0);
    }

    #[tokio::test]
    async fn add_with_image_uploads_under_the_user_prefix() {
        let (mut service, backend) = signed_in_service().await;
        let user_id = service.session().expect("session").user_id;

        service
            .add_task(
                "Buy milk",
                Some(ImageAttachment {
                    bytes: vec![1, 2, 3],
                    extension: "png".to_string(),
                    content_type: "image/png".to_string(),
                }),
            )
            .await;

        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with(&format!("{}/", user_id)));
        assert!(uploads[0].ends_with(".png"));

        let task = &service.tasks()[0];
        assert_eq!(
            task.image_url.as_deref(),
            Some(format!("https://cdn.example/{}", uploads[0]).as_str())
        );
    }

    #[tokio::test]
    async fn sign_in_loads_the_existing_list() {
        let backend = MockBackend::default();
        backend.state.rows.lock().unwrap().push(Task {
            id: TaskId(10),
            text: "old".to_string(),
            completed: true,
            important: false,
            created_at: Utc::now(),
            image_url: None,
        });

        let mut service = TodoService::new(backend);
        service
            .sign_in("user@example.com", "secret")
            .await
            .expect("sign in");

        assert_eq!(service.tasks().len(), 1);
        assert_eq!(service.stats().completed, 1);
    }

    #[tokio::test]
    async fn wrong_password_surfaces_and_stays_signed_out() {
        let backend = MockBackend::default();
        let mut service = TodoService::new(backend);

        let err = service
            .sign_in("user@example.com", "nope")
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("Invalid login credentials"));
        assert!(!service.is_signed_in());
    }

    #[tokio::test]
    async fn buy_milk_scenario_counters() {
        let (mut service, _backend) = signed_in_service().await;

        service.add_task("Buy milk", None).await;
        let task = service.tasks()[0].clone();
        assert!(!task.completed);
        assert!(!task.important);
        assert!(task.image_url.is_none());
        assert_eq!(
            service.stats(),
            TaskStats {
                total: 1,
                completed: 0,
                important: 0
            }
        );

        service.toggle_important(task.id).await;
        assert_eq!(service.stats().important, 1);

        service.toggle_completed(task.id).await;
        assert_eq!(service.stats().completed, 1);
        assert_eq!(service.stats().important, 0);

        service.delete(task.id).await;
        assert!(service.tasks().is_empty());
        assert_eq!(service.stats(), TaskStats::default());
    }

    #[test]
    fn upload_path_is_user_scoped() {
        let user_id = Uuid::new_v4();
        let path = upload_path(&user_id, "png");
        assert!(path.starts_with(&format!("{}/", user_id)));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn content_types_cover_the_common_image_formats() {
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}
