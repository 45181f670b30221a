pub mod config;
pub mod model;
pub mod repository;
pub mod service;
pub mod sync;

pub use config::{Config, SessionFile};
pub use model::session::Session;
pub use model::task::{Task, TaskDraft, TaskId};
pub use repository::{AuthApi, BlobStore, ChangeEvent, ChangeFeed, FeedHandle, RemoteError, RestBackend, TaskStore};
pub use service::{ActionOutcome, ImageAttachment, SessionState, TodoService};
pub use sync::{ListEvent, TaskList, TaskStats};
