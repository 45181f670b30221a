pub mod task_service;

pub use task_service::{ActionOutcome, ImageAttachment, SessionState, TodoService};
