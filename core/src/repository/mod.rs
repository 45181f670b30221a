pub mod error;
pub mod feed;
pub mod rest;
pub mod traits;

// Re-export
pub use error::RemoteError;
pub use feed::{ChangeEvent, FeedHandle};
pub use rest::RestBackend;
pub use traits::{AuthApi, BlobStore, ChangeFeed, TaskStore};
