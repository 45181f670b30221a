pub mod list;

pub use list::{ListEvent, TaskList, TaskStats};
