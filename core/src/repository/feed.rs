use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::task::{Task, TaskId};

/// One row-level change, as a realtime feed delivers it: the new row
/// image for inserts and updates, just the id for deletes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(Task),
    Update(Task),
    Delete(TaskId),
}

/// A live subscription. Holds the receiving end of the event channel
/// and the worker driving it; dropping the handle aborts the worker,
/// which is how sign-out and screen teardown release the feed.
pub struct FeedHandle {
    rx: mpsc::Receiver<ChangeEvent>,
    worker: JoinHandle<()>,
}

impl FeedHandle {
    pub fn new(rx: mpsc::Receiver<ChangeEvent>, worker: JoinHandle<()>) -> Self {
        Self { rx, worker }
    }

    /// Non-blocking receive, for UI tick loops that drain pending
    /// events between redraws.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Turns two consecutive row snapshots into the events a push feed
/// would have delivered in between. Inserts and updates come out in
/// new-snapshot order, deletes after.
pub fn diff_snapshots(old: &[Task], new: &[Task]) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for task in new {
        match old.iter().find(|t| t.id == task.id) {
            None => events.push(ChangeEvent::Insert(task.clone())),
            Some(prev) if prev != task => events.push(ChangeEvent::Update(task.clone())),
            Some(_) => {}
        }
    }

    for task in old {
        if !new.iter().any(|t| t.id == task.id) {
            events.push(ChangeEvent::Delete(task.id));
        }
    }

    events
}
