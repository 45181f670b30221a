use crate::model::task::{Task, TaskId};
use crate::repository::feed::ChangeEvent;

/// The task list view state. Two producers feed it: the optimistic
/// local path (after a remote write succeeds) and the change feed.
/// `apply` is the single place where the two are merged.
#[derive(Debug, Default, Clone)]
pub struct TaskList {
    tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// Full refetch result; replaces the view.
    Loaded(Vec<Task>),
    /// A locally confirmed insert or field change.
    Upserted(Task),
    /// A locally confirmed delete.
    Removed(TaskId),
    /// Anything arriving on the push feed.
    Remote(ChangeEvent),
    /// Sign-out.
    Cleared,
}

/// The three stat cards: `important` counts flagged tasks that are
/// still open, so completing a flagged task moves it out of that card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub important: usize,
}

impl TaskList {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn apply(&mut self, event: ListEvent) {
        match event {
            ListEvent::Loaded(tasks) => self.tasks = tasks,
            ListEvent::Upserted(task) => self.upsert(task),
            ListEvent::Removed(id) => self.tasks.retain(|t| t.id != id),
            ListEvent::Remote(ChangeEvent::Insert(task)) => {
                // The optimistic insert may already have landed this row;
                // a second copy from the feed is dropped by id.
                if self.get(task.id).is_none() {
                    self.tasks.push(task);
                }
            }
            ListEvent::Remote(ChangeEvent::Update(task)) => self.upsert(task),
            ListEvent::Remote(ChangeEvent::Delete(id)) => self.tasks.retain(|t| t.id != id),
            ListEvent::Cleared => self.tasks.clear(),
        }
    }

    fn upsert(&mut self, task: Task) {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == task.id) {
            self.tasks[pos] = task;
        } else {
            self.tasks.push(task);
        }
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            total: self.tasks.len(),
            completed: self.tasks.iter().filter(|t| t.completed).count(),
            important: self
                .tasks
                .iter()
                .filter(|t| t.important && !t.completed)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: i64, text: &str) -> Task {
        Task {
            id: TaskId(id),
            text: text.to_string(),
            completed: false,
            important: false,
            created_at: Utc::now(),
            image_url: None,
        }
    }

    #[test]
    fn feed_insert_after_optimistic_insert_is_dropped() {
        let mut list = TaskList::default();
        let added = task(1, "Buy milk");

        list.apply(ListEvent::Upserted(added.clone()));
        list.apply(ListEvent::Remote(ChangeEvent::Insert(added.clone())));

        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks()[0], added);
    }

    #[test]
    fn feed_insert_of_unknown_row_is_appended() {
        let mut list = TaskList::default();
        list.apply(ListEvent::Upserted(task(1, "mine")));
        list.apply(ListEvent::Remote(ChangeEvent::Insert(task(2, "from feed"))));

        assert_eq!(list.len(), 2);
        assert_eq!(list.tasks()[1].id, TaskId(2));
    }

    #[test]
    fn feed_update_and_delete_apply_by_id() {
        let mut list = TaskList::default();
        list.apply(ListEvent::Loaded(vec![task(1, "a"), task(2, "b")]));

        let mut changed = task(1, "a");
        changed.completed = true;
        list.apply(ListEvent::Remote(ChangeEvent::Update(changed)));
        assert!(list.get(TaskId(1)).expect("row 1").completed);

        list.apply(ListEvent::Remote(ChangeEvent::Delete(TaskId(2))));
        assert_eq!(list.len(), 1);
        assert!(list.get(TaskId(2)).is_none());
    }

    #[test]
    fn cleared_empties_the_view() {
        let mut list = TaskList::default();
        list.apply(ListEvent::Loaded(vec![task(1, "a"), task(2, "b")]));
        list.apply(ListEvent::Cleared);
        assert!(list.is_empty());
    }

    #[test]
    fn stats_follow_the_buy_milk_scenario() {
        let mut list = TaskList::default();
        let mut milk = task(1, "Buy milk");

        list.apply(ListEvent::Upserted(milk.clone()));
        assert_eq!(
            list.stats(),
            TaskStats {
                total: 1,
                completed: 0,
                important: 0
            }
        );

        milk.important = true;
        list.apply(ListEvent::Upserted(milk.clone()));
        assert_eq!(list.stats().important, 1);

        milk.completed = true;
        list.apply(ListEvent::Upserted(milk.clone()));
        let stats = list.stats();
        assert_eq!(stats.completed, 1);
        // Completed tasks leave the important card.
        assert_eq!(stats.important, 0);

        list.apply(ListEvent::Removed(milk.id));
        assert_eq!(list.stats(), TaskStats::default());
    }
}
