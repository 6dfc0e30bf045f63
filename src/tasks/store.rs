//! In-memory work-task registry.
//!
//! Tasks are deduplicated by tracker key, so resolving the same issue link
//! twice is safe: the second create reports `AlreadyExists` instead of
//! producing a duplicate entry.

use crate::tracker::WorkItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTask {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub item: WorkItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStatus {
    Created,
    AlreadyExists,
}

#[derive(Default)]
pub struct WorkTaskStore {
    tasks: RwLock<Vec<WorkTask>>,
}

impl WorkTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task for the given item unless one with the same tracker
    /// key is already present.
    pub fn create(&self, item: WorkItem) -> (WorkTask, CreateStatus) {
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = tasks.iter().find(|t| t.item.key == item.key) {
            return (existing.clone(), CreateStatus::AlreadyExists);
        }
        let task = WorkTask {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            item,
        };
        tasks.push(task.clone());
        (task, CreateStatus::Created)
    }

    pub fn list(&self) -> Vec<WorkTask> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str) -> WorkItem {
        WorkItem {
            key: key.to_string(),
            title: format!("{key} title"),
            description: None,
            assignee: None,
            status: "To Do".to_string(),
            start_date: None,
            due_date: None,
            site_source: "jira".to_string(),
            url_link: None,
        }
    }

    #[test]
    fn test_create_then_duplicate() {
        let store = WorkTaskStore::new();
        let (first, status) = store.create(item("KAN-1"));
        assert_eq!(status, CreateStatus::Created);

        let (second, status) = store.create(item("KAN-1"));
        assert_eq!(status, CreateStatus::AlreadyExists);
        assert_eq!(second.id, first.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_keys_coexist() {
        let store = WorkTaskStore::new();
        store.create(item("KAN-1"));
        store.create(item("KAN-2"));
        let keys: Vec<_> = store.list().into_iter().map(|t| t.item.key).collect();
        assert_eq!(keys, vec!["KAN-1", "KAN-2"]);
    }
}
