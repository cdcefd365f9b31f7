use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::filter::{TaskCriteria, filter_tasks};
use crate::store::{DataStore, KeyValueStore};
use crate::task::{TaskId, TaskInput, TaskRecord, ValidationFailure};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Authoritative task list plus its filtered view.
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<TaskRecord>,
    filtered: Vec<usize>,
    pending: usize,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip_all)]
    pub fn load<K: KeyValueStore>(
        &mut self,
        store: &DataStore<K>,
        criteria: &TaskCriteria,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        self.tasks = store.load_tasks()?;
        self.apply_filter(criteria, today);
        self.recount();
        info!(total = self.tasks.len(), pending = self.pending, "task board loaded");
        Ok(())
    }

    /// Rebuilds the filtered view from the full list.
    pub fn apply_filter(&mut self, criteria: &TaskCriteria, today: NaiveDate) {
        self.filtered = filter_tasks(&self.tasks, criteria, today);
        debug!(shown = self.filtered.len(), total = self.tasks.len(), "task filter applied");
    }

    #[tracing::instrument(skip(self, store, input, now))]
    pub fn create<K: KeyValueStore>(
        &mut self,
        store: &mut DataStore<K>,
        input: &TaskInput,
        now: DateTime<Utc>,
    ) -> Result<TaskId, BoardError> {
        let valid = input.validate()?;
        let id = TaskId::generate(now, &self.tasks);
        self.tasks.push(valid.into_record(id.clone()));
        store.save_tasks(&self.tasks)?;
        self.recount();
        info!(task_id = %id, "task created");
        Ok(id)
    }

    /// Replaces the record with identity `id`. Returns `false`, without
    /// touching any record, when no such task exists.
    #[tracing::instrument(skip(self, store, input), fields(task_id = %id))]
    pub fn update<K: KeyValueStore>(
        &mut self,
        store: &mut DataStore<K>,
        id: &TaskId,
        input: &TaskInput,
    ) -> Result<bool, BoardError> {
        let valid = input.validate()?;
        let found = match self.tasks.iter_mut().find(|task| &task.id == id) {
            Some(slot) => {
                *slot = valid.into_record(id.clone());
                true
            }
            None => {
                debug!("update target not found");
                false
            }
        };
        store.save_tasks(&self.tasks)?;
        self.recount();
        Ok(found)
    }

    /// Removes the task if present. The list is persisted either way.
    #[tracing::instrument(skip(self, store), fields(task_id = %id))]
    pub fn delete<K: KeyValueStore>(
        &mut self,
        store: &mut DataStore<K>,
        id: &TaskId,
    ) -> anyhow::Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        let removed = self.tasks.len() != before;
        store.save_tasks(&self.tasks)?;
        self.recount();
        Ok(removed)
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn filtered(&self) -> Vec<&TaskRecord> {
        self.filtered.iter().filter_map(|&idx| self.tasks.get(idx)).collect()
    }

    fn recount(&mut self) {
        self.pending = self.tasks.iter().filter(|task| task.is_pending()).count();
    }
}
