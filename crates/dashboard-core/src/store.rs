use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::state::Theme;
use crate::task::TaskRecord;

pub const TASKS_KEY: &str = "dashboard-tasks";
pub const THEME_KEY: &str = "dashboard-theme";

/// String-keyed slots that survive between sessions.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One file per key inside a data directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.data"))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            debug!(file = %path.display(), "slot not present");
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.slot_path(key);
        debug!(file = %path.display(), bytes = value.len(), "writing slot atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// In-process slots that also count writes per key.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }

    pub fn writes(&self, key: &str) -> usize {
        self.writes.get(key).copied().unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        *self.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

/// Typed access to the task list and theme slots.
#[derive(Debug)]
pub struct DataStore<K> {
    kv: K,
}

impl<K: KeyValueStore> DataStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn inner(&self) -> &K {
        &self.kv
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<TaskRecord>> {
        let Some(raw) = self.kv.get(TASKS_KEY)? else {
            debug!("no saved tasks; starting empty");
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tasks: Vec<TaskRecord> =
            serde_json::from_str(&raw).with_context(|| format!("failed parsing {TASKS_KEY}"))?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    /// Rewrites the whole list; there are no partial writes.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&mut self, tasks: &[TaskRecord]) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(tasks)?;
        self.kv
            .set(TASKS_KEY, &serialized)
            .with_context(|| format!("failed to save {TASKS_KEY}"))
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Theme> {
        let stored = self.kv.get(THEME_KEY)?;
        match stored.as_deref().map(str::trim) {
            None | Some("") => Ok(Theme::default()),
            Some(value) => Ok(Theme::from_storage(value).unwrap_or_else(|| {
                warn!(value, "unknown saved theme; using light");
                Theme::default()
            })),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&mut self, theme: Theme) -> anyhow::Result<()> {
        self.kv
            .set(THEME_KEY, theme.storage_value())
            .with_context(|| format!("failed to save {THEME_KEY}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::task::{Priority, Status, TaskId};

    fn sample() -> Vec<TaskRecord> {
        vec![TaskRecord {
            id: TaskId::from("task-1700000000000"),
            title: "Renew certificates".to_string(),
            description: "before the audit".to_string(),
            priority: Priority::High,
            status: Status::Todo,
            deadline: NaiveDate::from_ymd_opt(2026, 10, 20),
        }]
    }

    #[test]
    fn file_store_round_trips_tasks_and_theme() {
        let temp = tempdir().expect("tempdir");
        let mut store = DataStore::new(FileStore::open(temp.path()).expect("open store"));

        assert!(store.load_tasks().expect("empty load").is_empty());
        assert_eq!(store.load_theme().expect("default theme"), Theme::Light);

        store.save_tasks(&sample()).expect("save tasks");
        store.save_theme(Theme::Dark).expect("save theme");

        let reopened = DataStore::new(FileStore::open(temp.path()).expect("reopen"));
        assert_eq!(reopened.load_tasks().expect("load tasks"), sample());
        assert_eq!(reopened.load_theme().expect("load theme"), Theme::Dark);
        assert!(reopened.inner().slot_path(TASKS_KEY).exists());
    }

    #[test]
    fn unknown_theme_falls_back_to_light() {
        let store = DataStore::new(MemoryStore::new().with_slot(THEME_KEY, "sepia"));
        assert_eq!(store.load_theme().expect("load theme"), Theme::Light);
    }

    #[test]
    fn corrupt_task_slot_is_an_error() {
        let store = DataStore::new(MemoryStore::new().with_slot(TASKS_KEY, "{not json"));
        let err = store.load_tasks().unwrap_err();
        assert!(format!("{err:#}").contains(TASKS_KEY));
    }

    #[test]
    fn reads_browser_era_payload_with_empty_deadline() {
        let raw = r#"[{"id":"task-1","title":"Call vendor","description":"","priority":"low","deadline":"","status":"inprogress"}]"#;
        let store = DataStore::new(MemoryStore::new().with_slot(TASKS_KEY, raw));
        let tasks = store.load_tasks().expect("load");
        assert_eq!(tasks[0].deadline, None);
        assert_eq!(tasks[0].status, Status::InProgress);
    }
}
