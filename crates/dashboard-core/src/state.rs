use std::str::FromStr;

use anyhow::anyhow;

use crate::filter::{TaskCriteria, UserCriteria};
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn storage_value(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_storage(s.trim().to_ascii_lowercase().as_str())
            .ok_or_else(|| anyhow!("invalid theme: {s} (expected light or dark)"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    Dashboard,
    Users,
    Tasks,
    Settings,
}

impl Section {
    pub fn page_id(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::Settings => "settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Users => "Users",
            Self::Tasks => "Tasks",
            Self::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient message for the user; drained after display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Everything the views are derived from. Only `theme` is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub theme: Theme,
    pub section: Section,
    pub users_page: usize,
    pub user_criteria: UserCriteria,
    pub task_criteria: TaskCriteria,
    editing: Option<TaskId>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            section: Section::default(),
            users_page: 1,
            user_criteria: UserCriteria::default(),
            task_criteria: TaskCriteria::default(),
            editing: None,
        }
    }
}

impl ViewState {
    /// `None` means the form creates a new task.
    pub fn editing(&self) -> Option<&TaskId> {
        self.editing.as_ref()
    }

    pub fn begin_edit(&mut self, id: TaskId) {
        self.editing = Some(id);
    }

    pub fn begin_create(&mut self) {
        self.editing = None;
    }

    pub fn finish_edit(&mut self) -> Option<TaskId> {
        self.editing.take()
    }

    pub fn reset_users_page(&mut self) {
        self.users_page = 1;
    }
}
