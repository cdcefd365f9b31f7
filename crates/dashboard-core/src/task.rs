use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime::{DEADLINE_FORMAT, deadline_serde};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Builds a `task-<millis>` token, bumping the millisecond part until it
    /// does not collide with any id already in `existing`.
    pub fn generate(now: DateTime<Utc>, existing: &[TaskRecord]) -> Self {
        let mut millis = now.timestamp_millis();
        loop {
            let candidate = format!("task-{millis}");
            if !existing.iter().any(|task| task.id.0 == candidate) {
                return Self(candidate);
            }
            millis += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            other => Err(anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    #[default]
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "inprogress", alias = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "inprogress" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(anyhow!("invalid status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: Status,

    #[serde(default, with = "deadline_serde")]
    pub deadline: Option<NaiveDate>,
}

impl TaskRecord {
    pub fn is_pending(&self) -> bool {
        self.status != Status::Done
    }
}

/// Raw form values for a create or edit submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub deadline: String,
}

impl TaskInput {
    pub fn from_record(task: &TaskRecord) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status: task.status,
            deadline: task
                .deadline
                .map(|date| date.format(DEADLINE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ValidTask, ValidationFailure> {
        let mut fields = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            fields.push(InvalidField::TitleEmpty);
        }

        let raw_deadline = self.deadline.trim();
        let deadline = if raw_deadline.is_empty() {
            fields.push(InvalidField::DeadlineMissing);
            None
        } else {
            match NaiveDate::parse_from_str(raw_deadline, DEADLINE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    fields.push(InvalidField::DeadlineMalformed);
                    None
                }
            }
        };

        match deadline {
            Some(deadline) if fields.is_empty() => Ok(ValidTask {
                title: title.to_string(),
                description: self.description.trim().to_string(),
                priority: self.priority,
                status: self.status,
                deadline,
            }),
            _ => Err(ValidationFailure { fields }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTask {
    title: String,
    description: String,
    priority: Priority,
    status: Status,
    deadline: NaiveDate,
}

impl ValidTask {
    pub fn into_record(self, id: TaskId) -> TaskRecord {
        TaskRecord {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            deadline: Some(self.deadline),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidField {
    TitleEmpty,
    DeadlineMissing,
    DeadlineMalformed,
}

impl InvalidField {
    /// Name of the form field to mark.
    pub fn field(self) -> &'static str {
        match self {
            Self::TitleEmpty => "title",
            Self::DeadlineMissing | Self::DeadlineMalformed => "deadline",
        }
    }
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleEmpty => f.write_str("title is empty"),
            Self::DeadlineMissing => f.write_str("deadline is missing"),
            Self::DeadlineMalformed => f.write_str("deadline is not a YYYY-MM-DD date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task input: {}", describe_fields(.fields))]
pub struct ValidationFailure {
    pub fields: Vec<InvalidField>,
}

impl ValidationFailure {
    pub fn has(&self, field: InvalidField) -> bool {
        self.fields.contains(&field)
    }
}

fn describe_fields(fields: &[InvalidField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
