use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use deunicode::deunicode;
use tracing::trace;

use crate::datetime::upcoming_cutoff;
use crate::task::{
  Priority,
  Status,
  TaskRecord
};
use crate::user::UserRecord;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum SortOrder {
  #[default]
  Unsorted,
  Ascending,
  Descending
}

impl FromStr for SortOrder {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "" | "none" | "default" => {
        Ok(Self::Unsorted)
      }
      | "az" | "asc" => {
        Ok(Self::Ascending)
      }
      | "za" | "desc" => {
        Ok(Self::Descending)
      }
      | other => {
        Err(anyhow!(
          "invalid sort order: {other} \
           (expected az, za or none)"
        ))
      }
    }
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct UserCriteria {
  pub search: String,
  pub sort:   SortOrder
}

impl UserCriteria {
  pub fn matches(
    &self,
    user: &UserRecord
  ) -> bool {
    let term =
      self.search.to_lowercase();
    if term.is_empty() {
      return true;
    }

    user.name.to_lowercase().contains(&term)
      || user
        .email
        .to_lowercase()
        .contains(&term)
      || user
        .company
        .name
        .to_lowercase()
        .contains(&term)
  }
}

/// Collation for display names: base
/// letters first (accents folded),
/// then accented after plain, then
/// lowercase before uppercase.
pub fn locale_cmp(
  a: &str,
  b: &str
) -> Ordering {
  collation_key(a)
    .cmp(&collation_key(b))
    .then_with(|| {
      a.to_lowercase()
        .cmp(&b.to_lowercase())
    })
    .then_with(|| {
      case_swapped(a)
        .cmp(&case_swapped(b))
    })
}

fn collation_key(s: &str) -> String {
  deunicode(s).to_lowercase()
}

fn case_swapped(s: &str) -> String {
  s.chars()
    .flat_map(|ch| {
      let swapped: Vec<char> =
        if ch.is_uppercase() {
          ch.to_lowercase().collect()
        } else {
          ch.to_uppercase().collect()
        };
      swapped
    })
    .collect()
}

/// Indices into `users` that pass
/// `criteria`, in display order.
#[tracing::instrument(skip_all, fields(total = users.len()))]
pub fn filter_users(
  users: &[UserRecord],
  criteria: &UserCriteria
) -> Vec<usize> {
  let mut kept: Vec<usize> = users
    .iter()
    .enumerate()
    .filter(|(_, user)| {
      criteria.matches(user)
    })
    .map(|(idx, _)| idx)
    .collect();

  match criteria.sort {
    | SortOrder::Ascending => {
      kept.sort_by(|&a, &b| {
        locale_cmp(
          &users[a].name,
          &users[b].name
        )
      });
    }
    | SortOrder::Descending => {
      kept.sort_by(|&a, &b| {
        locale_cmp(
          &users[b].name,
          &users[a].name
        )
      });
    }
    | SortOrder::Unsorted => {}
  }

  trace!(kept = kept.len(), "filtered users");
  kept
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Only(Priority)
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Only(Status)
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum DeadlineFilter {
  #[default]
  All,
  Upcoming
}

impl FromStr for PriorityFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(Self::All);
    }
    Ok(Self::Only(s.parse()?))
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(Self::All);
    }
    Ok(Self::Only(s.parse()?))
  }
}

impl FromStr for DeadlineFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "upcoming" => {
        Ok(Self::Upcoming)
      }
      | other => {
        Err(anyhow!(
          "invalid deadline filter: \
           {other} (expected all or \
           upcoming)"
        ))
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct TaskCriteria {
  pub priority: PriorityFilter,
  pub status:   StatusFilter,
  pub deadline: DeadlineFilter
}

impl TaskCriteria {
  pub fn matches(
    &self,
    task: &TaskRecord,
    today: NaiveDate
  ) -> bool {
    let priority_match =
      match self.priority {
        | PriorityFilter::All => true,
        | PriorityFilter::Only(p) => {
          task.priority == p
        }
      };

    let status_match = match self.status
    {
      | StatusFilter::All => true,
      | StatusFilter::Only(s) => {
        task.status == s
      }
    };

    let deadline_match =
      match self.deadline {
        | DeadlineFilter::All => true,
        | DeadlineFilter::Upcoming => {
          task.deadline.is_some_and(
            |due| {
              due
                <= upcoming_cutoff(
                  today
                )
            }
          ) && task.status
            != Status::Done
        }
      };

    priority_match
      && status_match
      && deadline_match
  }
}

/// Indices into `tasks` that pass
/// `criteria`, in list order.
#[tracing::instrument(skip_all, fields(total = tasks.len()))]
pub fn filter_tasks(
  tasks: &[TaskRecord],
  criteria: &TaskCriteria,
  today: NaiveDate
) -> Vec<usize> {
  tasks
    .iter()
    .enumerate()
    .filter(|(_, task)| {
      criteria.matches(task, today)
    })
    .map(|(idx, _)| idx)
    .collect()
}
