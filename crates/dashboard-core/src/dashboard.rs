use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::board::{BoardError, TaskBoard};
use crate::datetime::today_in;
use crate::directory::{UserDirectory, UserPage, UsersStatus};
use crate::filter::{TaskCriteria, UserCriteria};
use crate::source::UserSource;
use crate::state::{Notice, Section, Theme, ViewState};
use crate::store::{DataStore, KeyValueStore};
use crate::task::{TaskId, TaskInput, TaskRecord, ValidationFailure};

/// Source of "now" for id generation and the upcoming window.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(TaskId),
    Updated(TaskId),
    /// The task being edited disappeared before submit.
    Missing(TaskId),
    Rejected(ValidationFailure),
}

/// Owns the view state and both pipelines. Every mutating call ends with
/// [`Dashboard::recompute`].
#[derive(Debug)]
pub struct Dashboard<K, C = SystemClock> {
    state: ViewState,
    users: UserDirectory,
    board: TaskBoard,
    store: DataStore<K>,
    clock: C,
    tz: Tz,
    notices: Vec<Notice>,
}

impl<K: KeyValueStore, C: Clock> Dashboard<K, C> {
    pub fn new(store: DataStore<K>, clock: C, tz: Tz) -> Self {
        Self {
            state: ViewState::default(),
            users: UserDirectory::new(),
            board: TaskBoard::new(),
            store,
            clock,
            tz,
            notices: Vec::new(),
        }
    }

    /// Restores the saved theme and task list.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.state.theme = self.store.load_theme()?;
        let today = self.today();
        self.board.load(&self.store, &self.state.task_criteria, today)?;
        info!(theme = self.state.theme.storage_value(), "dashboard started");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn refresh_users<S: UserSource>(&mut self, source: &S) -> UsersStatus {
        let status = self.users.load(source).await.clone();
        if let UsersStatus::Failed { reason } = &status {
            debug!(reason = %reason, "surfacing user fetch failure");
            self.notices.push(Notice::error("Error loading users"));
        }
        self.users.apply_filter(&self.state.user_criteria);
        self.state.reset_users_page();
        self.recompute();
        status
    }

    pub fn set_user_criteria(&mut self, criteria: UserCriteria) {
        self.users.apply_filter(&criteria);
        self.state.user_criteria = criteria;
        self.state.reset_users_page();
        self.recompute();
    }

    /// Moves to `page`, clamped to the pages that exist.
    pub fn go_to_page(&mut self, page: usize) {
        self.state.users_page = page;
        self.recompute();
    }

    pub fn next_page(&mut self) {
        if self.state.users_page < self.users.total_pages() {
            self.state.users_page += 1;
            self.recompute();
        }
    }

    pub fn prev_page(&mut self) {
        if self.state.users_page > 1 {
            self.state.users_page -= 1;
            self.recompute();
        }
    }

    pub fn set_task_criteria(&mut self, criteria: TaskCriteria) {
        self.state.task_criteria = criteria;
        self.recompute();
    }

    pub fn begin_create(&mut self) -> TaskInput {
        self.state.begin_create();
        TaskInput::default()
    }

    /// Enters edit mode for `id` and returns the form prefilled from it.
    pub fn begin_edit(&mut self, id: &TaskId) -> anyhow::Result<TaskInput> {
        let task = self.board.get(id).ok_or_else(|| anyhow!("task not found: {id}"))?;
        let form = TaskInput::from_record(task);
        self.state.begin_edit(id.clone());
        Ok(form)
    }

    pub fn cancel_edit(&mut self) {
        self.state.finish_edit();
    }

    #[instrument(skip(self, input), fields(editing = ?self.state.editing()))]
    pub fn submit(&mut self, input: &TaskInput) -> anyhow::Result<SubmitOutcome> {
        let result = match self.state.editing().cloned() {
            Some(id) => self.board.update(&mut self.store, &id, input).map(|found| {
                if found {
                    (SubmitOutcome::Updated(id), Notice::success("Task updated successfully"))
                } else {
                    let notice = Notice::error(format!("Task {id} no longer exists"));
                    (SubmitOutcome::Missing(id), notice)
                }
            }),
            None => self
                .board
                .create(&mut self.store, input, self.clock.now())
                .map(|id| (SubmitOutcome::Created(id), Notice::success("Task added successfully"))),
        };

        match result {
            Ok((outcome, notice)) => {
                self.state.finish_edit();
                self.notices.push(notice);
                self.recompute();
                Ok(outcome)
            }
            Err(BoardError::Validation(failure)) => {
                warn!(error = %failure, "task form rejected");
                self.notices.push(Notice::error("Please fill in all required fields"));
                Ok(SubmitOutcome::Rejected(failure))
            }
            Err(BoardError::Storage(error)) => Err(error),
        }
    }

    pub fn delete_task(&mut self, id: &TaskId) -> anyhow::Result<bool> {
        let removed = self.board.delete(&mut self.store, id)?;
        if self.state.editing() == Some(id) {
            self.state.finish_edit();
        }
        self.notices.push(if removed {
            Notice::info("Task deleted")
        } else {
            Notice::error(format!("Task {id} not found"))
        });
        self.recompute();
        Ok(removed)
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<Theme> {
        self.set_theme(self.state.theme.next())
    }

    pub fn set_theme(&mut self, theme: Theme) -> anyhow::Result<Theme> {
        self.state.theme = theme;
        self.store.save_theme(theme)?;
        Ok(theme)
    }

    pub fn navigate(&mut self, section: Section) {
        debug!(page = section.page_id(), "navigating");
        self.state.section = section;
    }

    /// Re-derives every view from authoritative state.
    pub fn recompute(&mut self) {
        let today = self.today();
        self.board.apply_filter(&self.state.task_criteria, today);
        self.state.users_page = self.state.users_page.clamp(1, self.users.total_pages());
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn user_page(&self) -> UserPage<'_> {
        self.users.get_page(self.state.users_page)
    }

    pub fn users_status(&self) -> &UsersStatus {
        self.users.status()
    }

    pub fn total_users(&self) -> usize {
        self.users.total_users()
    }

    pub fn visible_tasks(&self) -> Vec<&TaskRecord> {
        self.board.filtered()
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        self.board.tasks()
    }

    pub fn pending_count(&self) -> usize {
        self.board.pending_count()
    }

    pub fn store(&self) -> &DataStore<K> {
        &self.store
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        today_in(self.clock.now(), self.tz)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::filter::{DeadlineFilter, SortOrder};
    use crate::source::FetchError;
    use crate::state::NoticeLevel;
    use crate::store::{MemoryStore, TASKS_KEY, THEME_KEY};
    use crate::task::{InvalidField, Status};
    use crate::user::{Company, UserId, UserRecord};

    struct FixedSource(Vec<UserRecord>);

    impl UserSource for FixedSource {
        async fn fetch_users(&self) -> Result<Vec<UserRecord>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().expect("valid now"))
    }

    fn dashboard(store: MemoryStore) -> Dashboard<MemoryStore, FixedClock> {
        let mut dash = Dashboard::new(DataStore::new(store), clock(), chrono_tz::UTC);
        dash.start().expect("start");
        dash
    }

    fn form(title: &str, deadline: &str) -> TaskInput {
        TaskInput { title: title.to_string(), deadline: deadline.to_string(), ..TaskInput::default() }
    }

    fn roster(count: u64) -> Vec<UserRecord> {
        (1..=count)
            .map(|n| UserRecord {
                id: UserId::Number(n),
                name: format!("Member {n:02}"),
                email: format!("m{n}@example.org"),
                phone: "555-0199 x12".to_string(),
                company: Company { name: "Acme".to_string() },
            })
            .collect()
    }

    #[test]
    fn start_restores_saved_theme() {
        let dash = dashboard(MemoryStore::new().with_slot(THEME_KEY, "dark"));
        assert_eq!(dash.state().theme, Theme::Dark);
    }

    #[test]
    fn toggle_theme_persists_immediately() {
        let mut dash = dashboard(MemoryStore::new());
        assert_eq!(dash.toggle_theme().expect("toggle"), Theme::Dark);
        assert_eq!(dash.store().inner().writes(THEME_KEY), 1);
        assert_eq!(dash.store().load_theme().expect("load"), Theme::Dark);
    }

    #[test]
    fn edit_submit_clears_editing_state() {
        let mut dash = dashboard(MemoryStore::new());
        let SubmitOutcome::Created(id) = dash.submit(&form("Draft agenda", "2026-10-18")).expect("submit")
        else {
            panic!("expected a created task");
        };

        let mut edit = dash.begin_edit(&id).expect("begin edit");
        assert_eq!(dash.state().editing(), Some(&id));
        assert_eq!(edit.deadline, "2026-10-18");

        edit.status = Status::Done;
        assert_eq!(dash.submit(&edit).expect("submit"), SubmitOutcome::Updated(id.clone()));
        assert_eq!(dash.state().editing(), None);
        assert_eq!(dash.tasks().len(), 1);
        assert_eq!(dash.pending_count(), 0);

        let messages: Vec<String> = dash.drain_notices().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Task added successfully", "Task updated successfully"]);
    }

    #[test]
    fn rejected_submit_keeps_edit_mode() {
        let mut dash = dashboard(MemoryStore::new());
        dash.submit(&form("Keep", "2026-10-20")).expect("submit");
        let id = dash.tasks()[0].id.clone();
        dash.begin_edit(&id).expect("begin edit");

        let outcome = dash.submit(&form("Keep", "")).expect("submit");
        match outcome {
            SubmitOutcome::Rejected(failure) => assert!(failure.has(InvalidField::DeadlineMissing)),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(dash.state().editing(), Some(&id));
        assert_eq!(dash.store().inner().writes(TASKS_KEY), 1);

        let last = dash.drain_notices().pop().expect("notice");
        assert_eq!(last.level, NoticeLevel::Error);
    }

    #[test]
    fn deleting_the_edited_task_leaves_edit_mode() {
        let mut dash = dashboard(MemoryStore::new());
        dash.submit(&form("Temp", "2026-10-17")).expect("submit");
        let id = dash.tasks()[0].id.clone();
        dash.begin_edit(&id).expect("begin edit");

        assert!(dash.delete_task(&id).expect("delete"));
        assert_eq!(dash.state().editing(), None);
        assert!(dash.begin_edit(&id).is_err());
    }

    #[test]
    fn task_criteria_drive_visible_tasks() {
        let mut dash = dashboard(MemoryStore::new());
        dash.submit(&form("Soon", "2026-10-19")).expect("submit");
        dash.submit(&form("Later", "2026-11-30")).expect("submit");

        dash.set_task_criteria(TaskCriteria { deadline: DeadlineFilter::Upcoming, ..TaskCriteria::default() });
        let titles: Vec<&str> = dash.visible_tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Soon"]);
        assert_eq!(dash.pending_count(), 2);
    }

    #[tokio::test]
    async fn paging_clamps_and_resets_on_filter_change() {
        let mut dash = dashboard(MemoryStore::new());
        dash.refresh_users(&FixedSource(roster(12))).await;
        assert_eq!(dash.total_users(), 12);

        dash.go_to_page(9);
        assert_eq!(dash.state().users_page, 3);
        assert_eq!(dash.user_page().users.len(), 2);

        dash.next_page();
        assert_eq!(dash.state().users_page, 3);

        dash.prev_page();
        assert_eq!(dash.state().users_page, 2);

        dash.set_user_criteria(UserCriteria { search: "member 1".to_string(), sort: SortOrder::Descending });
        assert_eq!(dash.state().users_page, 1);
        let names: Vec<&str> = dash.user_page().users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Member 12", "Member 11", "Member 10"]);

        dash.set_user_criteria(UserCriteria { search: "nobody".to_string(), sort: SortOrder::Unsorted });
        assert!(dash.user_page().is_empty());
        assert_eq!(dash.state().users_page, 1);
    }

    #[tokio::test]
    async fn fresh_fetch_returns_to_first_page() {
        let mut dash = dashboard(MemoryStore::new());
        let source = FixedSource(roster(12));
        dash.refresh_users(&source).await;

        dash.go_to_page(3);
        assert_eq!(dash.state().users_page, 3);

        dash.refresh_users(&source).await;
        assert_eq!(dash.state().users_page, 1);
        assert_eq!(dash.user_page().info.start, 1);
    }

    #[test]
    fn submit_reports_exactly_one_notice_per_outcome() {
        let mut dash = dashboard(MemoryStore::new());
        let SubmitOutcome::Created(_) = dash.submit(&form("Ship", "2026-10-18")).expect("submit") else {
            panic!("expected a created task");
        };
        let notices = dash.drain_notices();
        assert_eq!(notices, vec![Notice::success("Task added successfully")]);

        dash.state.begin_edit(TaskId::from("task-gone"));
        let outcome = dash.submit(&form("Ghost", "2026-10-18")).expect("submit");
        assert!(matches!(outcome, SubmitOutcome::Missing(_)));
        assert_eq!(dash.state().editing(), None);
        let notices = dash.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("task-gone"));
    }
}
