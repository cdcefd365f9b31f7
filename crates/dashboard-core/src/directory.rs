use tracing::{info, warn};

use crate::filter::{UserCriteria, filter_users};
use crate::source::UserSource;
use crate::user::UserRecord;

pub const USERS_PER_PAGE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UsersStatus {
    #[default]
    Idle,
    Loaded {
        total: usize,
    },
    Failed {
        reason: String,
    },
}

/// Position of one page inside a filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// 1-based, inclusive; 0 when the view is empty.
    pub start: usize,
    pub end: usize,
}

impl PageInfo {
    pub fn new(page: usize, per_page: usize, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(per_page).max(1);
        let first = page.saturating_sub(1).saturating_mul(per_page);
        let (start, end) = if total_items == 0 || first >= total_items {
            (0, 0)
        } else {
            (first + 1, page.saturating_mul(per_page).min(total_items))
        };
        Self { page, per_page, total_items, total_pages, start, end }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage<'a> {
    pub users: Vec<&'a UserRecord>,
    pub info: PageInfo,
}

impl UserPage<'_> {
    /// True when the filtered view has nothing to show.
    pub fn is_empty(&self) -> bool {
        self.info.total_items == 0
    }
}

#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
    filtered: Vec<usize>,
    status: UsersStatus,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user set with a fresh fetch. Failures are folded into
    /// [`UsersStatus::Failed`] and leave the directory empty.
    pub async fn load<S: UserSource>(&mut self, source: &S) -> &UsersStatus {
        match source.fetch_users().await {
            Ok(users) => {
                info!(total = users.len(), "user directory loaded");
                self.filtered = (0..users.len()).collect();
                self.status = UsersStatus::Loaded { total: users.len() };
                self.users = users;
            }
            Err(error) => {
                warn!(error = %error, "user directory fetch failed");
                self.users.clear();
                self.filtered.clear();
                self.status = UsersStatus::Failed { reason: format!("{error:#}") };
            }
        }
        &self.status
    }

    pub fn apply_filter(&mut self, criteria: &UserCriteria) {
        self.filtered = filter_users(&self.users, criteria);
    }

    /// Slice of the filtered view for a 1-based page. Out-of-range pages
    /// yield no rows; keeping `page` in range is the caller's job.
    pub fn get_page(&self, page: usize) -> UserPage<'_> {
        let info = PageInfo::new(page, USERS_PER_PAGE, self.filtered.len());
        let users = self
            .filtered
            .iter()
            .skip(page.saturating_sub(1).saturating_mul(USERS_PER_PAGE))
            .take(USERS_PER_PAGE)
            .map(|&idx| &self.users[idx])
            .collect();
        UserPage { users, info }
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(USERS_PER_PAGE).max(1)
    }

    pub fn total_users(&self) -> usize {
        self.users.len()
    }

    pub fn status(&self) -> &UsersStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortOrder;
    use crate::source::FetchError;
    use crate::user::{Company, UserId};

    struct FixedSource(Vec<UserRecord>);

    impl UserSource for FixedSource {
        async fn fetch_users(&self) -> Result<Vec<UserRecord>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    impl UserSource for DownSource {
        async fn fetch_users(&self) -> Result<Vec<UserRecord>, FetchError> {
            Err(FetchError::Status { url: "http://users.invalid".to_string(), status: 503 })
        }
    }

    fn users(count: u64) -> Vec<UserRecord> {
        (1..=count)
            .map(|n| UserRecord {
                id: UserId::Number(n),
                name: format!("User {n:02}"),
                email: format!("user{n}@example.com"),
                phone: "555-0100".to_string(),
                company: Company { name: if n % 2 == 0 { "Even Co" } else { "Odd Inc" }.to_string() },
            })
            .collect()
    }

    #[tokio::test]
    async fn twelve_users_split_into_three_pages() {
        let mut directory = UserDirectory::new();
        let status = directory.load(&FixedSource(users(12))).await;
        assert_eq!(status, &UsersStatus::Loaded { total: 12 });

        let first = directory.get_page(1);
        assert_eq!(first.users.len(), 5);
        assert_eq!(first.users[0].name, "User 01");
        assert_eq!((first.info.start, first.info.end), (1, 5));

        let second = directory.get_page(2);
        assert_eq!((second.info.start, second.info.end), (6, 10));

        let third = directory.get_page(3);
        assert_eq!(third.users.len(), 2);
        assert_eq!(third.users[1].name, "User 12");
        assert_eq!((third.info.start, third.info.end), (11, 12));
        assert_eq!(third.info.total_pages, 3);
        assert!(!third.info.has_next());
        assert!(third.info.has_prev());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_directory_empty() {
        let mut directory = UserDirectory::new();
        directory.load(&FixedSource(users(3))).await;

        let status = directory.load(&DownSource).await.clone();
        assert!(matches!(status, UsersStatus::Failed { ref reason } if reason.contains("503")));
        assert_eq!(directory.total_users(), 0);

        let page = directory.get_page(1);
        assert!(page.is_empty());
        assert_eq!(page.info.total_pages, 1);
        assert_eq!((page.info.start, page.info.end), (0, 0));
    }

    #[tokio::test]
    async fn filter_is_recomputed_from_full_set() {
        let mut directory = UserDirectory::new();
        directory.load(&FixedSource(users(6))).await;

        directory.apply_filter(&UserCriteria { search: "even".to_string(), sort: SortOrder::Descending });
        let names: Vec<&str> = directory.get_page(1).users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["User 06", "User 04", "User 02"]);

        directory.apply_filter(&UserCriteria { search: "odd".to_string(), sort: SortOrder::Unsorted });
        let names: Vec<&str> = directory.get_page(1).users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["User 01", "User 03", "User 05"]);

        directory.apply_filter(&UserCriteria { search: "nobody".to_string(), sort: SortOrder::Ascending });
        assert!(directory.get_page(1).is_empty());
        assert_eq!(directory.total_pages(), 1);
    }

    #[test]
    fn page_past_the_end_is_empty_not_a_panic() {
        let directory = UserDirectory::new();
        let page = directory.get_page(4);
        assert!(page.users.is_empty());
    }

    #[tokio::test]
    async fn huge_page_numbers_yield_an_empty_page() {
        let mut directory = UserDirectory::new();
        directory.load(&FixedSource(users(7))).await;

        let page = directory.get_page(usize::MAX);
        assert!(page.users.is_empty());
        assert_eq!((page.info.start, page.info.end), (0, 0));
        assert_eq!(page.info.total_items, 7);

        let info = PageInfo::new(usize::MAX / 2, USERS_PER_PAGE, 7);
        assert_eq!((info.start, info.end), (0, 0));
    }
}
