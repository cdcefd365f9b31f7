use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_deadline;
use crate::directory::{PageInfo, UserPage, UsersStatus};
use crate::state::{Notice, NoticeLevel, Section, Theme};
use crate::task::{Priority, Status, TaskRecord};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color: color && io::stdout().is_terminal(), theme })
    }

    /// Plain-text renderer, used for piped output and tests.
    pub fn plain(theme: Theme) -> Self {
        Self { color: false, theme }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn print_heading<W: Write>(&self, out: &mut W, section: Section) -> anyhow::Result<()> {
        let title = section.title();
        writeln!(out, "{}", self.paint(title, self.palette().accent))?;
        writeln!(out, "{}", "=".repeat(UnicodeWidthStr::width(title)))?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_users_page<W: Write>(
        &self,
        out: &mut W,
        page: &UserPage<'_>,
        status: &UsersStatus,
    ) -> anyhow::Result<()> {
        if let UsersStatus::Failed { .. } = status {
            writeln!(out, "{}", self.paint("Error loading users. Please try again.", self.palette().error))?;
            return Ok(());
        }

        if page.is_empty() {
            writeln!(out, "No users found.")?;
            return Ok(());
        }

        let headers = vec![
            "Name".to_string(),
            "Email".to_string(),
            "Company".to_string(),
            "Phone".to_string(),
        ];
        let rows = page
            .users
            .iter()
            .map(|user| {
                vec![
                    self.paint(&user.name, self.palette().accent),
                    user.email.clone(),
                    user.company.name.clone(),
                    user.phone_display().to_string(),
                ]
            })
            .collect();

        write_table(&mut *out, headers, rows)?;
        writeln!(out)?;
        writeln!(out, "{}", pagination_line(&page.info))?;
        writeln!(out, "{}", self.page_markers(&page.info))?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn print_tasks<W: Write>(&self, out: &mut W, tasks: &[&TaskRecord]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found")?;
            writeln!(out, "Try adjusting your filters or add a new task.")?;
            return Ok(());
        }

        for task in tasks {
            let description = if task.description.is_empty() {
                "No description"
            } else {
                task.description.as_str()
            };

            writeln!(out, "{}  [{}]", self.paint(&task.title, self.palette().accent), task.id)?;
            writeln!(out, "  {description}")?;
            writeln!(
                out,
                "  {}  {}  {}",
                self.paint(task.priority.label(), self.priority_code(task.priority)),
                self.paint(task.status.label(), self.status_code(task.status)),
                format_deadline(task.deadline),
            )?;
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn print_stats<W: Write>(
        &self,
        out: &mut W,
        users: &UsersStatus,
        pending_tasks: usize,
    ) -> anyhow::Result<()> {
        let total_users = match users {
            UsersStatus::Loaded { total } => total.to_string(),
            UsersStatus::Idle | UsersStatus::Failed { .. } => "-".to_string(),
        };
        writeln!(out, "Total users    {total_users}")?;
        writeln!(out, "Pending tasks  {pending_tasks}")?;
        Ok(())
    }

    pub fn print_notices<W: Write>(&self, out: &mut W, notices: &[Notice]) -> anyhow::Result<()> {
        for notice in notices {
            let code = match notice.level {
                NoticeLevel::Info => self.palette().muted,
                NoticeLevel::Success => self.palette().success,
                NoticeLevel::Error => self.palette().error,
            };
            writeln!(out, "{}", self.paint(&notice.message, code))?;
        }
        Ok(())
    }

    pub fn print_config<W: Write>(&self, out: &mut W, cfg: &Config) -> anyhow::Result<()> {
        let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
        entries.sort();
        let rows = entries.into_iter().map(|(k, v)| vec![k.clone(), v.clone()]).collect();
        write_table(out, vec!["Key".to_string(), "Value".to_string()], rows)
    }

    fn page_markers(&self, info: &PageInfo) -> String {
        let mut parts = Vec::with_capacity(info.total_pages + 2);
        parts.push(if info.has_prev() { "< Previous".to_string() } else { String::new() });
        for n in 1..=info.total_pages {
            if n == info.page {
                parts.push(self.paint(&format!("[{n}]"), self.palette().accent));
            } else {
                parts.push(n.to_string());
            }
        }
        parts.push(if info.has_next() { "Next >".to_string() } else { String::new() });
        parts.retain(|part| !part.is_empty());
        parts.join(" ")
    }

    fn palette(&self) -> Palette {
        match self.theme {
            Theme::Light => Palette { accent: "34", muted: "90", success: "32", error: "31" },
            Theme::Dark => Palette { accent: "96", muted: "37", success: "92", error: "91" },
        }
    }

    fn priority_code(&self, priority: Priority) -> &'static str {
        match priority {
            Priority::High => self.palette().error,
            Priority::Medium => "33",
            Priority::Low => self.palette().success,
        }
    }

    fn status_code(&self, status: Status) -> &'static str {
        match status {
            Status::Todo => self.palette().muted,
            Status::InProgress => self.palette().accent,
            Status::Done => self.palette().success,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    accent: &'static str,
    muted: &'static str,
    success: &'static str,
    error: &'static str,
}

pub fn pagination_line(info: &PageInfo) -> String {
    format!("Showing {} to {} of {} results", info.start, info.end, info.total_items)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
