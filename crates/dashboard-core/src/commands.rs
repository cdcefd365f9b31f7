use std::io::Write;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::dashboard::{Clock, Dashboard, SubmitOutcome};
use crate::datetime::parse_deadline_expr;
use crate::filter::{TaskCriteria, UserCriteria};
use crate::render::Renderer;
use crate::source::UserSource;
use crate::state::{Section, Theme};
use crate::store::KeyValueStore;
use crate::task::{TaskId, TaskInput};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "dashboard",
        "users",
        "tasks",
        "add",
        "edit",
        "delete",
        "theme",
        "config",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Runs one command against the dashboard and writes its view to `out`.
#[instrument(skip(dash, source, cfg, renderer, out, inv), fields(command = %inv.command))]
pub async fn dispatch<K, C, S, W>(
    dash: &mut Dashboard<K, C>,
    source: &S,
    cfg: &Config,
    renderer: &mut Renderer,
    out: &mut W,
    inv: Invocation,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    S: UserSource,
    W: Write,
{
    debug!(args = ?inv.command_args, "dispatching command");
    let args = inv.command_args.as_slice();

    match inv.command.as_str() {
        "dashboard" => cmd_dashboard(dash, source, renderer, out).await,
        "users" => cmd_users(dash, source, renderer, out, args).await,
        "tasks" => cmd_tasks(dash, renderer, out, args),
        "add" => cmd_add(dash, renderer, out, args),
        "edit" => cmd_edit(dash, renderer, out, args),
        "delete" => cmd_delete(dash, renderer, out, args),
        "theme" => cmd_theme(dash, renderer, out, args),
        "config" => cmd_config(dash, cfg, renderer, out),
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

async fn cmd_dashboard<K, C, S, W>(
    dash: &mut Dashboard<K, C>,
    source: &S,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    S: UserSource,
    W: Write,
{
    info!("command dashboard");
    dash.navigate(Section::Dashboard);
    renderer.print_heading(out, dash.state().section)?;
    dash.refresh_users(source).await;

    renderer.print_stats(out, dash.users_status(), dash.pending_count())?;
    renderer.print_notices(out, &dash.drain_notices())
}

async fn cmd_users<K, C, S, W>(
    dash: &mut Dashboard<K, C>,
    source: &S,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    S: UserSource,
    W: Write,
{
    info!("command users");
    let (words, mods) = split_modifiers(args, &["search", "sort", "page"]);

    let mut criteria = UserCriteria { search: words.join(" "), ..UserCriteria::default() };
    let mut page = 1_usize;
    for (key, value) in mods {
        match key.as_str() {
            "search" => criteria.search = value,
            "sort" => criteria.sort = value.parse()?,
            "page" => {
                page = value
                    .parse()
                    .with_context(|| format!("invalid page number: {value}"))?;
            }
            _ => {}
        }
    }

    dash.navigate(Section::Users);
    dash.refresh_users(source).await;
    dash.set_user_criteria(criteria);
    dash.go_to_page(page);

    renderer.print_heading(out, dash.state().section)?;
    renderer.print_users_page(out, &dash.user_page(), dash.users_status())?;
    renderer.print_notices(out, &dash.drain_notices())
}

fn cmd_tasks<K, C, W>(
    dash: &mut Dashboard<K, C>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command tasks");
    let (words, mods) = split_modifiers(args, &["priority", "pri", "status", "deadline", "due"]);
    for word in &words {
        warn!(arg = %word, "unrecognized filter token ignored");
    }

    let mut criteria = TaskCriteria::default();
    for (key, value) in mods {
        match key.as_str() {
            "priority" | "pri" => criteria.priority = value.parse()?,
            "status" => criteria.status = value.parse()?,
            "deadline" | "due" => criteria.deadline = value.parse()?,
            _ => {}
        }
    }

    dash.navigate(Section::Tasks);
    dash.set_task_criteria(criteria);
    renderer.print_heading(out, dash.state().section)?;
    renderer.print_tasks(out, &dash.visible_tasks())?;
    writeln!(out, "{} pending of {} task(s)", dash.pending_count(), dash.tasks().len())?;
    Ok(())
}

const TASK_FIELDS: &[&str] = &[
    "title",
    "description",
    "desc",
    "priority",
    "pri",
    "status",
    "deadline",
    "due",
];

fn cmd_add<K, C, W>(
    dash: &mut Dashboard<K, C>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command add");
    let (words, mods) = split_modifiers(args, TASK_FIELDS);

    let mut form = dash.begin_create();
    form.title = words.join(" ");
    apply_task_fields(dash, &mut form, mods)?;

    let outcome = dash.submit(&form)?;
    renderer.print_notices(out, &dash.drain_notices())?;
    match outcome {
        SubmitOutcome::Created(id) => {
            writeln!(out, "Created task {id}.")?;
            Ok(())
        }
        SubmitOutcome::Rejected(failure) => Err(failure.into()),
        other => Err(anyhow!("unexpected add outcome: {other:?}")),
    }
}

fn cmd_edit<K, C, W>(
    dash: &mut Dashboard<K, C>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command edit");
    let (id, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("edit: task id is required"))?;
    let id = TaskId::from(id.as_str());

    let (words, mods) = split_modifiers(rest, TASK_FIELDS);
    for word in &words {
        warn!(arg = %word, "unrecognized edit token ignored");
    }

    let mut form = dash.begin_edit(&id)?;
    if let Err(error) = apply_task_fields(dash, &mut form, mods) {
        dash.cancel_edit();
        return Err(error);
    }

    let outcome = dash.submit(&form)?;
    renderer.print_notices(out, &dash.drain_notices())?;
    match outcome {
        SubmitOutcome::Updated(id) => {
            writeln!(out, "Updated task {id}.")?;
            Ok(())
        }
        SubmitOutcome::Missing(id) => Err(anyhow!("task not found: {id}")),
        SubmitOutcome::Rejected(failure) => {
            dash.cancel_edit();
            Err(failure.into())
        }
        other => Err(anyhow!("unexpected edit outcome: {other:?}")),
    }
}

fn cmd_delete<K, C, W>(
    dash: &mut Dashboard<K, C>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command delete");
    let id = args
        .first()
        .map(|raw| TaskId::from(raw.as_str()))
        .ok_or_else(|| anyhow!("delete: task id is required"))?;

    let removed = dash.delete_task(&id)?;
    debug!(removed, task_id = %id, "delete finished");
    renderer.print_notices(out, &dash.drain_notices())
}

fn cmd_theme<K, C, W>(
    dash: &mut Dashboard<K, C>,
    renderer: &mut Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command theme");
    let theme = match args.first().map(String::as_str) {
        None => dash.state().theme,
        Some("toggle") => dash.toggle_theme()?,
        Some(value) => dash.set_theme(value.parse::<Theme>()?)?,
    };
    renderer.set_theme(theme);
    writeln!(out, "Theme: {}", theme.storage_value())?;
    Ok(())
}

fn cmd_config<K, C, W>(
    dash: &mut Dashboard<K, C>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
    W: Write,
{
    info!("command config");
    dash.navigate(Section::Settings);
    renderer.print_heading(out, dash.state().section)?;
    writeln!(out, "Theme: {}", dash.state().theme.storage_value())?;
    writeln!(out)?;
    renderer.print_config(out, cfg)
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  dashboard                                   totals for users and pending tasks")?;
    writeln!(out, "  users [search:T] [sort:az|za|none] [page:N]  browse the user directory")?;
    writeln!(
        out,
        "  tasks [priority:P] [status:S] [deadline:all|upcoming]  list tasks"
    )?;
    writeln!(out, "  add <title> [description:..] [priority:..] [status:..] deadline:..")?;
    writeln!(out, "  edit <task-id> [title:..] [description:..] [priority:..] [status:..] [deadline:..]")?;
    writeln!(out, "  delete <task-id>")?;
    writeln!(out, "  theme [toggle|light|dark]")?;
    writeln!(out, "  config | help | version")?;
    Ok(())
}

/// Fills a form from `key:value` modifiers. Deadline expressions are
/// resolved to dates; anything unparseable is kept raw so validation
/// reports it against the deadline field.
fn apply_task_fields<K, C>(
    dash: &Dashboard<K, C>,
    form: &mut TaskInput,
    mods: Vec<(String, String)>,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    C: Clock,
{
    for (key, value) in mods {
        match key.as_str() {
            "title" => form.title = value,
            "description" | "desc" => form.description = value,
            "priority" | "pri" => form.priority = value.parse()?,
            "status" => form.status = value.parse()?,
            "deadline" | "due" => {
                form.deadline = match parse_deadline_expr(&value, dash.today()) {
                    Ok(date) => date.format(crate::datetime::DEADLINE_FORMAT).to_string(),
                    Err(error) => {
                        debug!(%error, value = %value, "keeping raw deadline");
                        value
                    }
                };
            }
            _ => {}
        }
    }
    Ok(())
}

/// Splits arguments into bare words and recognized `key:value` /
/// `key=value` modifiers. Everything after `--` is a bare word.
fn split_modifiers(args: &[String], keys: &[&str]) -> (Vec<String>, Vec<(String, String)>) {
    let mut words = Vec::new();
    let mut mods = Vec::new();
    let mut literal = false;

    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal {
            let split = arg.split_once(':').or_else(|| arg.split_once('='));
            if let Some((key, value)) = split {
                let key = key.to_ascii_lowercase();
                if keys.contains(&key.as_str()) {
                    mods.push((key, value.to_string()));
                    continue;
                }
            }
        }

        words.push(arg.clone());
    }

    (words, mods)
}
