pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod datetime;
pub mod directory;
pub mod filter;
pub mod render;
pub mod source;
pub mod state;
pub mod store;
pub mod task;
pub mod user;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub async fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dashboard CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.dashrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let kv = store::FileStore::open(
    &data_dir
  )
  .with_context(|| {
    format!(
      "failed to open data store at \
       {}",
      data_dir.display()
    )
  })?;

  let mut dash =
    dashboard::Dashboard::new(
      store::DataStore::new(kv),
      dashboard::SystemClock,
      cfg.timezone()
    );
  dash.start()?;

  let source =
    source::HttpUserSource::new(
      &cfg.users_url()
    )?;
  let mut renderer =
    render::Renderer::new(
      &cfg,
      dash.state().theme
    )?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let mut out =
    std::io::stdout().lock();
  commands::dispatch(
    &mut dash,
    &source,
    &cfg,
    &mut renderer,
    &mut out,
    inv
  )
  .await?;

  info!("done");
  Ok(())
}
