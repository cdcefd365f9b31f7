use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::{
  DEFAULT_TIMEZONE,
  parse_timezone
};
use crate::source::DEFAULT_USERS_URL;

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.dashboard".to_string()
    );
    map.insert(
      "users.url".to_string(),
      DEFAULT_USERS_URL.to_string()
    );
    map.insert(
      "default.command".to_string(),
      "dashboard".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "timezone".to_string(),
      DEFAULT_TIMEZONE.to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    dashrc_override
  ))]
  pub fn load(
    dashrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let dashrc = resolve_dashrc_path(
      dashrc_override
    )?;
    if let Some(path) = dashrc {
      info!(dashrc = %path.display(), "loading dashrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no dashrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `None` when the key is unset; an
  /// error when it is not a boolean.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid {key} setting: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn users_url(&self) -> String {
    self
      .get("users.url")
      .unwrap_or_else(|| {
        DEFAULT_USERS_URL.to_string()
      })
  }

  /// Timezone used to decide what
  /// "today" is; falls back to UTC.
  pub fn timezone(&self) -> Tz {
    self
      .get("timezone")
      .and_then(|raw| {
        parse_timezone(&raw)
      })
      .unwrap_or(chrono_tz::UTC)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(canonical(&path));

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&canonical(
            &include_path
          ))
        {
          warn!(include = %include_path.display(), "include already loaded; skipping");
        } else if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_dashrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(dashrc_env) =
    std::env::var("DASHRC")
  {
    if dashrc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      dashrc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate = home.join(".dashrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".dashboard"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn canonical(path: &Path) -> PathBuf {
  fs::canonicalize(path)
    .unwrap_or_else(|_| {
      path.to_path_buf()
    })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    Config,
    resolve_data_dir
  };

  #[test]
  fn reads_keys_comments_and_includes()
   {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "timezone = Europe/Berlin\n"
    )
    .expect("write include");

    let main = temp.path().join("dashrc");
    fs::write(
      &main,
      "# dashboard settings\n\
       users.url = http://localhost:9/users # local mock\n\
       color = off\n\
       include extra.rc\n"
    )
    .expect("write dashrc");

    let cfg = Config::load(Some(&main))
      .expect("load config");
    assert_eq!(
      cfg.users_url(),
      "http://localhost:9/users"
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color flag"),
      Some(false)
    );
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Europe::Berlin
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "rc.timezone".to_string(),
      "not/a-zone".to_string()
    )]);
    assert_eq!(
      cfg.get("timezone").as_deref(),
      Some("not/a-zone")
    );
    assert_eq!(
      cfg.timezone(),
      chrono_tz::UTC
    );
  }

  #[test]
  fn rejects_lines_without_equals() {
    let temp =
      tempdir().expect("tempdir");
    let main = temp.path().join("dashrc");
    fs::write(&main, "color on\n")
      .expect("write dashrc");
    assert!(
      Config::load(Some(&main)).is_err()
    );
  }

  #[test]
  fn data_dir_override_is_created() {
    let temp =
      tempdir().expect("tempdir");
    let target =
      temp.path().join("nested/data");
    let dir = resolve_data_dir(
      &Config::default(),
      Some(&target)
    )
    .expect("resolve");
    assert_eq!(dir, target);
    assert!(target.is_dir());
  }

  #[test]
  fn include_cycles_are_loaded_once() {
    let temp =
      tempdir().expect("tempdir");
    let main = temp.path().join("dashrc");
    let other =
      temp.path().join("other.rc");
    fs::write(
      &main,
      "color = off\ninclude other.rc\ninclude dashrc\n"
    )
    .expect("write dashrc");
    fs::write(
      &other,
      "timezone = UTC\ninclude dashrc\n"
    )
    .expect("write other");

    let cfg = Config::load(Some(&main))
      .expect("cyclic includes load");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
  }

  #[test]
  fn non_boolean_flag_is_an_error() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "color".to_string(),
      "sometimes".to_string()
    )]);
    assert!(cfg.get_bool("color").is_err());
    assert_eq!(
      cfg
        .get_bool("missing.key")
        .expect("unset key"),
      None
    );
  }
}
