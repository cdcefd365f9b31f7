use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Days,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

pub const DEADLINE_FORMAT: &str =
  "%Y-%m-%d";
pub const UPCOMING_WINDOW_DAYS: u64 =
  7;
pub const DEFAULT_TIMEZONE: &str =
  "UTC";

pub fn parse_timezone(
  raw: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::warn!(
        timezone = %trimmed,
        %error,
        "invalid timezone"
      );
      None
    }
  }
}

/// Calendar date of `now` as seen
/// from `tz`.
#[must_use]
pub fn today_in(
  now: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

/// Last calendar date that still
/// counts as upcoming.
#[must_use]
pub fn upcoming_cutoff(
  today: NaiveDate
) -> NaiveDate {
  today
    .checked_add_days(Days::new(
      UPCOMING_WINDOW_DAYS
    ))
    .unwrap_or(NaiveDate::MAX)
}

#[must_use]
pub fn format_deadline(
  deadline: Option<NaiveDate>
) -> String {
  match deadline {
    | Some(date) => {
      date
        .format("%b %-d, %Y")
        .to_string()
    }
    | None => {
      "No deadline".to_string()
    }
  }
}

#[tracing::instrument(skip(today))]
pub fn parse_deadline_expr(
  raw: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let text =
    raw.trim().to_ascii_lowercase();
  if text.is_empty() {
    return Err(anyhow!(
      "deadline cannot be empty"
    ));
  }

  match text.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "deadline out of range"
          )
        });
    }
    | _ => {}
  }

  if let Some(caps) =
    relative_re().captures(&text)
  {
    let num: u64 = caps["num"]
      .parse()
      .map_err(|_| {
        anyhow!(
          "invalid relative \
           deadline: {raw}"
        )
      })?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    return today
      .checked_add_days(Days::new(days))
      .ok_or_else(|| {
        anyhow!(
          "deadline out of range: \
           {raw}"
        )
      });
  }

  NaiveDate::parse_from_str(
    &text,
    DEADLINE_FORMAT
  )
  .map_err(|_| {
    anyhow!(
      "unrecognized deadline: {raw}"
    )
  })
}

fn relative_re() -> &'static Regex {
  static RELATIVE: OnceLock<Regex> =
    OnceLock::new();
  RELATIVE.get_or_init(|| {
    Regex::new(
      r"^\+(?P<num>\d+)(?P<unit>[dw])$"
    )
    .unwrap_or_else(|error| {
      panic!(
        "relative deadline regex: \
         {error}"
      )
    })
  })
}

/// `Option<NaiveDate>` as a
/// `YYYY-MM-DD` string. Empty strings
/// read back as no deadline.
pub mod deadline_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::DEADLINE_FORMAT;

  pub fn serialize<S>(
    value: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match value {
      | Some(date) => {
        serializer.serialize_str(
          &date
            .format(DEADLINE_FORMAT)
            .to_string()
        )
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    match raw.as_deref().map(str::trim)
    {
      | None | Some("") => Ok(None),
      | Some(text) => {
        NaiveDate::parse_from_str(
          text,
          DEADLINE_FORMAT
        )
        .map(Some)
        .map_err(
          serde::de::Error::custom
        )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    format_deadline,
    parse_deadline_expr,
    parse_timezone,
    today_in,
    upcoming_cutoff
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_relative_and_named_deadlines()
   {
    let today = date(2026, 10, 16);
    assert_eq!(
      parse_deadline_expr(
        "today", today
      )
      .expect("today"),
      today
    );
    assert_eq!(
      parse_deadline_expr(
        "tomorrow", today
      )
      .expect("tomorrow"),
      date(2026, 10, 17)
    );
    assert_eq!(
      parse_deadline_expr("+3d", today)
        .expect("+3d"),
      date(2026, 10, 19)
    );
    assert_eq!(
      parse_deadline_expr("+2w", today)
        .expect("+2w"),
      date(2026, 10, 30)
    );
    assert_eq!(
      parse_deadline_expr(
        "2027-01-05",
        today
      )
      .expect("iso"),
      date(2027, 1, 5)
    );
    assert!(
      parse_deadline_expr(
        "someday", today
      )
      .is_err()
    );
  }

  #[test]
  fn cutoff_is_seven_days_out() {
    assert_eq!(
      upcoming_cutoff(date(
        2026, 12, 28
      )),
      date(2027, 1, 4)
    );
  }

  #[test]
  fn today_follows_timezone() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 16, 2, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = parse_timezone(
      "America/Mexico_City"
    )
    .expect("known timezone");
    assert_eq!(
      today_in(now, tz),
      date(2026, 10, 15)
    );
    assert!(
      parse_timezone("Mars/Olympus")
        .is_none()
    );
  }

  #[test]
  fn formats_display_dates() {
    assert_eq!(
      format_deadline(Some(date(
        2026, 3, 7
      ))),
      "Mar 7, 2026"
    );
    assert_eq!(
      format_deadline(None),
      "No deadline"
    );
  }
}
