//! `times`: timestamps for dated fields.
//!
//! Timestamps are Unix seconds in UTC and formats use `strftime` syntax,
//! so a snippet like `|d| times::format(times::parse(d, "%b %d, %Y"), "%Y-%m-%d")`
//! normalises a site's dates.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rhai::{ImmutableString, Module};

use crate::{Error, Result, ScriptResult};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Parse `text` with `format`. A format without a time of day yields
/// midnight.
pub fn parse(text: &str, format: &str) -> Result<i64> {
    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
        return Ok(datetime.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(text, format)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().timestamp())
        .map_err(|e| Error::usage("times.parse", format!("'{text}' does not match '{format}': {e}")))
}

pub fn format(timestamp: i64, format: &str) -> Result<String> {
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| Error::usage("times.format", format!("timestamp {timestamp} is out of range")))?;
    let mut out = String::new();
    write!(out, "{}", datetime.format(format))
        .map_err(|_| Error::usage("times.format", format!("invalid format '{format}'")))?;
    Ok(out)
}

pub fn module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("now", || -> ScriptResult<i64> { Ok(now()) });

    module.set_native_fn(
        "parse",
        |text: ImmutableString, fmt: ImmutableString| -> ScriptResult<i64> { Ok(parse(&text, &fmt)?) },
    );

    module.set_native_fn(
        "format",
        |timestamp: i64, fmt: ImmutableString| -> ScriptResult<String> { Ok(format(timestamp, &fmt)?) },
    );

    module
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAN_2: i64 = 1_704_153_600;

    #[test]
    fn parses_dates_at_midnight() {
        assert_eq!(parse("2024-01-02", "%Y-%m-%d").unwrap(), JAN_2);
        assert_eq!(parse(" Jan 02, 2024 ", "%b %d, %Y").unwrap(), JAN_2);
    }

    #[test]
    fn parses_date_times() {
        assert_eq!(parse("2024-01-02 10:30", "%Y-%m-%d %H:%M").unwrap(), JAN_2 + 37_800);
    }

    #[test]
    fn mismatched_text_is_an_error() {
        let err = parse("yesterday", "%Y-%m-%d").unwrap_err();
        assert!(err.to_string().starts_with("times.parse: 'yesterday'"));
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(format(JAN_2, "%d %b %Y").unwrap(), "02 Jan 2024");
        assert!(format(JAN_2, "%Q").is_err());
    }

    #[test]
    fn now_is_after_2024() {
        assert!(now() > JAN_2);
    }
}
