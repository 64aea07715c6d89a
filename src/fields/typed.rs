//! Coercions for typed fields
//!
//! Coercion is the last step of the pipeline. Text is parsed, a value that
//! already has the target type passes through, and anything else becomes
//! `Null`.

use chrono::format::{parse as parse_with, ParseResult, Parsed, StrftimeItems};
use chrono::{FixedOffset, NaiveDateTime, TimeZone};

use crate::value::Value;

pub(super) fn to_int(value: Value<'_>) -> Value<'_> {
    match value {
        Value::Text(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        Value::Int(i) => Value::Int(i),
        _ => Value::Null,
    }
}

pub(super) fn to_float(value: Value<'_>) -> Value<'_> {
    match value {
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        Value::Float(f) => Value::Float(f),
        Value::Int(i) => Value::Float(i as f64),
        _ => Value::Null,
    }
}

pub(super) fn to_date<'a>(
    value: Value<'a>,
    format: &str,
    timezone: Option<FixedOffset>,
) -> Value<'a> {
    let naive = match value {
        Value::Text(s) => match parse_naive(s.trim(), format) {
            Some(naive) => naive,
            None => return Value::Null,
        },
        Value::Date(naive) => naive,
        Value::DateTime(dt) => match timezone {
            Some(tz) => return Value::DateTime(dt.with_timezone(&tz)),
            None => return Value::DateTime(dt),
        },
        _ => return Value::Null,
    };

    match timezone {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .single()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        None => Value::Date(naive),
    }
}

/// Parse `text` with `format`. Fields the format leaves out default to
/// 1900-01-01 00:00:00, as with `strptime`.
fn parse_naive(text: &str, format: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    parse_with(&mut parsed, text, StrftimeItems::new(format)).ok()?;
    fill_defaults(&mut parsed).ok()?;

    let date = parsed.to_naive_date().ok()?;
    let time = parsed.to_naive_time().ok()?;
    Some(date.and_time(time))
}

fn fill_defaults(parsed: &mut Parsed) -> ParseResult<()> {
    let has_year = parsed.year().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.isoyear_mod_100().is_some();
    if !has_year {
        parsed.set_year(1900)?;
    }

    // Ordinal and week numbers pin the day on their own
    let day_of_year = parsed.ordinal().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some()
        || parsed.isoweek().is_some();
    if !day_of_year {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }

    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        // %I without %p is a morning hour
        (None, Some(_)) => parsed.set_ampm(false)?,
        // %p without an hour is 12 o'clock
        (Some(_), None) => parsed.set_hour12(12)?,
        (Some(_), Some(_)) => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    Ok(())
}

pub(super) fn to_bool(value: Value<'_>) -> Value<'_> {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(b),
        _ => Value::Bool(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_int() {
        assert_eq!(to_int(Value::from("42")), Value::Int(42));
        assert_eq!(to_int(Value::from(" 42\n")), Value::Int(42));
        assert_eq!(to_int(Value::from("2.5")), Value::Null);
        assert_eq!(to_int(Value::from("2016-04-23")), Value::Null);
        assert_eq!(to_int(Value::Int(7)), Value::Int(7));
        assert_eq!(to_int(Value::Bool(true)), Value::Null);
    }

    #[test]
    fn test_float() {
        assert_eq!(to_float(Value::from("2.5")), Value::Float(2.5));
        assert_eq!(to_float(Value::from("42")), Value::Float(42.0));
        assert_eq!(to_float(Value::Int(2)), Value::Float(2.0));
        assert_eq!(to_float(Value::from("2016-04-23")), Value::Null);
        assert_eq!(to_float(Value::Null), Value::Null);
    }

    #[test]
    fn test_date_only_format() {
        let value = to_date(Value::from("2016-04-23"), "%Y-%m-%d", None);
        let date = value.as_date().unwrap();
        assert_eq!(date.year(), 2016);
        assert_eq!(date.month(), 4);
        assert_eq!(date.day(), 23);
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_date_time_format() {
        let value = to_date(
            Value::from("2016-04-23 13:45"),
            "%Y-%m-%d %H:%M",
            None,
        );
        let date = value.as_date().unwrap();
        assert_eq!(date.hour(), 13);
        assert_eq!(date.minute(), 45);
    }

    #[test]
    fn test_date_keeps_partial_time() {
        let value = to_date(Value::from("2016-04-23 13"), "%Y-%m-%d %H", None);
        let date = value.as_date().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2016, 4, 23));
        assert_eq!((date.hour(), date.minute(), date.second()), (13, 0, 0));
    }

    #[test]
    fn test_time_only_format_defaults_date() {
        let value = to_date(Value::from("13:45"), "%H:%M", None);
        let date = value.as_date().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (1900, 1, 1));
        assert_eq!((date.hour(), date.minute()), (13, 45));
    }

    #[test]
    fn test_partial_date_defaults_day() {
        let value = to_date(Value::from("04/2016"), "%m/%Y", None);
        let date = value.as_date().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2016, 4, 1));
    }

    #[test]
    fn test_twelve_hour_clock() {
        let value = to_date(Value::from("2016-04-23 01:30 PM"), "%Y-%m-%d %I:%M %p", None);
        assert_eq!(value.as_date().unwrap().hour(), 13);

        let value = to_date(Value::from("2016-04-23 01:30"), "%Y-%m-%d %I:%M", None);
        assert_eq!(value.as_date().unwrap().hour(), 1);
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        assert_eq!(to_date(Value::from("2016-04-23 junk"), "%Y-%m-%d", None), Value::Null);
    }

    #[test]
    fn test_date_with_timezone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let value = to_date(Value::from("2016-04-23"), "%Y-%m-%d", Some(tz));
        let dt = value.as_datetime().unwrap();
        assert_eq!(dt.offset(), &tz);
        assert_eq!(dt.day(), 23);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_date_failure() {
        assert_eq!(to_date(Value::from("2.5"), "%Y-%m-%d", None), Value::Null);
        assert_eq!(to_date(Value::Int(3), "%Y-%m-%d", None), Value::Null);
    }

    #[test]
    fn test_bool() {
        assert_eq!(to_bool(Value::from("")), Value::Bool(true));
        assert_eq!(to_bool(Value::Bool(false)), Value::Bool(false));
        assert_eq!(to_bool(Value::Null), Value::Null);
    }
}
