//! Lenient parsing for user supplied date-times.
//!
//! Browsers submit `datetime-local` inputs without seconds or offset, API clients tend to send
//! RFC 3339. Both end up as a [`NaiveDateTime`] in UTC.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::Deserialize;

const FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses `input` using all accepted formats. Returns `None` if no format matches.
pub fn parse(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.naive_utc());
    }

    for format in FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(input, format) {
            return Some(datetime);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_field<E>(input: Option<String>) -> Result<Option<NaiveDateTime>, E>
where
    E: de::Error,
{
    match input {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => match parse(&s) {
            Some(datetime) => Ok(Some(datetime)),
            None => Err(E::custom(format!("invalid date-time: {:?}", s))),
        },
    }
}

/// Deserializes an optional date-time. An empty string is treated like `null`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_field(Option::<String>::deserialize(deserializer)?)
}

/// Like [`deserialize_option`], but keeps "explicitly cleared" apart from "absent". Must be
/// combined with `#[serde(default)]`.
pub fn deserialize_patch<'de, D>(
    deserializer: D,
) -> Result<Option<Option<NaiveDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_option(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::Deserialize;

    use super::{deserialize_option, parse};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("2025-03-01T18:30"), Some(at(2025, 3, 1, 18, 30, 0)));
        assert_eq!(parse("2025-03-01T18:30:15"), Some(at(2025, 3, 1, 18, 30, 15)));
        assert_eq!(parse("2025-03-01 18:30:15"), Some(at(2025, 3, 1, 18, 30, 15)));
        assert_eq!(parse("2025-03-01"), Some(at(2025, 3, 1, 0, 0, 0)));
        assert_eq!(
            parse("2025-03-01T18:30:00+03:00"),
            Some(at(2025, 3, 1, 15, 30, 0))
        );
        assert_eq!(parse("2025-03-01T18:30:00Z"), Some(at(2025, 3, 1, 18, 30, 0)));

        assert_eq!(parse("tomorrow"), None);
        assert_eq!(parse("2025-13-01"), None);
    }

    #[test]
    fn test_deserialize_option() {
        #[derive(Debug, Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "deserialize_option")]
            start_date: Option<NaiveDateTime>,
        }

        let body: Body = serde_json::from_str(r#"{"start_date": ""}"#).unwrap();
        assert_eq!(body.start_date, None);

        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.start_date, None);

        let body: Body = serde_json::from_str(r#"{"start_date": "2025-03-01T18:30"}"#).unwrap();
        assert_eq!(body.start_date, Some(at(2025, 3, 1, 18, 30, 0)));

        serde_json::from_str::<Body>(r#"{"start_date": "soon"}"#).unwrap_err();
    }
}
