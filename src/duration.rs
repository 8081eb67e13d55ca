//! Human-readable durations for config files: "500ms", "12s", "2m", "1h", "1d".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

/// Parse a duration string made of a whole number and a unit.
///
/// Units: `ms`, `s`, `m`, `h`, `d`. Case-insensitive; surrounding whitespace
/// is ignored.
///
/// ```
/// use ledger_quotes::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("12s").unwrap(), Duration::from_secs(12));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .context("Duration must end with ms, s, m, h, or d")?;
    let (num, unit) = s.split_at(split);
    if num.is_empty() {
        anyhow::bail!("Duration is missing a number: {s:?}");
    }
    let num: u64 = num.parse().context("Invalid number in duration")?;

    let millis_per_unit: u64 = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        other => anyhow::bail!("Unknown duration unit {other:?}"),
    };

    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;
    Ok(Duration::from_millis(millis))
}

/// Render a duration with the largest unit that divides it exactly.
pub fn format_duration(d: Duration) -> String {
    const UNITS: &[(u128, &str)] = &[
        (24 * 60 * 60 * 1_000, "d"),
        (60 * 60 * 1_000, "h"),
        (60 * 1_000, "m"),
        (1_000, "s"),
    ];

    let millis = d.as_millis();
    for &(size, suffix) in UNITS {
        if millis >= size && millis % size == 0 {
            return format!("{}{}", millis / size, suffix);
        }
    }
    if millis == 0 {
        return "0s".to_string();
    }
    format!("{millis}ms")
}

/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Use with `#[serde(default, deserialize_with = "deserialize_duration_opt")]`.
pub fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| parse_duration(&s).map_err(de::Error::custom))
        .transpose()
}

pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}

pub fn serialize_duration_opt<S>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match d {
        Some(d) => serializer.serialize_some(&format_duration(*d)),
        None => serializer.serialize_none(),
    }
}
