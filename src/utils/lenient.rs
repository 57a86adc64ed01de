//! Deserializers for loosely-typed method parameters.
//!
//! Parameters arrive from a user interface that sends booleans as `0`/`1`, numbers as
//! strings and unset values as `null` or `""`. These helpers accept all of those and
//! hand strongly typed values to the rest of the crate.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

/// Deserializes a boolean flag. Zero, `false`, `null` and `""` are all unset.
///
/// ```rust
/// use serde::Deserialize;
/// #[derive(Deserialize)]
/// struct Flags {
///     #[serde(default, deserialize_with = "kb_fasttree::utils::lenient::flag")]
///     gamma: bool,
/// }
/// let parse = |s: &str| serde_json::from_str::<Flags>(s).map(|f| f.gamma);
/// assert_eq!(parse(r#"{"gamma": 1}"#)?, true);
/// assert_eq!(parse(r#"{"gamma": "0"}"#)?, false);
/// assert_eq!(parse(r#"{"gamma": true}"#)?, true);
/// assert_eq!(parse(r#"{"gamma": null}"#)?, false);
/// assert_eq!(parse(r#"{"gamma": ""}"#)?, false);
/// assert_eq!(parse(r#"{}"#)?, false);
/// assert!(parse(r#"{"gamma": "yes please"}"#).is_err());
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map(|n| n != 0.0).unwrap_or(false)),
        Value::String(s) => match s.trim() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => other
                .parse::<f64>()
                .map(|n| n != 0.0)
                .map_err(|_| D::Error::custom(format!("expected a boolean flag, found: {other:?}"))),
        },
        other => Err(D::Error::custom(format!("expected a boolean flag, found: {other}"))),
    }
}

/// Deserializes an optional positive count. Zero, `null` and `""` are unset.
///
/// ```rust
/// use serde::Deserialize;
/// #[derive(Deserialize)]
/// struct Cat {
///     #[serde(default, deserialize_with = "kb_fasttree::utils::lenient::count")]
///     cat: Option<u32>,
/// }
/// let parse = |s: &str| serde_json::from_str::<Cat>(s).map(|c| c.cat);
/// assert_eq!(parse(r#"{"cat": 20}"#)?, Some(20));
/// assert_eq!(parse(r#"{"cat": "4"}"#)?, Some(4));
/// assert_eq!(parse(r#"{"cat": 0}"#)?, None);
/// assert_eq!(parse(r#"{"cat": null}"#)?, None);
/// assert!(parse(r#"{"cat": -2}"#).is_err());
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match n {
        Some(0) => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a positive count, found: {n}"))),
        None => Err(D::Error::custom("expected a positive count")),
    }
}

/// Deserializes an optional string. `null` and `""` are unset, numbers are stringified.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected a string, found: {other}"))),
    }
}
