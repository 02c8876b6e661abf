//! Deserializers for the loosely typed fields of the tracker API
//!
//! The API encodes booleans as `0`/`1`, sometimes as strings, and sends
//! identifiers and IMEIs either as numbers or strings.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// `1` (or `"1"`, `true`) is set; anything else, including `null`, is not
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlagValue>::deserialize(deserializer)? {
        Some(FlagValue::Bool(b)) => b,
        Some(FlagValue::Int(i)) => i == 1,
        Some(FlagValue::Float(f)) => f == 1.0,
        Some(FlagValue::String(s)) => {
            let t = s.trim();
            t == "1" || t.eq_ignore_ascii_case("true")
        },
        None => false,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

/// Accept a string or a number and keep it as text; `null` → `None`
pub fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }),
    )
}

/// Accept `123` or `"123"` for numeric identifiers
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Int(i) => u64::try_from(i)
            .map_err(|_| D::Error::custom(format!("Invalid identifier {}", i))),
        StringOrNumber::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("Invalid identifier '{}'", s))),
        StringOrNumber::Float(f) => Err(D::Error::custom(format!("Invalid identifier {}", f))),
    }
}
