use super::CapabilityError;
use crate::safety::deny_option_like;
use serde_json::{Map, Value};

pub fn required_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, CapabilityError> {
    optional_str(args, key)?.ok_or_else(|| CapabilityError::MissingArgument {
        arg: key.to_string(),
    })
}

pub fn optional_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, CapabilityError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(type_error(key, "string")),
    }
}

pub fn optional_bool(
    args: &Map<String, Value>,
    key: &str,
    default: bool,
) -> Result<bool, CapabilityError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(type_error(key, "boolean")),
    }
}

pub fn optional_i64(
    args: &Map<String, Value>,
    key: &str,
    default: i64,
) -> Result<i64, CapabilityError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))
            .ok_or_else(|| type_error(key, "integer")),
        Some(_) => Err(type_error(key, "integer")),
    }
}

/// Accepts either an array of strings or a single string.
pub fn optional_str_list(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, CapabilityError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(vec![value.clone()])),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| type_error(key, "array of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(type_error(key, "array of strings")),
    }
}

/// A trimmed ref or branch name that git cannot mistake for an option.
pub fn required_revision<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, CapabilityError> {
    let value = required_str(args, key)?.trim();
    deny_option_like(key, value)?;
    Ok(value)
}

pub fn optional_revision<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, CapabilityError> {
    let Some(value) = optional_str(args, key)?.map(str::trim) else {
        return Ok(None);
    };
    deny_option_like(key, value)?;
    Ok(Some(value))
}

pub fn dry_run(args: &Map<String, Value>) -> Result<bool, CapabilityError> {
    optional_bool(args, "dry_run", true)
}

fn type_error(key: &str, expected: &str) -> CapabilityError {
    CapabilityError::InvalidArgumentType {
        arg: key.to_string(),
        expected: expected.to_string(),
    }
}
