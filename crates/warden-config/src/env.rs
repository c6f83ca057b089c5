//! Environment overrides and `${VAR}` reference resolution.
//!
//! `WARDEN_<SECTION>_<KEY>` overrides any file layer. The value is parsed
//! according to the type of the key in the embedded defaults: integers,
//! booleans and floats are parsed, arrays are comma-separated strings (or a
//! JSON array when the value starts with `[`).

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Prefix of override variables.
pub const ENV_PREFIX: &str = "WARDEN_";

/// Apply `WARDEN_*` overrides to `merged`, typed by `defaults`.
///
/// Variables that do not name a known key are ignored. Returns the dotted
/// paths that were overridden, in variable name order.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] when a value does not parse as the
/// key's type.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    defaults: &toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Vec<String>> {
    let Some(defaults) = defaults.as_table() else {
        return Ok(Vec::new());
    };

    let mut names: Vec<&String> = env_vars.keys().filter(|k| k.starts_with(ENV_PREFIX)).collect();
    names.sort();

    let mut applied = Vec::new();
    for name in names {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some((section, key, default)) = find_key(defaults, rest) else {
            debug!(var = %name, "ignoring environment variable that names no config key");
            continue;
        };
        let raw = env_vars.get(name).map(String::as_str).unwrap_or_default();
        let value = coerce(name, raw, default)?;

        if let Some(root) = merged.as_table_mut() {
            let table = root
                .entry(section.clone())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
            if let Some(table) = table.as_table_mut() {
                table.insert(key.clone(), value);
            }
        }
        debug!(var = %name, field = %format!("{section}.{key}"), "applied environment override");
        applied.push(format!("{section}.{key}"));
    }
    Ok(applied)
}

/// Resolve `WARDEN_` suffixes such as `GITHUB_OIDC_AUDIENCE` to a section
/// and key. Section names contain underscores, so the longest section whose
/// key exists wins.
fn find_key<'a>(
    defaults: &'a toml::map::Map<String, toml::Value>,
    rest: &str,
) -> Option<(String, String, &'a toml::Value)> {
    defaults
        .iter()
        .filter_map(|(section, table)| {
            let table = table.as_table()?;
            let upper = section.to_ascii_uppercase();
            let key = rest.strip_prefix(&upper)?.strip_prefix('_')?.to_ascii_lowercase();
            let default = table.get(&key)?;
            Some((section.clone(), key, default))
        })
        .max_by_key(|(section, _, _)| section.len())
}

fn coerce(var_name: &str, raw: &str, default: &toml::Value) -> ConfigResult<toml::Value> {
    let env_error = |message: String| ConfigError::EnvError {
        var_name: var_name.to_owned(),
        message,
    };
    let trimmed = raw.trim();

    match default {
        toml::Value::String(_) => Ok(toml::Value::String(raw.to_owned())),
        toml::Value::Integer(_) => trimmed
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| env_error(format!("expected an integer, got '{trimmed}'"))),
        toml::Value::Float(_) => trimmed
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|_| env_error(format!("expected a number, got '{trimmed}'"))),
        toml::Value::Boolean(_) => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "false" | "0" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(env_error(format!("expected a boolean, got '{trimmed}'"))),
        },
        toml::Value::Array(_) if trimmed.starts_with('[') => {
            let json: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| env_error(format!("invalid JSON array: {e}")))?;
            toml::Value::try_from(json).map_err(|e| env_error(format!("JSON array not representable: {e}")))
        },
        toml::Value::Array(_) => Ok(toml::Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| toml::Value::String(item.to_owned()))
                .collect(),
        )),
        toml::Value::Table(_) | toml::Value::Datetime(_) => {
            Err(env_error("this key cannot be set from the environment".to_owned()))
        },
    }
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = resolve_string_refs(s, env_vars);
            }
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = %var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
