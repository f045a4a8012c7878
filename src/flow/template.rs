//! `{{#nodeId.path#}}` and `{{$NAME$}}` substitution in node configs.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

use regex::{Captures, Regex};
use serde_json::Value;

use crate::{ForgeError, Result, flow::NodeId};

/// Format: `{{#nodeId#}}`, `{{#nodeId.key#}}` or `{{#nodeId.key.subkey#}}`
static OUTPUT_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{#([^.#]+)(?:\.([^#]+))?#\}\}").expect("output template pattern"));
/// Format: `{{$VAR_NAME$}}`
static ENV_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{\$([^$]+)\$\}\}").expect("env template pattern"));

/// Values a template may refer to while one node runs.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// outputs of the node's upstream nodes
    pub upstream: &'a BTreeMap<NodeId, Value>,
    /// flow env
    pub env: &'a HashMap<String, String>,
}

impl<'a> Scope<'a> {
    pub fn new(
        upstream: &'a BTreeMap<NodeId, Value>,
        env: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            upstream,
            env,
        }
    }

    /// Output of `node_id` walked along a dotted `path`.
    ///
    /// Numeric segments index into arrays.
    pub fn lookup(
        &self,
        node_id: &str,
        path: Option<&str>,
    ) -> Option<&'a Value> {
        let mut current = self.upstream.get(node_id)?;
        let Some(path) = path else {
            return Some(current);
        };
        for key in path.split('.') {
            current = match current {
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                other => other.get(key)?,
            };
        }
        Some(current)
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        // numbers, booleans, and JSON text for objects and arrays
        other => other.to_string(),
    }
}

/// Substitute `{{$NAME$}}` references, collecting unknown names in `errors`.
fn expand_env<'t>(
    scope: &Scope<'_>,
    template: &'t str,
    errors: &mut Vec<String>,
) -> Cow<'t, str> {
    ENV_TEMPLATE.replace_all(template, |caps: &Captures<'_>| match scope.env.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            errors.push(format!("env variable '{}' not found", &caps[1]));
            caps[0].to_string()
        }
    })
}

/// Substitute every template variable in `template`.
///
/// Fails listing every reference that could not be resolved.
pub fn resolve_template(
    scope: &Scope<'_>,
    template: &str,
) -> Result<String> {
    let mut errors: Vec<String> = Vec::new();
    let with_env = expand_env(scope, template, &mut errors);

    let resolved = OUTPUT_TEMPLATE.replace_all(&with_env, |caps: &Captures<'_>| match scope.lookup(&caps[1], caps.get(2).map(|m| m.as_str())) {
        Some(value) => to_text(value),
        None => {
            errors.push(format!("variable '{}' not found", &caps[0]));
            caps[0].to_string()
        }
    });

    if !errors.is_empty() {
        return Err(ForgeError::Runtime(errors.join(", ")));
    }
    Ok(resolved.into_owned())
}

/// Every output referenced by `template`, as JSON values.
///
/// Env references are substituted first. A template without output
/// references yields itself, env substituted, as a single string.
pub fn resolve_template_to_values(
    scope: &Scope<'_>,
    template: &str,
) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    let with_env = expand_env(scope, template, &mut errors);

    for caps in OUTPUT_TEMPLATE.captures_iter(&with_env) {
        match scope.lookup(&caps[1], caps.get(2).map(|m| m.as_str())) {
            Some(value) => values.push(value.clone()),
            None => errors.push(format!("variable '{}' not found", &caps[0])),
        }
    }

    if !errors.is_empty() {
        return Err(ForgeError::Runtime(errors.join(", ")));
    }
    if values.is_empty() {
        return Ok(vec![Value::String(with_env.into_owned())]);
    }
    Ok(values)
}

/// Resolve every string inside `value`, recursively.
///
/// A string that resolves to JSON object or array text is parsed back.
pub fn resolve_json_value(
    scope: &Scope<'_>,
    value: &Value,
) -> Result<Value> {
    match value {
        Value::String(s) => {
            let resolved = resolve_template(scope, s)?;
            if resolved.starts_with('{') || resolved.starts_with('[') {
                Ok(serde_json::from_str(&resolved).unwrap_or(Value::String(resolved)))
            } else {
                Ok(Value::String(resolved))
            }
        }
        Value::Array(items) => Ok(Value::Array(items.iter().map(|v| resolve_json_value(scope, v)).collect::<Result<Vec<_>>>()?)),
        Value::Object(obj) => {
            let resolved = obj.iter().map(|(k, v)| resolve_json_value(scope, v).map(|rv| (k.clone(), rv))).collect::<Result<serde_json::Map<_, _>>>()?;
            Ok(Value::Object(resolved))
        }
        _ => Ok(value.clone()),
    }
}
