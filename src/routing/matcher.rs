//! Query and body matching.
//!
//! # Responsibilities
//! - Parse query strings into comparable maps
//! - Produce the canonical query string and canonical JSON body used in dispatch keys
//! - Compare declared and incoming bodies, strictly and in simplified form
//!
//! # Design Decisions
//! - Canonical query: keys sorted, keys and values percent-encoded, leading `?`
//! - Canonical body: compact serde_json serialization, integral floats written as integers
//! - `null`, `""` and `{}` all mean "no body"
//! - Pure functions, no allocation beyond the returned values

use std::collections::BTreeMap;

use serde_json::Value;

/// Parsed query parameters. Ordered so the canonical form is stable.
pub type QueryMap = BTreeMap<String, String>;

/// Parse a query string, with or without its leading `?`.
///
/// Later duplicates of a key replace earlier ones. A pair without `=` maps to `""`.
pub fn parse_query(raw: &str) -> QueryMap {
    let raw = raw.strip_prefix('?').unwrap_or(raw);

    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(component: &str) -> String {
    urlencoding::decode(component)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| component.to_string())
}

/// Build the canonical query string. Empty maps give an empty string.
pub fn canonical_query_string(query: &QueryMap) -> String {
    if query.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", pairs.join("&"))
}

/// True when every declared parameter is present in `incoming` with the same value.
/// Extra incoming parameters are allowed.
pub fn query_subset(declared: &QueryMap, incoming: &QueryMap) -> bool {
    declared
        .iter()
        .all(|(key, value)| incoming.get(key) == Some(value))
}

/// An incoming request body after UTF-8 decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyForm {
    /// The body parsed as JSON.
    Json(Value),
    /// The body is not JSON; kept as text.
    Raw(String),
}

impl BodyForm {
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => BodyForm::Json(value),
            Err(_) => BodyForm::Raw(text.into_owned()),
        }
    }

    /// Blank text and empty JSON values carry no matching information.
    pub fn is_empty(&self) -> bool {
        match self {
            BodyForm::Json(value) => is_empty_body(value),
            BodyForm::Raw(text) => text.trim().is_empty(),
        }
    }

    /// The JSON value this body is keyed by. Raw text becomes a JSON string.
    pub fn as_value(&self) -> Value {
        match self {
            BodyForm::Json(value) => value.clone(),
            BodyForm::Raw(text) => Value::String(text.clone()),
        }
    }
}

/// Whether a declared body means "no body requirement".
pub fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Compact JSON serialization used in dispatch keys.
pub fn canonical_body(value: &Value) -> String {
    normalize_numbers(value).to_string()
}

/// Numbers compare by value: `1.0` becomes `1`.
fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Strict body comparison used by exact dispatch.
///
/// JSON bodies compare structurally, raw bodies compare against declared strings.
pub fn body_matches(declared: &Value, incoming: &BodyForm) -> bool {
    if is_empty_body(declared) && incoming.is_empty() {
        return true;
    }
    match incoming {
        BodyForm::Json(value) => normalize_numbers(declared) == normalize_numbers(value),
        BodyForm::Raw(text) => matches!(declared, Value::String(s) if s == text),
    }
}

/// Whitespace and quote insensitive form of a body, `None` for an empty body.
pub fn simplify_body(serialized: &str) -> Option<String> {
    let simplified: String = serialized
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .collect();

    if simplified.is_empty() || simplified == "{}" || simplified == "null" {
        None
    } else {
        Some(simplified)
    }
}

/// Simplified form of a declared body.
pub fn simplify_declared_body(value: &Value) -> Option<String> {
    if is_empty_body(value) {
        return None;
    }
    simplify_body(&canonical_body(value))
}

/// Simplified form of an incoming body.
pub fn simplify_incoming_body(body: &BodyForm) -> Option<String> {
    match body {
        BodyForm::Json(value) => simplify_declared_body(value),
        BodyForm::Raw(text) => simplify_body(text),
    }
}
