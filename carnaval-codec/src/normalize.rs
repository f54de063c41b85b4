//! Decode-time coercion of primitive values to their declared kind.

use carnaval_model::Kind;
use carnaval_types::Value;
use chrono::SecondsFormat;

/// Coerces `value` towards `kind`.
///
/// Values that cannot be coerced are returned unchanged; null stays null.
///
/// | kind    | coercion                                                        |
/// |---------|-----------------------------------------------------------------|
/// | boolean | truthiness                                                      |
/// | string  | numbers, booleans and dates stringified; composites unchanged   |
/// | number  | booleans to 0/1, numeric strings parsed (`""` is 0), dates to ms |
/// | date    | RFC 3339 strings parsed, integer numbers read as epoch millis   |
/// | object  | unchanged                                                       |
pub fn normalize(kind: Kind, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match kind {
        Kind::Boolean => Value::Bool(value.is_truthy()),
        Kind::String => to_string(value),
        Kind::Number => to_number(value),
        Kind::Date => to_date(value),
        Kind::Object => value.clone(),
    }
}

fn to_string(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        other => other.clone(),
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::from(i64::from(*b)),
        Value::Date(d) => Value::from(d.timestamp_millis()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Value::from(0);
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return Value::from(int);
            }
            match trimmed.parse::<f64>() {
                Ok(float) if float.is_finite() => Value::from_f64(float),
                _ => value.clone(),
            }
        }
        other => other.clone(),
    }
}

fn to_date(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::parse_date(s).map_or_else(|_| value.clone(), Value::Date),
        Value::Number(_) => match value.as_i64() {
            Some(millis) => match Value::from_millis(millis) {
                Value::Null => value.clone(),
                date => date,
            },
            None => value.clone(),
        },
        other => other.clone(),
    }
}
