//! Decoded response values.

use serde::Serialize;

/// The typed result of decoding a response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Complex { re: f64, im: f64 },
    Text(String),
    List(Vec<Value>),
    Table(Vec<Vec<Value>>),
}

impl Value {
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&[Vec<Self>]> {
        match self {
            Self::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Best-effort scalar classification (`numberOrString`).
///
/// Tries the complex pattern `(re,im)` first, then a plain float;
/// anything else comes back unchanged as text. Ambiguous input never
/// errors, and re-classifying a returned text yields the same text.
#[must_use]
pub fn classify(text: &str) -> Value {
    let trimmed = text.trim();
    if let Some(value) = parse_complex(trimmed) {
        return value;
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        return Value::Number(number);
    }
    Value::Text(text.to_owned())
}

fn parse_complex(text: &str) -> Option<Value> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    let re = re.trim().parse::<f64>().ok()?;
    let im = im.trim().parse::<f64>().ok()?;
    Some(Value::Complex { re, im })
}
