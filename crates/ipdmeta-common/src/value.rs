//! Loosely typed cell value shared by the extractor output and the human annotation table.

use std::fmt;

/// A single feature value as read from a spreadsheet, CSV or model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    /// Interpret a raw text cell: blank → `Missing`, numeric → `Number`, otherwise `Text`.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    /// Missing means null, NaN, or a string that is empty after trimming.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(n) => n.is_nan(),
            Value::Text(t) => t.trim().is_empty(),
        }
    }

    /// Numeric view of the value. Numeric text is parsed; NaN is treated as absent.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Text(t) => t.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }

    /// Binary view: only exact 0 or 1 qualify.
    pub fn as_binary(&self) -> Option<bool> {
        match self.as_number() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        }
    }

    /// Truthiness used when filtering categorical pairs: missing, zero and blank are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Missing => false,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::Text(t) => !t.trim().is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(t) => f.write_str(t),
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::Number).unwrap_or(Value::Missing)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map(Value::Text).unwrap_or(Value::Missing)
    }
}
