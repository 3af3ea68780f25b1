// Unit normalization of raw fact text
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const MILLION: f64 = 1_000_000.0;

/// Amount expressed in millions of the reporting currency.
pub type Millions = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Millions,
    Integer,
    Float,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Millions(Millions),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FactValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FactValue::Millions(v) | FactValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FactValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactValue::Millions(v) => write!(f, "{} M", v),
            FactValue::Integer(v) => write!(f, "{}", v),
            FactValue::Float(v) => write!(f, "{}", v),
            FactValue::Text(s) => f.write_str(s),
        }
    }
}

pub fn normalize(raw: Option<&str>, kind: ValueKind) -> Option<FactValue> {
    let raw = raw?;
    match kind {
        ValueKind::Millions => to_millions(raw).map(FactValue::Millions),
        ValueKind::Integer => to_integer(raw).map(FactValue::Integer),
        ValueKind::Float => to_float(raw).map(FactValue::Float),
        ValueKind::Raw => to_raw(raw).map(FactValue::Text),
    }
}

fn numeric_text(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != ',').collect()
}

/// Currency amount → millions, rounded half away from zero.
pub fn to_millions(raw: &str) -> Option<Millions> {
    let value: f64 = numeric_text(raw).parse().ok()?;
    value.is_finite().then(|| (value / MILLION).round() as Millions)
}

/// Counts; decimal text is truncated toward zero.
pub fn to_integer(raw: &str) -> Option<i64> {
    let text = numeric_text(raw);
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = text.parse().ok()?;
    value.is_finite().then(|| value.trunc() as i64)
}

pub fn to_float(raw: &str) -> Option<f64> {
    let value: f64 = numeric_text(raw).parse().ok()?;
    value.is_finite().then_some(value)
}

pub fn to_raw(raw: &str) -> Option<String> {
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Header helpers

pub fn securities_code(raw: &str) -> Option<String> {
    let code: String = raw.trim().chars().take(4).collect();
    (!code.is_empty()).then_some(code)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn year_of(raw: &str) -> Option<i32> {
    parse_date(raw).map(|d| d.year())
}

pub fn month_of(raw: &str) -> Option<u32> {
    parse_date(raw).map(|d| d.month())
}
