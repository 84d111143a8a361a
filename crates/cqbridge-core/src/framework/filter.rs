//! Event filter expressions.
//!
//! A filter is a JSON document evaluated against every event before it is
//! dispatched. Keys starting with `.` are operators, every other key selects
//! a field of the event:
//!
//! ```json
//! {
//!     ".or": [
//!         { "group_id": { ".in": [10001, 10002] } },
//!         { "message_type": "private" }
//!     ],
//!     "raw_message": { ".regex": "^/" }
//! }
//! ```
//!
//! | Operator | Operand | Passes when |
//! |----------|---------|-------------|
//! | `.and` | array or object | every sub-expression passes |
//! | `.or` | array or object | any sub-expression passes |
//! | `.not` | object | the sub-expression fails |
//! | `.eq` / `.neq` | any | the value is (not) equal to the operand |
//! | `.in` | array or string | the value is an element / substring of the operand |
//! | `.contains` | string | the value contains the operand |
//! | `.regex` | string | the value matches the pattern |
//!
//! A plain (non-object) operand is shorthand for `.eq`, and an object with
//! several keys is a conjunction. Equality is loose: `"10001"` equals `10001`.

use regex::Regex;
use serde_json::{Map, Value};

use crate::foundation::error::{FilterError, FilterResult};
use crate::foundation::msg::Msg;

/// A predicate deciding whether an event is dispatched.
pub trait EventFilter: Send + Sync {
    /// Returns `true` if the event should be delivered.
    fn eval(&self, event: &Msg) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Msg) -> bool + Send + Sync,
{
    fn eval(&self, event: &Msg) -> bool {
        self(event)
    }
}

/// A compiled filter expression.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    /// Every sub-expression must pass.
    And(Vec<FilterExpr>),
    /// At least one sub-expression must pass.
    Or(Vec<FilterExpr>),
    /// The sub-expression must fail.
    Not(Box<FilterExpr>),
    /// Applies the operand to the named field of the current value.
    Field {
        /// Field name.
        key: String,
        /// Expression evaluated against the field value.
        operand: Box<FilterExpr>,
    },
    /// Loose equality.
    Eq(Value),
    /// Loose inequality.
    Neq(Value),
    /// Membership in an array, or substring of a string.
    In(Value),
    /// The value, as text, contains the operand.
    Contains(String),
    /// The value, as text, matches the pattern.
    Regex(Regex),
}

impl FilterExpr {
    /// Parses a filter from JSON text.
    pub fn parse(text: &str) -> FilterResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FilterError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Compiles a filter from a JSON value. The root must be an object.
    pub fn from_value(value: &Value) -> FilterResult<Self> {
        match value {
            Value::Object(map) => compile_object(map),
            _ => Err(FilterError::operand("<root>", "an object")),
        }
    }

    /// Evaluates the expression against an arbitrary JSON value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::And(exprs) => exprs.iter().all(|e| e.matches(value)),
            Self::Or(exprs) => exprs.iter().any(|e| e.matches(value)),
            Self::Not(expr) => !expr.matches(value),
            Self::Field { key, operand } => operand.matches(value.get(key).unwrap_or(&Value::Null)),
            Self::Eq(expected) => loose_eq(value, expected),
            Self::Neq(expected) => !loose_eq(value, expected),
            Self::In(Value::Array(items)) => items.iter().any(|item| loose_eq(value, item)),
            Self::In(Value::String(haystack)) => haystack.contains(as_text(value).as_str()),
            Self::In(_) => false,
            Self::Contains(needle) => as_text(value).contains(needle.as_str()),
            Self::Regex(re) => re.is_match(&as_text(value)),
        }
    }
}

impl EventFilter for FilterExpr {
    fn eval(&self, event: &Msg) -> bool {
        let value = Value::Object((**event).clone());
        self.matches(&value)
    }
}

fn compile_object(map: &Map<String, Value>) -> FilterResult<FilterExpr> {
    let mut exprs = map
        .iter()
        .map(|(key, value)| compile_entry(key, value))
        .collect::<FilterResult<Vec<_>>>()?;
    if exprs.len() == 1 {
        Ok(exprs.remove(0))
    } else {
        Ok(FilterExpr::And(exprs))
    }
}

fn compile_operand(value: &Value) -> FilterResult<FilterExpr> {
    match value {
        Value::Object(map) => compile_object(map),
        other => Ok(FilterExpr::Eq(other.clone())),
    }
}

fn compile_list(operator: &str, value: &Value) -> FilterResult<Vec<FilterExpr>> {
    match value {
        Value::Array(items) => items.iter().map(compile_operand).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| compile_entry(key, value))
            .collect(),
        _ => Err(FilterError::operand(operator, "an array or object")),
    }
}

fn compile_entry(key: &str, value: &Value) -> FilterResult<FilterExpr> {
    match key {
        ".and" => Ok(FilterExpr::And(compile_list(key, value)?)),
        ".or" => Ok(FilterExpr::Or(compile_list(key, value)?)),
        ".not" => match value {
            Value::Object(map) => Ok(FilterExpr::Not(Box::new(compile_object(map)?))),
            _ => Err(FilterError::operand(key, "an object")),
        },
        ".eq" => Ok(FilterExpr::Eq(value.clone())),
        ".neq" => Ok(FilterExpr::Neq(value.clone())),
        ".in" => match value {
            Value::Array(_) | Value::String(_) => Ok(FilterExpr::In(value.clone())),
            _ => Err(FilterError::operand(key, "an array or string")),
        },
        ".contains" => match value {
            Value::String(needle) => Ok(FilterExpr::Contains(needle.clone())),
            _ => Err(FilterError::operand(key, "a string")),
        },
        ".regex" => match value {
            Value::String(pattern) => Regex::new(pattern)
                .map(FilterExpr::Regex)
                .map_err(|e| FilterError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }),
            _ => Err(FilterError::operand(key, "a string")),
        },
        op if op.starts_with('.') => Err(FilterError::UnknownOperator(op.to_string())),
        field => Ok(FilterExpr::Field {
            key: field.to_string(),
            operand: Box::new(compile_operand(value)?),
        }),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn loose_eq(value: &Value, expected: &Value) -> bool {
    value == expected || as_text(value) == as_text(expected)
}
