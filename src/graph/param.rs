//! Dynamically-typed node parameter values.
//!
//! Hosts set parameters by name with a [`ParamValue`]; each node type checks
//! the value's shape and range and reports a [`ParamError`] that the graph
//! turns into a `GraphError` carrying the node id.

use crate::types::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A parameter value as supplied by a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Point(Point2),
    /// Enumerated mode or selector name, e.g. `"multiply"` or `"front"`
    Mode(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Real value; integers are widened.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            ParamValue::Real(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point2> {
        match self {
            ParamValue::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<&str> {
        match self {
            ParamValue::Mode(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Real(_) => "real",
            ParamValue::Point(_) => "point",
            ParamValue::Mode(_) => "mode",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Real(v) => write!(f, "{}", v),
            ParamValue::Point(p) => write!(f, "({}, {})", p.x, p.y),
            ParamValue::Mode(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<Point2> for ParamValue {
    fn from(p: Point2) -> Self {
        ParamValue::Point(p)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Mode(s.to_string())
    }
}

/// A named parameter and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub key: &'static str,
    pub value: ParamValue,
}

impl Param {
    pub fn new(key: &'static str, value: impl Into<ParamValue>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Parameter errors reported by a node, before the graph attaches its id.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

impl ParamError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ParamError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    fn wrong_type(key: &str, expected: &str, value: &ParamValue) -> Self {
        Self::invalid(
            key,
            format!("expected {}, got {} {}", expected, value.type_name(), value),
        )
    }
}

pub fn expect_bool(key: &str, value: &ParamValue) -> Result<bool, ParamError> {
    value
        .as_bool()
        .ok_or_else(|| ParamError::wrong_type(key, "bool", value))
}

pub fn expect_int(key: &str, value: &ParamValue) -> Result<i64, ParamError> {
    value
        .as_int()
        .ok_or_else(|| ParamError::wrong_type(key, "int", value))
}

/// A finite real value.
pub fn expect_real(key: &str, value: &ParamValue) -> Result<f64, ParamError> {
    let v = value
        .as_real()
        .ok_or_else(|| ParamError::wrong_type(key, "real", value))?;
    if !v.is_finite() {
        return Err(ParamError::invalid(key, "must be finite"));
    }
    Ok(v)
}

pub fn expect_point(key: &str, value: &ParamValue) -> Result<Point2, ParamError> {
    let p = value
        .as_point()
        .ok_or_else(|| ParamError::wrong_type(key, "point", value))?;
    if !p.x.is_finite() || !p.y.is_finite() {
        return Err(ParamError::invalid(key, "coordinates must be finite"));
    }
    Ok(p)
}

/// Parse a mode name with the mode's `FromStr`.
pub fn expect_mode<M>(key: &str, value: &ParamValue) -> Result<M, ParamError>
where
    M: std::str::FromStr<Err = String>,
{
    let name = value
        .as_mode()
        .ok_or_else(|| ParamError::wrong_type(key, "mode name", value))?;
    name.parse::<M>().map_err(|reason| ParamError::invalid(key, reason))
}
