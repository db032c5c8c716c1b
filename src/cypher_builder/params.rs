//! Parameter table for one compilation.
//!
//! Every literal that reaches the compiled query goes through [`ParameterTable::bind`],
//! which hands back a unique `$name`. Values are normalized against the schema
//! kind of the field they are compared with.

use lazy_static::lazy_static;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use std::collections::HashSet;

use super::errors::CypherBuilderError;
use super::temporal::TemporalValue;
use crate::graph_catalog::{ScalarKind, SpatialKind};

/// Largest integer an IEEE-754 double represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

pub fn is_safe_integer(value: i64) -> bool {
    (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value)
}

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Geographic {
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
    },
    Cartesian {
        x: f64,
        y: f64,
        z: Option<f64>,
    },
}

impl PointValue {
    fn from_literal(kind: SpatialKind, value: &Value) -> Result<Self, CypherBuilderError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CypherBuilderError::InvalidPoint(value.to_string()))?;
        let coord = |key: &str| -> Result<f64, CypherBuilderError> {
            obj.get(key).and_then(Value::as_f64).ok_or_else(|| {
                CypherBuilderError::InvalidPoint(format!("missing numeric `{}` in {}", key, value))
            })
        };
        let optional = |key: &str| obj.get(key).and_then(Value::as_f64);
        Ok(match kind {
            SpatialKind::Point => PointValue::Geographic {
                longitude: coord("longitude")?,
                latitude: coord("latitude")?,
                height: optional("height"),
            },
            SpatialKind::CartesianPoint => PointValue::Cartesian {
                x: coord("x")?,
                y: coord("y")?,
                z: optional("z"),
            },
        })
    }
}

impl Serialize for PointValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            PointValue::Geographic {
                longitude,
                latitude,
                height,
            } => {
                map.serialize_entry("longitude", longitude)?;
                map.serialize_entry("latitude", latitude)?;
                if let Some(height) = height {
                    map.serialize_entry("height", height)?;
                }
            }
            PointValue::Cartesian { x, y, z } => {
                map.serialize_entry("x", x)?;
                map.serialize_entry("y", y)?;
                if let Some(z) = z {
                    map.serialize_entry("z", z)?;
                }
            }
        }
        map.end()
    }
}

/// A typed value bound to a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Exact 64-bit integer of the `BigInt` kind
    BigInt(i64),
    Float(f64),
    String(String),
    Temporal(TemporalValue),
    Point(PointValue),
    List(Vec<ParamValue>),
    Map(Vec<(String, ParamValue)>),
}

impl ParamValue {
    /// Normalize a literal against the scalar kind of the field it targets.
    /// Arrays convert element-wise.
    pub fn from_literal(kind: ScalarKind, value: &Value) -> Result<Self, CypherBuilderError> {
        if let Value::Array(items) = value {
            return items
                .iter()
                .map(|item| ParamValue::from_literal(kind, item))
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::List);
        }
        if value.is_null() {
            return Ok(ParamValue::Null);
        }
        let converted = match kind {
            ScalarKind::String => ParamValue::String(
                value
                    .as_str()
                    .ok_or_else(|| CypherBuilderError::invalid_literal("String", value))?
                    .to_string(),
            ),
            ScalarKind::Id => match value {
                Value::String(s) => ParamValue::String(s.clone()),
                Value::Number(n) => ParamValue::String(n.to_string()),
                other => return Err(CypherBuilderError::invalid_literal("ID", other)),
            },
            ScalarKind::Int => {
                let i = value
                    .as_i64()
                    .ok_or_else(|| CypherBuilderError::invalid_literal("Int", value))?;
                if i32::try_from(i).is_err() {
                    return Err(CypherBuilderError::IntOutOfRange(i));
                }
                ParamValue::Integer(i)
            }
            ScalarKind::BigInt => ParamValue::BigInt(parse_big_int(value)?),
            ScalarKind::Float => ParamValue::Float(
                value
                    .as_f64()
                    .ok_or_else(|| CypherBuilderError::invalid_literal("Float", value))?,
            ),
            ScalarKind::Boolean => ParamValue::Boolean(
                value
                    .as_bool()
                    .ok_or_else(|| CypherBuilderError::invalid_literal("Boolean", value))?,
            ),
            ScalarKind::Temporal(temporal) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| CypherBuilderError::invalid_literal(kind.type_name(), value))?;
                ParamValue::Temporal(TemporalValue::parse(temporal, text)?)
            }
            ScalarKind::Spatial(spatial) => {
                ParamValue::Point(PointValue::from_literal(spatial, value)?)
            }
        };
        Ok(converted)
    }

    /// Untyped conversion used for claims, where no schema kind applies
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ParamValue::String(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(ParamValue::from_json).collect()),
            Value::Object(obj) => ParamValue::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Cypher constructor a parameter of `kind` must be wrapped in before it is
/// compared with, or stored as, a property. `BigInt` parameters outside the
/// safe range travel as decimal strings, so they are read back through
/// `toInteger`.
pub fn constructor_for(kind: ScalarKind) -> Option<&'static str> {
    match kind {
        ScalarKind::Temporal(temporal) => Some(super::temporal::cypher_constructor(temporal)),
        ScalarKind::Spatial(_) => Some("point"),
        ScalarKind::BigInt => Some("toInteger"),
        _ => None,
    }
}

/// Accepts JSON integers and decimal strings; rejects anything that does not fit i64.
fn parse_big_int(value: &Value) -> Result<i64, CypherBuilderError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| CypherBuilderError::BigIntOutOfRange(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CypherBuilderError::BigIntOutOfRange(s.clone())),
        other => Err(CypherBuilderError::invalid_literal("BigInt", other)),
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null => serializer.serialize_unit(),
            ParamValue::Boolean(b) => serializer.serialize_bool(*b),
            ParamValue::Integer(i) => serializer.serialize_i64(*i),
            ParamValue::BigInt(i) if is_safe_integer(*i) => serializer.serialize_i64(*i),
            ParamValue::BigInt(i) => serializer.serialize_str(&i.to_string()),
            ParamValue::Float(f) => serializer.serialize_f64(*f),
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Temporal(t) => t.serialize(serializer),
            ParamValue::Point(p) => p.serialize(serializer),
            ParamValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParamValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Collision-free allocator of parameter names, in binding order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    entries: Vec<(String, ParamValue)>,
    names: HashSet<String>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under a name derived from `hint` and return that name.
    ///
    /// The same value bound twice gets two names; a taken name is suffixed
    /// `_1`, `_2`, ... until free.
    pub fn bind(&mut self, hint: &str, value: ParamValue) -> String {
        let base = sanitize_parameter_name(hint);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.names.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.names.insert(name.clone());
        self.entries.push((name.clone(), value));
        name
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Caller-visible encoding of the table
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ParameterTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Coerce an arbitrary hint into `[A-Za-z_][A-Za-z0-9_]*`
pub fn sanitize_parameter_name(hint: &str) -> String {
    let cleaned = INVALID_NAME_CHARS.replace_all(hint, "_");
    match cleaned.chars().next() {
        None => "param".to_string(),
        Some(c) if c.is_ascii_digit() => format!("p_{}", cleaned),
        Some(_) => cleaned.into_owned(),
    }
}
