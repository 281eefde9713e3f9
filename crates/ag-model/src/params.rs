use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A value forwarded to [`Arm::generate_step`](crate::Arm::generate_step)
/// as a named keyword argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<f64>),
    Text(String),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::List(_) => "list",
            ParamValue::Text(_) => "text",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::List(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// Named per-run parameters, e.g. a sampling `temperature`. Iteration is
/// sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Reads `key` as a number.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(ParamValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "number", other)),
        }
    }

    /// Reads `key` as a list of numbers; a single number becomes a
    /// one-element list.
    pub fn get_f32s(&self, key: &str) -> Result<Option<Vec<f32>>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(vec![*v as f32])),
            Some(ParamValue::Float(v)) => Ok(Some(vec![*v as f32])),
            Some(ParamValue::List(v)) => Ok(Some(v.iter().map(|&x| x as f32).collect())),
            Some(other) => Err(type_error(key, "number or list", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "bool", other)),
        }
    }
}

fn type_error(key: &str, expected: &str, got: &ParamValue) -> ModelError {
    ModelError::ParameterType {
        key: key.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}
