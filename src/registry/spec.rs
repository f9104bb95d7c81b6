// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Annotator manifests: declared inputs, outputs and parameter schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A concrete parameter value.
///
/// Deserializes untagged so YAML/TOML scalars map directly onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Parse a command-line style value: `true`/`false`, integers, floats,
    /// anything else is a string.
    pub fn parse_loose(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            return ParamValue::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return ParamValue::Float(f);
        }
        ParamValue::Str(raw.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ParamType {
    /// Coerce a value into this type. Integers widen to floats; nothing else
    /// converts implicitly.
    pub fn coerce(&self, value: &ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (ParamType::String, ParamValue::Str(_))
            | (ParamType::Integer, ParamValue::Int(_))
            | (ParamType::Float, ParamValue::Float(_))
            | (ParamType::Boolean, ParamValue::Bool(_)) => Some(value.clone()),
            (ParamType::Float, ParamValue::Int(i)) => Some(ParamValue::Float(*i as f64)),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Schema entry for one annotator parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<ParamValue>,
}

impl ParamSpec {
    pub fn new(kind: ParamType) -> Self {
        Self {
            kind,
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(default: &str) -> Self {
        Self::new(ParamType::String).with_default(default)
    }

    pub fn integer(default: i64) -> Self {
        Self::new(ParamType::Integer).with_default(default)
    }

    pub fn float(default: f64) -> Self {
        Self::new(ParamType::Float).with_default(default)
    }

    pub fn boolean(default: bool) -> Self {
        Self::new(ParamType::Boolean).with_default(default)
    }

    /// A parameter with no default; every run must supply a value.
    pub fn required(kind: ParamType) -> Self {
        Self::new(kind)
    }

    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Validate a value against this schema entry, returning the coerced value.
    pub fn check(&self, value: &ParamValue) -> Result<ParamValue, String> {
        let coerced = self
            .kind
            .coerce(value)
            .ok_or_else(|| format!("expected {} but got '{}'", self.kind, value))?;

        if !self.allowed.is_empty() && !self.allowed.contains(&coerced) {
            let allowed: Vec<String> = self.allowed.iter().map(|v| v.to_string()).collect();
            return Err(format!(
                "value '{}' is not one of [{}]",
                coerced,
                allowed.join(", ")
            ));
        }

        Ok(coerced)
    }
}

/// A declared input requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRef {
    /// A named annotation layer, produced by another annotator or present on
    /// the loaded documents.
    Annotation(String),
    /// A raw file, relative to the corpus root.
    File(String),
}

impl InputRef {
    /// Name under which the input participates in cache keys and is handed to
    /// the annotator.
    pub fn key(&self) -> String {
        match self {
            InputRef::Annotation(name) => name.clone(),
            InputRef::File(path) => format!("file:{}", path),
        }
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Registration manifest of an annotator.
///
/// ```
/// use annograph::registry::{AnnotatorSpec, ParamSpec};
///
/// let spec = AnnotatorSpec::new("postag", "1")
///     .input("tokens")
///     .output("pos")
///     .param("model", ParamSpec::string("suffix").allowed(["suffix", "lexicon"]));
///
/// assert_eq!(spec.outputs, vec!["pos".to_string()]);
/// assert!(spec.params.contains_key("model"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorSpec {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<InputRef>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

impl AnnotatorSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input(mut self, annotation: impl Into<String>) -> Self {
        self.inputs.push(InputRef::Annotation(annotation.into()));
        self
    }

    pub fn file_input(mut self, path: impl Into<String>) -> Self {
        self.inputs.push(InputRef::File(path.into()));
        self
    }

    pub fn output(mut self, annotation: impl Into<String>) -> Self {
        self.outputs.push(annotation.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    /// Annotation inputs only, in declaration order.
    pub fn annotation_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().filter_map(|input| match input {
            InputRef::Annotation(name) => Some(name.as_str()),
            InputRef::File(_) => None,
        })
    }

    pub fn file_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().filter_map(|input| match input {
            InputRef::File(path) => Some(path.as_str()),
            InputRef::Annotation(_) => None,
        })
    }

    pub fn produces(&self, output: &str) -> bool {
        self.outputs.iter().any(|o| o == output)
    }
}
