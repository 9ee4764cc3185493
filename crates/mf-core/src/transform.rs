//! Transformation data model.
//!
//! A request URL is parsed once into an [`AssetReference`] and an ordered
//! [`TransformationChain`] of [`TransformationSpec`]s. Nothing here is mutated
//! after parse time; executors only read it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Parameter values
// ---------------------------------------------------------------------------

/// A coerced parameter value: numeric when the raw text parsed as a number,
/// otherwise the raw text unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(_) => None,
        }
    }

    /// The text value, if this is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Parameters of one transformation, keyed by parameter name.
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.0.insert(key.into(), value);
    }

    /// Return a copy with `key` set to `value` unless `key` is already present.
    pub fn with_default(&self, key: &str, value: ParamValue) -> Self {
        let mut params = self.clone();
        params.0.entry(key.to_string()).or_insert(value);
        params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
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

    /// Numeric value of `key`, or `None` when absent or not a number.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_number)
    }

    /// String value of `key`, or `None` when absent or numeric.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_text)
    }

    /// Numeric value of `key`, failing the operation `op` when it is missing
    /// or not a number.
    pub fn require_number(&self, op: &str, key: &str) -> Result<f64> {
        match self.get(key) {
            Some(ParamValue::Number(n)) if n.is_finite() => Ok(*n),
            Some(other) => Err(Error::operation(
                op,
                format!("parameter '{key}' must be numeric, got '{other}'"),
            )),
            None => Err(Error::operation(
                op,
                format!("missing required parameter '{key}'"),
            )),
        }
    }

    /// Optional pixel dimension: a positive number rounded to the nearest pixel.
    pub fn dimension(&self, op: &str, key: &str) -> Result<Option<u32>> {
        if !self.contains(key) {
            return Ok(None);
        }
        let value = self.require_number(op, key)?;
        let rounded = value.round();
        if rounded < 1.0 || rounded > f64::from(u32::MAX) {
            return Err(Error::operation(
                op,
                format!("parameter '{key}' must be a positive pixel size, got {value}"),
            ));
        }
        Ok(Some(rounded as u32))
    }

    /// Required pixel dimension.
    pub fn require_dimension(&self, op: &str, key: &str) -> Result<u32> {
        self.dimension(op, key)?.ok_or_else(|| {
            Error::operation(op, format!("missing required parameter '{key}'"))
        })
    }

    /// Required non-negative pixel offset.
    pub fn require_offset(&self, op: &str, key: &str) -> Result<u32> {
        let value = self.require_number(op, key)?;
        let rounded = value.round();
        if rounded < 0.0 || rounded > f64::from(u32::MAX) {
            return Err(Error::operation(
                op,
                format!("parameter '{key}' must be a non-negative offset, got {value}"),
            ));
        }
        Ok(rounded as u32)
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// TransformationSpec
// ---------------------------------------------------------------------------

/// One transformation directive: a type tag plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationSpec {
    #[serde(rename = "type")]
    kind: String,
    params: Params,
}

impl TransformationSpec {
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// The type tag (e.g. `c_fill`, `q_auto`, `so_5`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Split a directive-style tag such as `so_5` into `("so", "5")`.
    ///
    /// Returns `None` when the tag carries no `_` separator.
    pub fn directive(&self) -> Option<(&str, &str)> {
        self.kind.split_once('_')
    }
}

impl fmt::Display for TransformationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        for (key, value) in self.params.iter() {
            write!(f, ",{key}_{value}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TransformationChain
// ---------------------------------------------------------------------------

/// Ordered list of transformations; order is the application order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformationChain(Vec<TransformationSpec>);

impl TransformationChain {
    pub fn new(specs: Vec<TransformationSpec>) -> Self {
        Self(specs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransformationSpec> {
        self.0.iter()
    }

    pub fn specs(&self) -> &[TransformationSpec] {
        &self.0
    }
}

impl From<Vec<TransformationSpec>> for TransformationChain {
    fn from(specs: Vec<TransformationSpec>) -> Self {
        Self(specs)
    }
}

impl<'a> IntoIterator for &'a TransformationChain {
    type Item = &'a TransformationSpec;
    type IntoIter = std::slice::Iter<'a, TransformationSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// AssetReference
// ---------------------------------------------------------------------------

/// Identifier of a stored source asset, resolved externally to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    public_id: String,
}

impl AssetReference {
    pub fn new(public_id: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
        }
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// Lower-cased file extension of the public id, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.public_id.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.public_id)
    }
}
