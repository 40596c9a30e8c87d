//! Keyword arguments forwarded to shape functions.
//!
//! A `Params` is an opaque key-to-value mapping. The synthesizer never looks
//! inside one except to merge the per-cluster set with the shared set; it is
//! up to the shape function to read the keys it cares about.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// A single keyword argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A real number.
    Float(f64),
    /// Free-form text.
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value. Integers are widened, everything else is `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// An ordered mapping from argument names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// An empty set of arguments.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds an argument, replacing any previous value under the same key.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an argument and returns the value it replaced, if any.
    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the arguments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reads a numeric argument, falling back to `default` when it is absent.
    ///
    /// # Errors
    ///
    /// * If the argument is present but not numeric.
    pub fn f64_or(&self, key: &str, default: f64) -> core::result::Result<f64, String> {
        self.get(key).map_or(Ok(default), |v| {
            v.as_f64()
                .ok_or_else(|| format!("argument `{key}` must be numeric, got {v:?}"))
        })
    }

    /// Merges a per-cluster argument set with the shared one.
    ///
    /// `precedence` decides who wins when both sets hold the same key.
    ///
    /// # Errors
    ///
    /// * Under `Precedence::Strict`, if a key appears in both sets.
    pub fn merge(cluster_args: &Self, shared: &Self, precedence: Precedence, cluster: usize) -> Result<Self> {
        let (base, overlay) = match precedence {
            Precedence::Shared => (cluster_args, shared),
            Precedence::Cluster => (shared, cluster_args),
            Precedence::Strict => {
                if let Some(key) = shared.0.keys().find(|k| cluster_args.0.contains_key(*k)) {
                    return Err(SynthError::invalid(format!(
                        "argument `{key}` given both for cluster {cluster} and as a shared argument"
                    )));
                }
                (cluster_args, shared)
            }
        };

        let mut merged = base.clone();
        merged.0.extend(overlay.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(merged)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Who wins when a per-cluster argument and a shared argument share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precedence {
    /// Shared arguments override per-cluster ones.
    #[default]
    Shared,
    /// Per-cluster arguments override shared ones.
    Cluster,
    /// A key present in both sets is an error.
    Strict,
}
