// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Agent value payloads.
//!
//! [`Value`] is a closed dynamic payload: the engine never interprets it, but
//! it must be cloneable (isolated execution works on copies), comparable (diffs
//! detect value updates), and canonically hashable (state digests).
use std::collections::BTreeMap;

use blake3::Hasher;
use thiserror::Error;

use crate::ident::hash_str;

/// Errors raised by typed accessors on [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Field access was attempted on a value that is not a map.
    #[error("value is a {found}, not a map")]
    NotAMap {
        /// Type name of the value that was accessed.
        found: &'static str,
    },
    /// The requested field does not exist.
    #[error("missing field `{0}`")]
    MissingField(String),
    /// The field exists but holds a different type.
    #[error("field `{field}` is a {found}, expected {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },
}

/// Dynamic payload carried by an agent.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// No payload.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered list.
    List(Vec<Value>),
    /// String-keyed map in key order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns the field `key` when this value is a map containing it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::get`].
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Self::Map(m) => m.get_mut(key),
            _ => None,
        }
    }

    /// Sets `key` to `value`, returning the previous entry.
    ///
    /// A `Null` value is promoted to an empty map first.
    ///
    /// # Errors
    /// [`ValueError::NotAMap`] when the value is neither a map nor `Null`.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>, ValueError> {
        if matches!(self, Self::Null) {
            *self = Self::Map(BTreeMap::new());
        }
        match self {
            Self::Map(m) => Ok(m.insert(key.into(), value)),
            other => Err(ValueError::NotAMap {
                found: other.type_name(),
            }),
        }
    }

    /// Returns the integer when this value is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean when this value is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float when this value is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text when this value is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Reads the integer field `key`, reporting why it is unavailable.
    ///
    /// # Errors
    /// [`ValueError::NotAMap`], [`ValueError::MissingField`] or
    /// [`ValueError::TypeMismatch`].
    pub fn int_field(&self, key: &str) -> Result<i64, ValueError> {
        let field = self.field(key)?;
        field.as_int().ok_or_else(|| ValueError::TypeMismatch {
            field: key.to_owned(),
            expected: "int",
            found: field.type_name(),
        })
    }

    /// Returns a mutable reference to the integer field `key`.
    ///
    /// # Errors
    /// Same as [`Value::int_field`].
    pub fn int_field_mut(&mut self, key: &str) -> Result<&mut i64, ValueError> {
        let found = self.type_name();
        let Self::Map(m) = self else {
            return Err(ValueError::NotAMap { found });
        };
        match m.get_mut(key) {
            Some(Self::Int(v)) => Ok(v),
            Some(other) => Err(ValueError::TypeMismatch {
                field: key.to_owned(),
                expected: "int",
                found: other.type_name(),
            }),
            None => Err(ValueError::MissingField(key.to_owned())),
        }
    }

    fn field(&self, key: &str) -> Result<&Value, ValueError> {
        match self {
            Self::Map(m) => m
                .get(key)
                .ok_or_else(|| ValueError::MissingField(key.to_owned())),
            other => Err(ValueError::NotAMap {
                found: other.type_name(),
            }),
        }
    }

    /// Feeds the canonical encoding of this value into `hasher`.
    ///
    /// Encoding: one tag byte, then the payload. Integers are 8-byte LE,
    /// floats are their canonical bit pattern (`-0.0` folds to `0.0`, every
    /// NaN folds to the quiet NaN), strings and collections are prefixed with
    /// an 8-byte LE length. Maps are written in key order.
    pub(crate) fn write_digest(&self, hasher: &mut Hasher) {
        match self {
            Self::Null => {
                hasher.update(&[0]);
            }
            Self::Bool(b) => {
                hasher.update(&[1, u8::from(*b)]);
            }
            Self::Int(v) => {
                hasher.update(&[2]);
                hasher.update(&v.to_le_bytes());
            }
            Self::Float(v) => {
                hasher.update(&[3]);
                hasher.update(&canonical_f64_bits(*v).to_le_bytes());
            }
            Self::Text(s) => {
                hasher.update(&[4]);
                hash_str(hasher, s);
            }
            Self::List(items) => {
                hasher.update(&[5]);
                hasher.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.write_digest(hasher);
                }
            }
            Self::Map(m) => {
                hasher.update(&[6]);
                hasher.update(&(m.len() as u64).to_le_bytes());
                for (k, v) in m {
                    hash_str(hasher, k);
                    v.write_digest(hasher);
                }
            }
        }
    }
}

fn canonical_f64_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v.to_bits() << 1 == 0 {
        // +0.0 and -0.0
        0
    } else {
        v.to_bits()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(v: &Value) -> [u8; 32] {
        let mut h = Hasher::new();
        v.write_digest(&mut h);
        h.finalize().into()
    }

    #[test]
    fn int_field_reports_missing_and_mismatched_fields() {
        let v = Value::map([("count", Value::Int(3)), ("label", Value::from("x"))]);
        assert_eq!(v.int_field("count"), Ok(3));
        assert_eq!(
            v.int_field("amount"),
            Err(ValueError::MissingField("amount".into()))
        );
        assert!(matches!(
            v.int_field("label"),
            Err(ValueError::TypeMismatch { expected: "int", found: "text", .. })
        ));
        assert!(matches!(
            Value::Int(1).int_field("count"),
            Err(ValueError::NotAMap { found: "int" })
        ));
    }

    #[test]
    fn int_field_mut_updates_in_place() {
        let mut v = Value::map([("count", Value::Int(1))]);
        *v.int_field_mut("count").unwrap() += 4;
        assert_eq!(v.get("count"), Some(&Value::Int(5)));
    }

    #[test]
    fn set_promotes_null_to_map() {
        let mut v = Value::Null;
        assert_eq!(v.set("a", Value::Int(1)), Ok(None));
        assert_eq!(v.set("a", Value::Int(2)), Ok(Some(Value::Int(1))));
        let mut scalar = Value::Int(0);
        assert!(scalar.set("a", Value::Null).is_err());
    }

    #[test]
    fn digest_folds_float_zero_and_nan() {
        assert_eq!(digest(&Value::Float(0.0)), digest(&Value::Float(-0.0)));
        assert_eq!(
            digest(&Value::Float(f64::NAN)),
            digest(&Value::Float(-f64::NAN))
        );
        assert_ne!(digest(&Value::Int(0)), digest(&Value::Float(0.0)));
    }

    #[test]
    fn digest_distinguishes_nesting() {
        let flat = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let nested = Value::List(vec![Value::List(vec![Value::Int(1)]), Value::Int(2)]);
        assert_ne!(digest(&flat), digest(&nested));
    }
}
