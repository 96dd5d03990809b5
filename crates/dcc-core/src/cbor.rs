//! # Restricted CBOR Value Model
//!
//! A closed set of CBOR value variants covering the profile used by health
//! certificates: integers, byte strings, text strings, arrays, maps and tags.
//! JSON-derived claims may additionally carry booleans, null and floats.
//!
//! Wire encoding and decoding are delegated to `ciborium`; this module
//! converts between its open-ended `Value` and [`CborValue`], rejecting
//! anything outside the profile. Extraction points match on the variants
//! exhaustively, so a "wrong type for key X" failure is a pattern that did
//! not match, never a runtime cast.
//!
//! ## Map Ordering
//!
//! Maps are ordered key/value vectors. Encoding writes entries in insertion
//! order, so builders control the byte layout exactly.

use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use ciborium::value::{Integer, Value};
use serde_json::Value as JsonValue;

use crate::error::MalformedError;

/// A value in the restricted CBOR profile.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    /// Major types 0 and 1, range `-2^64 ..= 2^64 - 1`.
    Integer(i128),
    /// Major type 2.
    Bytes(Vec<u8>),
    /// Major type 3.
    Text(String),
    /// Major type 4.
    Array(Vec<CborValue>),
    /// Major type 5, in encounter order.
    Map(Vec<(CborValue, CborValue)>),
    /// Major type 6: a semantic tag wrapping one value.
    Tag(u64, Box<CborValue>),
    /// Simple values `true` / `false`.
    Bool(bool),
    /// Simple value `null`.
    Null,
    /// Major type 7 floating point.
    Float(f64),
}

impl CborValue {
    /// Decode one CBOR item from bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MalformedError> {
        let value: Value =
            ciborium::de::from_reader(bytes).map_err(|e| MalformedError::Cbor(e.to_string()))?;
        Self::try_from(value)
    }

    /// Encode this value to CBOR bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, MalformedError> {
        let value = Value::try_from(self.clone())?;
        let mut out = Vec::new();
        ciborium::ser::into_writer(&value, &mut out)
            .map_err(|e| MalformedError::Cbor(e.to_string()))?;
        Ok(out)
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            CborValue::Integer(_) => "integer",
            CborValue::Bytes(_) => "byte string",
            CborValue::Text(_) => "text string",
            CborValue::Array(_) => "array",
            CborValue::Map(_) => "map",
            CborValue::Tag(..) => "tag",
            CborValue::Bool(_) => "bool",
            CborValue::Null => "null",
            CborValue::Float(_) => "float",
        }
    }

    /// Build a text-keyed map tree from a JSON document.
    ///
    /// Integral numbers become [`CborValue::Integer`]; other numbers become
    /// [`CborValue::Float`].
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => CborValue::Null,
            JsonValue::Bool(b) => CborValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CborValue::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    CborValue::Integer(i128::from(u))
                } else {
                    CborValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => CborValue::Text(s.clone()),
            JsonValue::Array(items) => CborValue::Array(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(map) => CborValue::Map(
                map.iter()
                    .map(|(k, v)| (CborValue::Text(k.clone()), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render this value as a JSON document.
    ///
    /// Byte strings become unpadded base64url text, tags are transparent,
    /// integer map keys are stringified, and non-finite floats become null.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedError::Json`] for integers outside the 64-bit range
    /// and for map keys that are neither text nor integers.
    pub fn to_json(&self) -> Result<JsonValue, MalformedError> {
        Ok(match self {
            CborValue::Integer(i) => integer_to_json(*i)?,
            CborValue::Bytes(b) => JsonValue::String(URL_SAFE_NO_PAD.encode(b)),
            CborValue::Text(s) => JsonValue::String(s.clone()),
            CborValue::Array(items) => {
                JsonValue::Array(items.iter().map(Self::to_json).collect::<Result<_, _>>()?)
            }
            CborValue::Map(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = match k {
                        CborValue::Text(s) => s.clone(),
                        CborValue::Integer(i) => i.to_string(),
                        other => {
                            return Err(MalformedError::Json(format!(
                                "{} cannot be a JSON object key",
                                other.type_name()
                            )))
                        }
                    };
                    map.insert(key, v.to_json()?);
                }
                JsonValue::Object(map)
            }
            CborValue::Tag(_, inner) => inner.to_json()?,
            CborValue::Bool(b) => JsonValue::Bool(*b),
            CborValue::Null => JsonValue::Null,
            CborValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        })
    }

    /// Look up an integer key in a map's entries.
    pub fn lookup(entries: &[(CborValue, CborValue)], key: i64) -> Option<&CborValue> {
        entries.iter().find_map(|(k, v)| match k {
            CborValue::Integer(i) if *i == i128::from(key) => Some(v),
            _ => None,
        })
    }
}

fn integer_to_json(i: i128) -> Result<JsonValue, MalformedError> {
    if let Ok(v) = i64::try_from(i) {
        Ok(JsonValue::from(v))
    } else if let Ok(v) = u64::try_from(i) {
        Ok(JsonValue::from(v))
    } else {
        Err(MalformedError::Json(format!(
            "integer {i} is outside the JSON-representable range"
        )))
    }
}

impl TryFrom<Value> for CborValue {
    type Error = MalformedError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Integer(i) => CborValue::Integer(i128::from(i)),
            Value::Bytes(b) => CborValue::Bytes(b),
            Value::Text(s) => CborValue::Text(s),
            Value::Array(items) => CborValue::Array(
                items
                    .into_iter()
                    .map(CborValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => CborValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((CborValue::try_from(k)?, CborValue::try_from(v)?)))
                    .collect::<Result<_, MalformedError>>()?,
            ),
            Value::Tag(tag, inner) => CborValue::Tag(tag, Box::new(CborValue::try_from(*inner)?)),
            Value::Bool(b) => CborValue::Bool(b),
            Value::Null => CborValue::Null,
            Value::Float(f) => CborValue::Float(f),
            other => {
                return Err(MalformedError::Cbor(format!(
                    "unsupported CBOR construct: {other:?}"
                )))
            }
        })
    }
}

impl TryFrom<CborValue> for Value {
    type Error = MalformedError;

    fn try_from(value: CborValue) -> Result<Self, Self::Error> {
        Ok(match value {
            CborValue::Integer(i) => Value::Integer(
                Integer::try_from(i)
                    .map_err(|_| MalformedError::Cbor(format!("integer {i} out of CBOR range")))?,
            ),
            CborValue::Bytes(b) => Value::Bytes(b),
            CborValue::Text(s) => Value::Text(s),
            CborValue::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            CborValue::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((Value::try_from(k)?, Value::try_from(v)?)))
                    .collect::<Result<_, MalformedError>>()?,
            ),
            CborValue::Tag(tag, inner) => Value::Tag(tag, Box::new(Value::try_from(*inner)?)),
            CborValue::Bool(b) => Value::Bool(b),
            CborValue::Null => Value::Null,
            CborValue::Float(f) => Value::Float(f),
        })
    }
}
