//! Structured values exchanged with device services.
//!
//! [`Value`] is the tagged tree every command and response is expressed in.
//! Conversion to and from the `plist` crate's tree happens once at the wire
//! boundary, recursively and eagerly.
//!
//! Representation limits of the XML property-list encoding:
//! - dictionary keys are unique; a mapping with duplicate keys cannot exist in
//!   a [`Dictionary`] and therefore cannot be sent,
//! - dictionaries are written in sorted key order, so insertion order is not
//!   preserved across a round trip,
//! - integers above `i64::MAX` and `date`/`uid` elements are rejected on decode
//!   with [`PlistError::Protocol`] instead of being coerced.

use std::collections::BTreeMap;
use std::io::Cursor;

use serde::de::DeserializeOwned;

use crate::error::{PlistError, Result};

/// String-keyed mapping of structured values.
pub type Dictionary = BTreeMap<String, Value>;

/// A structured property-list value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Data(Vec<u8>),
    Array(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    /// Look up `key` when this value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dictionary().and_then(|dict| dict.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn into_dictionary(self) -> Option<Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Serialize as an XML property list document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        plist::Value::from(self).to_writer_xml(&mut out)?;
        Ok(out)
    }

    /// Parse a property list document (XML or binary).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = plist::Value::from_reader(Cursor::new(bytes))?;
        Self::try_from(value)
    }

    /// Deserialize into a typed view.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(plist::from_value(&plist::Value::from(self))?)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Self::Dictionary(value)
    }
}

impl From<&Value> for plist::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => plist::Value::String(s.clone()),
            Value::Integer(i) => plist::Value::Integer((*i).into()),
            Value::Real(r) => plist::Value::Real(*r),
            Value::Boolean(b) => plist::Value::Boolean(*b),
            Value::Data(d) => plist::Value::Data(d.clone()),
            Value::Array(items) => plist::Value::Array(items.iter().map(Into::into).collect()),
            Value::Dictionary(dict) => {
                let mut out = plist::Dictionary::new();
                for (key, value) in dict {
                    out.insert(key.clone(), value.into());
                }
                plist::Value::Dictionary(out)
            }
        }
    }
}

impl TryFrom<plist::Value> for Value {
    type Error = PlistError;

    fn try_from(value: plist::Value) -> Result<Self> {
        match value {
            plist::Value::String(s) => Ok(Self::String(s)),
            plist::Value::Integer(i) => i.as_signed().map(Self::Integer).ok_or_else(|| {
                PlistError::Protocol(format!("integer {i:?} does not fit in i64"))
            }),
            plist::Value::Real(r) => Ok(Self::Real(r)),
            plist::Value::Boolean(b) => Ok(Self::Boolean(b)),
            plist::Value::Data(d) => Ok(Self::Data(d)),
            plist::Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Self::Array),
            plist::Value::Dictionary(dict) => dict
                .into_iter()
                .map(|(key, value)| Ok((key, Self::try_from(value)?)))
                .collect::<Result<Dictionary>>()
                .map(Self::Dictionary),
            other => Err(PlistError::Protocol(format!(
                "unsupported plist element: {other:?}"
            ))),
        }
    }
}
