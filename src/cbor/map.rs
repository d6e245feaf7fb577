use std::convert::TryFrom;

use super::decode::from_slice;
use super::error::DecodeError;
use super::value::Value;

/// A key accepted by [`CborMap`] lookups.
///
/// Canonical CTAP2 maps use small integer keys; both narrow (`i32`) and wide
/// (`i64`) callers funnel into the same integer comparison, so a lookup
/// succeeds regardless of which width produced the key. String keys are
/// exact-match only.
pub trait MapKey {
    fn matches(&self, key: &Value) -> bool;
}

impl MapKey for i32 {
    fn matches(&self, key: &Value) -> bool {
        matches!(key, Value::Integer(n) if *n == *self as i64)
    }
}

impl MapKey for i64 {
    fn matches(&self, key: &Value) -> bool {
        matches!(key, Value::Integer(n) if *n == *self)
    }
}

impl MapKey for &str {
    fn matches(&self, key: &Value) -> bool {
        matches!(key, Value::Text(s) if s == *self)
    }
}

/// Read-only facade over a decoded CBOR map with typed getters.
///
/// Getters return `None` when the key is missing or the stored value has a
/// different type; they never fail.
#[derive(Debug, Clone, Copy)]
pub struct CborMap<'a> {
    entries: &'a [(Value, Value)],
}

impl<'a> CborMap<'a> {
    /// Wrap a decoded value; `None` unless it is a map.
    pub fn new(value: &'a Value) -> Option<Self> {
        match value {
            Value::Map(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    pub fn get<K: MapKey>(&self, key: K) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| key.matches(k))
            .map(|(_, v)| v)
    }

    pub fn contains_key<K: MapKey>(&self, key: K) -> bool {
        self.entries.iter().any(|(k, _)| key.matches(k))
    }

    pub fn int<K: MapKey>(&self, key: K) -> Option<i32> {
        self.long(key).and_then(|n| i32::try_from(n).ok())
    }

    pub fn long<K: MapKey>(&self, key: K) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    pub fn bool<K: MapKey>(&self, key: K) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn string<K: MapKey>(&self, key: K) -> Option<&'a str> {
        self.get(key)?.as_str()
    }

    pub fn bytes<K: MapKey>(&self, key: K) -> Option<&'a [u8]> {
        self.get(key)?.as_bytes()
    }

    pub fn map<K: MapKey>(&self, key: K) -> Option<CborMap<'a>> {
        CborMap::new(self.get(key)?)
    }

    pub fn list<K: MapKey>(&self, key: K) -> Option<&'a [Value]> {
        self.get(key)?.as_array()
    }

    /// A list whose items are all maps; `None` if any item is not a map.
    pub fn map_list<K: MapKey>(&self, key: K) -> Option<Vec<CborMap<'a>>> {
        self.list(key)?.iter().map(CborMap::new).collect()
    }
}

impl<'a> TryFrom<&'a Value> for CborMap<'a> {
    type Error = DecodeError;

    fn try_from(value: &'a Value) -> Result<Self, Self::Error> {
        CborMap::new(value).ok_or(DecodeError::NotAMap)
    }
}

/// Owned counterpart of [`CborMap`]: decodes a response buffer directly and
/// requires the top-level value to be a map.
#[derive(Debug, Clone)]
pub struct CborMapBuf {
    entries: Vec<(Value, Value)>,
}

impl CborMapBuf {
    pub fn from_slice(data: &[u8]) -> Result<Self, DecodeError> {
        match from_slice(data)? {
            Value::Map(entries) => Ok(Self { entries }),
            _ => Err(DecodeError::NotAMap),
        }
    }

    /// Borrowed view exposing the typed getters.
    pub fn as_map(&self) -> CborMap<'_> {
        CborMap {
            entries: &self.entries,
        }
    }
}
