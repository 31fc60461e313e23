//! Compact numeric keys for natural keys sent to the scoring service.
//!
//! The service correlates records more reliably with short numbers than with
//! long `file-property` strings. Numbers are handed out from zero in the order
//! natural keys are first submitted and are never reused or renumbered.
//! The map is persisted as an ordered array of natural keys where the index of
//! each key is its number.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Bidirectional natural key <-> numeric key map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    by_number: Vec<String>,
    by_key: HashMap<String, u64>,
}

impl KeyMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric key for `natural_key`, assigning the next number on first use
    pub fn assign(&mut self, natural_key: &str) -> u64 {
        if let Some(number) = self.by_key.get(natural_key) {
            return *number;
        }
        let number = self.by_number.len() as u64;
        self.by_number.push(natural_key.to_string());
        self.by_key.insert(natural_key.to_string(), number);
        number
    }

    /// Numeric key previously assigned to `natural_key`
    #[must_use]
    pub fn number_of(&self, natural_key: &str) -> Option<u64> {
        self.by_key.get(natural_key).copied()
    }

    /// Natural key behind a numeric key
    #[must_use]
    pub fn resolve(&self, number: u64) -> Option<&str> {
        usize::try_from(number)
            .ok()
            .and_then(|index| self.by_number.get(index))
            .map(String::as_str)
    }

    /// Number of keys assigned so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    /// True when no key has been assigned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    fn from_ordered(keys: Vec<String>) -> Self {
        let mut map = Self::new();
        for key in keys {
            // a duplicate in a hand-edited file keeps its first number
            if map.by_key.contains_key(&key) {
                map.by_number.push(key);
                continue;
            }
            map.assign(&key);
        }
        map
    }
}

impl Serialize for KeyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.by_number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::from_ordered)
    }
}
