// Pocketkeys Mapping Structures
// KeyMapEntry, KeyMapping, KeyMapTable

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::Key;

/// Most keys carry one to three candidates
pub type EntryList = SmallVec<[KeyMapEntry; 4]>;

/// Errors raised while building mappings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("key mapping must have at least one value")]
    NoBaseValues,

    #[error("layout '{0}' has no key mappings")]
    EmptyTable(String),
}

/// One candidate character of a key, with an optional shifted form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMapEntry {
    pub base: char,
    pub shift: Option<char>,
}

impl KeyMapEntry {
    pub fn new(base: char, shift: Option<char>) -> Self {
        Self { base, shift }
    }

    /// The character for the given shift state
    pub fn value(&self, shift: bool) -> char {
        if shift {
            self.shift.unwrap_or(self.base)
        } else {
            self.base
        }
    }
}

/// Candidates produced by one physical key.
///
/// The base list is never empty. The alt list may be empty, in which case
/// Alt resolves through the base list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    values: EntryList,
    alt_values: EntryList,
}

impl KeyMapping {
    /// Create a new KeyMapping
    pub fn new(
        values: impl IntoIterator<Item = KeyMapEntry>,
        alt_values: impl IntoIterator<Item = KeyMapEntry>,
    ) -> Result<Self, MappingError> {
        let values: EntryList = values.into_iter().collect();
        if values.is_empty() {
            return Err(MappingError::NoBaseValues);
        }
        Ok(Self {
            values,
            alt_values: alt_values.into_iter().collect(),
        })
    }

    /// Base candidates
    pub fn values(&self) -> &[KeyMapEntry] {
        &self.values
    }

    /// Alt candidates (possibly empty)
    pub fn alt_values(&self) -> &[KeyMapEntry] {
        &self.alt_values
    }

    fn list(&self, alt: bool) -> &[KeyMapEntry] {
        if alt && !self.alt_values.is_empty() {
            &self.alt_values
        } else {
            &self.values
        }
    }

    /// Resolve the character for a modifier state and multi-tap counter.
    ///
    /// The counter wraps modulo the length of the selected list.
    pub fn resolve(&self, shift: bool, alt: bool, counter: u8) -> char {
        let list = self.list(alt);
        list[usize::from(counter) % list.len()].value(shift)
    }

    /// True if repeated taps cycle through more than one candidate
    pub fn has_additional_values(&self, alt: bool) -> bool {
        self.list(alt).len() > 1
    }
}

/// All key mappings of one layout
#[derive(Debug, Clone)]
pub struct KeyMapTable {
    name: String,
    mappings: HashMap<Key, KeyMapping>,
}

impl KeyMapTable {
    /// Create a new KeyMapTable; a layout without mappings is rejected
    pub fn new(
        name: impl Into<String>,
        mappings: HashMap<Key, KeyMapping>,
    ) -> Result<Self, MappingError> {
        let name = name.into();
        if mappings.is_empty() {
            return Err(MappingError::EmptyTable(name));
        }
        Ok(Self { name, mappings })
    }

    /// Get the name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the mappings
    pub fn mappings(&self) -> &HashMap<Key, KeyMapping> {
        &self.mappings
    }

    /// Check if a key is mapped in this layout
    pub fn contains(&self, key: Key) -> bool {
        self.mappings.contains_key(&key)
    }

    /// Get the mapping for a key
    pub fn get(&self, key: Key) -> Option<&KeyMapping> {
        self.mappings.get(&key)
    }

    /// Number of mapped keys
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Always false for a constructed table
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Resolve a key; `None` means the key is not part of this layout
    pub fn resolve(&self, key: Key, shift: bool, alt: bool, counter: u8) -> Option<char> {
        self.get(key).map(|m| m.resolve(shift, alt, counter))
    }
}
