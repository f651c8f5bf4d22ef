// Pocketkeys Layout Parser - TOML with Serde
// Parses keyboard layout files into KeyMapTable

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::mapping::{KeyMapEntry, KeyMapTable, KeyMapping, MappingError};
use crate::Key;

/// Layout loading errors
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Empty value for key {0}")]
    EmptyValue(String),

    #[error("Value {value:?} for key {key} is not a single character")]
    MultiCharValue { key: String, value: String },

    #[error("Invalid mapping for key {key}: {source}")]
    InvalidMapping {
        key: String,
        #[source]
        source: MappingError,
    },

    #[error("Layout has no keys: {0}")]
    EmptyLayout(String),

    #[error("Layout not found: {0}")]
    NotFound(String),
}

/// Root of a layout file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutToml {
    /// Display name, defaults to the layout id
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub key: Vec<KeyToml>,
}

/// `[[key]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyToml {
    pub code: KeyCode,

    #[serde(default)]
    pub values: Vec<ValueToml>,

    #[serde(default)]
    pub alt: Vec<ValueToml>,
}

/// Key reference: a name such as `"Q"` or a numeric code
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyCode {
    Code(u16),
    Name(String),
}

/// One candidate; `value` and `shift` hold exactly one character each
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueToml {
    pub value: String,

    #[serde(default)]
    pub shift: Option<String>,
}

impl KeyCode {
    fn to_key(&self) -> Result<Key, LayoutError> {
        match self {
            KeyCode::Code(code) => Ok(Key(*code)),
            KeyCode::Name(name) => name
                .parse::<Key>()
                .map_err(|_| LayoutError::InvalidKey(name.clone())),
        }
    }
}

fn single_char(key: Key, text: &str) -> Result<char, LayoutError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        (None, _) => Err(LayoutError::EmptyValue(key.to_string())),
        (Some(_), Some(_)) => Err(LayoutError::MultiCharValue {
            key: key.to_string(),
            value: text.to_string(),
        }),
    }
}

fn parse_entry(key: Key, value: &ValueToml) -> Result<KeyMapEntry, LayoutError> {
    let base = single_char(key, &value.value)?;
    let shift = value
        .shift
        .as_deref()
        .map(|s| single_char(key, s))
        .transpose()?;
    Ok(KeyMapEntry::new(base, shift))
}

fn parse_entries(key: Key, values: &[ValueToml]) -> Result<Vec<KeyMapEntry>, LayoutError> {
    values.iter().map(|v| parse_entry(key, v)).collect()
}

/// Parse a layout from TOML text; `fallback_name` is used when the file has no `name`
pub fn parse_layout(content: &str, fallback_name: &str) -> Result<KeyMapTable, LayoutError> {
    let layout: LayoutToml =
        toml::from_str(content).map_err(|e| LayoutError::TomlParse(e.to_string()))?;

    let name = layout.name.unwrap_or_else(|| fallback_name.to_string());
    let mut mappings = HashMap::with_capacity(layout.key.len());

    for entry in &layout.key {
        let key = entry.code.to_key()?;
        let values = parse_entries(key, &entry.values)?;
        let alt = parse_entries(key, &entry.alt)?;
        let mapping = KeyMapping::new(values, alt).map_err(|source| LayoutError::InvalidMapping {
            key: key.to_string(),
            source,
        })?;
        if mappings.insert(key, mapping).is_some() {
            log::warn!("Layout '{}': key {} defined twice, last one wins", name, key);
        }
    }

    log::debug!("Parsed layout '{}' with {} keys", name, mappings.len());

    KeyMapTable::new(name, mappings).map_err(|e| match e {
        MappingError::EmptyTable(name) => LayoutError::EmptyLayout(name),
        other => LayoutError::InvalidMapping {
            key: String::new(),
            source: other,
        },
    })
}

/// Load a layout file; the file stem is the fallback name
pub fn load_layout_file<P: AsRef<Path>>(path: P) -> Result<KeyMapTable, LayoutError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LayoutError::NotFound(path.display().to_string())
        } else {
            LayoutError::Io(e)
        }
    })?;
    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layout");
    parse_layout(&content, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "english"

[[key]]
code = "K"
values = [{ value = "a", shift = "A" }, { value = "e", shift = "E" }, { value = "i" }]
alt = [{ value = "4" }]

[[key]]
code = 16
values = [{ value = "q", shift = "Q" }]
"#;

    #[test]
    fn test_parse_layout() {
        let table = parse_layout(SAMPLE, "fallback").unwrap();
        assert_eq!(table.name(), "english");
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(Key::K, false, false, 1), Some('e'));
        assert_eq!(table.resolve(Key::K, true, false, 2), Some('i'));
        assert_eq!(table.resolve(Key::K, false, true, 0), Some('4'));
        assert_eq!(table.resolve(Key::Q, true, false, 0), Some('Q'));
    }

    #[test]
    fn test_fallback_name() {
        let table = parse_layout("[[key]]\ncode = \"A\"\nvalues = [{ value = \"a\" }]\n", "plain").unwrap();
        assert_eq!(table.name(), "plain");
    }

    #[test]
    fn test_invalid_key() {
        let err = parse_layout("[[key]]\ncode = \"NOPE\"\nvalues = [{ value = \"a\" }]\n", "x")
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidKey(name) if name == "NOPE"));
    }

    #[test]
    fn test_key_without_values() {
        let err = parse_layout("[[key]]\ncode = \"A\"\nalt = [{ value = \"1\" }]\n", "x").unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvalidMapping {
                source: MappingError::NoBaseValues,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_value() {
        let err = parse_layout("[[key]]\ncode = \"A\"\nvalues = [{ value = \"\" }]\n", "x").unwrap_err();
        assert!(matches!(err, LayoutError::EmptyValue(_)));
    }

    #[test]
    fn test_empty_shift_value() {
        let err = parse_layout(
            "[[key]]\ncode = \"A\"\nvalues = [{ value = \"a\", shift = \"\" }]\n",
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::EmptyValue(_)));
    }

    #[test]
    fn test_multi_char_value() {
        let err = parse_layout("[[key]]\ncode = \"A\"\nvalues = [{ value = \"ab\" }]\n", "x").unwrap_err();
        assert!(matches!(err, LayoutError::MultiCharValue { value, .. } if value == "ab"));

        let err = parse_layout(
            "[[key]]\ncode = \"A\"\nvalues = [{ value = \"a\", shift = \"AB\" }]\n",
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::MultiCharValue { value, .. } if value == "AB"));
    }

    #[test]
    fn test_empty_layout() {
        let err = parse_layout("name = \"nothing\"\n", "x").unwrap_err();
        assert!(matches!(err, LayoutError::EmptyLayout(name) if name == "nothing"));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            parse_layout("[[key]\n", "x"),
            Err(LayoutError::TomlParse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_layout_file("/nonexistent/pocketkeys/layout.toml"),
            Err(LayoutError::NotFound(_))
        ));
    }
}
