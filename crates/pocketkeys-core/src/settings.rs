// Pocketkeys Settings Module
// User-configurable feature toggles, timing and editor lists

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names of the feature toggles under `[features]`
pub mod feature {
    pub const DOUBLE_SPACE_PERIOD: &str = "double_space_period";
    pub const AUTO_CORRECTION: &str = "auto_correction";
    pub const AUTO_CAPITALIZATION: &str = "auto_capitalization";
    pub const LAYOUT_CHANGE_SHORTCUT: &str = "layout_change_shortcut";
    pub const PHONE_CONTROL: &str = "phone_control";
    pub const LOCK_SYM_PAD: &str = "lock_sym_pad";
}

const DEFAULT_FEATURES: &[(&str, bool)] = &[
    (feature::DOUBLE_SPACE_PERIOD, true),
    (feature::AUTO_CORRECTION, true),
    (feature::AUTO_CAPITALIZATION, true),
    (feature::LAYOUT_CHANGE_SHORTCUT, true),
    (feature::PHONE_CONTROL, false),
    (feature::LOCK_SYM_PAD, true),
];

pub const DEFAULT_LONG_PRESS_MS: u64 = 300;
pub const DEFAULT_LAYOUT_CHANGE_REPEAT_COUNT: u32 = 10;
pub const DEFAULT_KEEP_COMPOSING: &str = "'-";
pub const DEFAULT_WORD_LOOKUP_LENGTH: usize = 48;
pub const DEFAULT_LAYOUT: &str = "english";

/// Settings for pocketkeys
///
/// These settings are loaded from a TOML file
/// (default: ~/.config/pocketkeys/settings.toml). Unknown feature names
/// are kept so hosts can store their own toggles alongside ours.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Feature toggles (e.g., double_space_period, auto_correction)
    features: HashMap<String, bool>,

    long_press_ms: u64,
    layout_change_repeat_count: u32,

    /// Non-alphanumeric characters that do not end a composed word
    keep_composing: String,
    /// Characters read back when re-opening a word
    word_lookup_length: usize,

    /// Editors that get characters as synthetic key presses
    raw_input_editors: Vec<String>,
    /// Editors that receive hardware keys untouched
    direct_input_editors: Vec<String>,

    default_layout: String,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    features: Option<HashMap<String, toml::Value>>,

    #[serde(default)]
    timing: Option<TimingSettings>,

    #[serde(default)]
    composing: Option<ComposingSettings>,

    #[serde(default)]
    editors: Option<EditorSettings>,

    #[serde(default)]
    layout: Option<LayoutSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TimingSettings {
    #[serde(default)]
    long_press_ms: Option<u64>,
    #[serde(default)]
    layout_change_repeat_count: Option<u32>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ComposingSettings {
    #[serde(default)]
    keep_composing: Option<String>,
    #[serde(default)]
    word_lookup_length: Option<usize>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EditorSettings {
    #[serde(default)]
    raw_input: Vec<String>,
    #[serde(default)]
    direct_input: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LayoutSettings {
    #[serde(default)]
    default: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with every default applied
    pub fn new() -> Self {
        Self {
            features: DEFAULT_FEATURES
                .iter()
                .map(|&(name, value)| (name.to_string(), value))
                .collect(),
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            layout_change_repeat_count: DEFAULT_LAYOUT_CHANGE_REPEAT_COUNT,
            keep_composing: DEFAULT_KEEP_COMPOSING.to_string(),
            word_lookup_length: DEFAULT_WORD_LOOKUP_LENGTH,
            raw_input_editors: Vec::new(),
            direct_input_editors: Vec::new(),
            default_layout: DEFAULT_LAYOUT.to_string(),
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(features) = toml_settings.features {
            for (key, value) in features {
                let bool_value = parse_bool_value(&value)?;
                settings.features.insert(key, bool_value);
            }
        }

        if let Some(timing) = toml_settings.timing {
            if let Some(ms) = timing.long_press_ms {
                if ms == 0 {
                    return Err(SettingsError::InvalidValue(
                        "timing.long_press_ms must be greater than 0".to_string(),
                    ));
                }
                settings.long_press_ms = ms;
            }
            if let Some(count) = timing.layout_change_repeat_count {
                settings.layout_change_repeat_count = count;
            }
        }

        if let Some(composing) = toml_settings.composing {
            if let Some(keep) = composing.keep_composing {
                settings.keep_composing = keep;
            }
            if let Some(len) = composing.word_lookup_length {
                settings.word_lookup_length = len;
            }
        }

        if let Some(editors) = toml_settings.editors {
            settings.raw_input_editors = editors.raw_input;
            settings.direct_input_editors = editors.direct_input;
        }

        if let Some(layout) = toml_settings.layout {
            if let Some(default) = layout.default.filter(|d| !d.is_empty()) {
                settings.default_layout = default;
            }
        }

        log::debug!("Loaded settings: {:?}", settings.features);
        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pocketkeys").join("settings.toml"))
    }

    /// Load from default location (~/.config/pocketkeys/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Get a boolean feature value
    pub fn get_bool(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    /// Set a boolean feature value
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.features.insert(name.to_string(), value);
    }

    /// Check if a setting exists
    pub fn has_setting(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Get all features as a hashmap
    pub fn features(&self) -> &HashMap<String, bool> {
        &self.features
    }

    pub fn double_space_period(&self) -> bool {
        self.get_bool(feature::DOUBLE_SPACE_PERIOD)
    }

    pub fn auto_correction(&self) -> bool {
        self.get_bool(feature::AUTO_CORRECTION)
    }

    pub fn auto_capitalization(&self) -> bool {
        self.get_bool(feature::AUTO_CAPITALIZATION)
    }

    pub fn layout_change_shortcut(&self) -> bool {
        self.get_bool(feature::LAYOUT_CHANGE_SHORTCUT)
    }

    pub fn phone_control(&self) -> bool {
        self.get_bool(feature::PHONE_CONTROL)
    }

    pub fn lock_sym_pad(&self) -> bool {
        self.get_bool(feature::LOCK_SYM_PAD)
    }

    /// Long-press threshold, also the double-tap and multi-tap window
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn set_long_press(&mut self, long_press: Duration) {
        self.long_press_ms = u64::try_from(long_press.as_millis()).unwrap_or(u64::MAX).max(1);
    }

    /// Space auto-repeats needed to trigger a layout switch
    pub fn layout_change_repeat_count(&self) -> u32 {
        self.layout_change_repeat_count
    }

    pub fn keep_composing(&self) -> &str {
        &self.keep_composing
    }

    pub fn word_lookup_length(&self) -> usize {
        self.word_lookup_length
    }

    pub fn is_raw_input_editor(&self, package: &str) -> bool {
        self.raw_input_editors.iter().any(|p| p == package)
    }

    pub fn is_direct_input_editor(&self, package: &str) -> bool {
        self.direct_input_editors.iter().any(|p| p == package)
    }

    /// Layout used for text fields
    pub fn default_layout(&self) -> &str {
        &self.default_layout
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

/// Parse a TOML value as a boolean
fn parse_bool_value(value: &toml::Value) -> Result<bool, SettingsError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(SettingsError::InvalidValue(format!(
                "Cannot convert '{}' to boolean",
                s
            ))),
        },
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Pocketkeys Settings
# Place this file at: ~/.config/pocketkeys/settings.toml

[features]
double_space_period = true
auto_correction = true
auto_capitalization = true
# Hold Space to switch layout
layout_change_shortcut = true
# Shift answers and Alt ends an incoming call
phone_control = false
# Double-tap Sym to lock the navigation pad
lock_sym_pad = true

[timing]
long_press_ms = 300
layout_change_repeat_count = 10

[composing]
keep_composing = "'-"
word_lookup_length = 48

[editors]
raw_input = []
direct_input = []

[layout]
default = "english"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::new();
        assert!(settings.double_space_period());
        assert!(settings.auto_capitalization());
        assert!(!settings.phone_control());
        assert_eq!(settings.long_press(), Duration::from_millis(300));
        assert_eq!(settings.layout_change_repeat_count(), 10);
        assert_eq!(settings.keep_composing(), "'-");
        assert_eq!(settings.default_layout(), "english");
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let parsed = Settings::from_toml(default_settings_content()).unwrap();
        let defaults = Settings::new();
        assert_eq!(parsed.features(), defaults.features());
        assert_eq!(parsed.long_press(), defaults.long_press());
        assert_eq!(parsed.word_lookup_length(), defaults.word_lookup_length());
    }

    #[test]
    fn test_settings_from_toml() {
        let toml = r#"
[features]
double_space_period = false
phone_control = true

[timing]
long_press_ms = 450

[editors]
raw_input = ["org.example.terminal"]
direct_input = ["org.example.game"]

[layout]
default = "german"
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert!(!settings.double_space_period());
        assert!(settings.phone_control());
        assert!(settings.auto_correction());
        assert_eq!(settings.long_press(), Duration::from_millis(450));
        assert!(settings.is_raw_input_editor("org.example.terminal"));
        assert!(settings.is_direct_input_editor("org.example.game"));
        assert!(!settings.is_direct_input_editor("org.example.terminal"));
        assert_eq!(settings.default_layout(), "german");
    }

    #[test]
    fn test_settings_with_string_values() {
        let toml = r#"
[features]
auto_correction = "no"
lock_sym_pad = "off"
phone_control = 1
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert!(!settings.auto_correction());
        assert!(!settings.lock_sym_pad());
        assert!(settings.phone_control());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Settings::from_toml("[features]\nauto_correction = \"maybe\"\n"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            Settings::from_toml("[timing]\nlong_press_ms = 0\n"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            Settings::from_toml("[timing]\nbogus = 1\n"),
            Err(SettingsError::TomlParse(_))
        ));
    }

    #[test]
    fn test_reload_without_source() {
        let mut settings = Settings::new();
        assert!(settings.reload().is_err());
    }
}
