// Pocketkeys Core Library
// Keystroke processing for hardware-keyboard input methods

pub mod compose;
pub mod config;
pub mod event;
pub mod grapheme;
pub mod key;
pub mod layout;
pub mod mapping;
pub mod modifier;
pub mod pad;
pub mod session;
pub mod settings;
pub mod sink;

pub use compose::{ComposeResult, Composer, ComposerConfig, ComposerState, InputMode, KeyRepeatContext};
pub use config::{load_layout_file, parse_layout, LayoutError};
pub use event::{KeyAction, KeyEdge, KeyEvent, KeyOutcome};
pub use key::Key;
pub use layout::{
    shared_cache, LayoutCache, LayoutManager, LayoutProvider, SharedLayoutCache,
    StaticLayoutProvider, TomlLayoutProvider,
};
pub use mapping::{KeyMapEntry, KeyMapTable, KeyMapping, MappingError};
pub use modifier::{
    LatchState, ModifierKind, ModifierOutcome, ModifierSnapshot, ModifierStateMachine,
    ModifierStatus,
};
pub use pad::{DirectionalCommand, MediaCommand, PadCommand, PadModeTranslator};
pub use session::{EditorClass, EditorInfo, InputSession};
pub use settings::{Settings, SettingsError};
pub use sink::{
    BatchGuard, CallControl, CommandSink, HostActions, MemoryTextSink, NullHost, StatusListener,
    SuggestionSource, TextSink,
};
