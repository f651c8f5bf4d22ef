// Pocketkeys Composer
// Turns resolved characters into composing and committed text

mod composer;
mod repeat;

pub use composer::{ComposeResult, Composer, ComposerConfig, ComposerState, InputMode};
pub use repeat::KeyRepeatContext;
