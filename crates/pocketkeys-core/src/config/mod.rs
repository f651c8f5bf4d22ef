// Pocketkeys Config API
// Layout file parsing

pub mod layout;

pub use layout::{load_layout_file, parse_layout, LayoutError};
