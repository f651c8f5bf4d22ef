// Pocketkeys Layout Management
// Layout providers, the shared LRU layout cache and the active-layout manager

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::config::layout::{load_layout_file, parse_layout, LayoutError};
use crate::mapping::KeyMapTable;

/// Number of parsed layouts kept in memory
pub const LAYOUT_CACHE_CAPACITY: usize = 2;

/// Layout id used for number, date and phone fields
pub const NUMERIC_LAYOUT: &str = "numeric";

/// Source of layout definitions
pub trait LayoutProvider: Send + Sync {
    /// Load and parse the layout with the given id
    fn load(&self, layout_id: &str) -> Result<KeyMapTable, LayoutError>;
}

/// Reads `<dir>/<layout_id>.toml`
#[derive(Debug, Clone)]
pub struct TomlLayoutProvider {
    dir: PathBuf,
}

impl TomlLayoutProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory layouts are read from
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl LayoutProvider for TomlLayoutProvider {
    fn load(&self, layout_id: &str) -> Result<KeyMapTable, LayoutError> {
        load_layout_file(self.dir.join(format!("{}.toml", layout_id)))
    }
}

/// In-memory layout sources, used for bundled layouts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticLayoutProvider {
    sources: HashMap<String, String>,
}

impl StaticLayoutProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layout source under `layout_id`
    pub fn with_layout(mut self, layout_id: impl Into<String>, toml: impl Into<String>) -> Self {
        self.sources.insert(layout_id.into(), toml.into());
        self
    }
}

impl LayoutProvider for StaticLayoutProvider {
    fn load(&self, layout_id: &str) -> Result<KeyMapTable, LayoutError> {
        let source = self
            .sources
            .get(layout_id)
            .ok_or_else(|| LayoutError::NotFound(layout_id.to_string()))?;
        parse_layout(source, layout_id)
    }
}

/// Bounded LRU of parsed layouts, most recently used last
#[derive(Debug)]
pub struct LayoutCache {
    entries: IndexMap<String, Arc<KeyMapTable>>,
    capacity: usize,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(LAYOUT_CACHE_CAPACITY)
    }
}

impl LayoutCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Get a cached layout and mark it most recently used
    pub fn get(&mut self, layout_id: &str) -> Option<Arc<KeyMapTable>> {
        let index = self.entries.get_index_of(layout_id)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, table)| Arc::clone(table))
    }

    /// Insert a layout, evicting the least recently used entries over capacity
    pub fn insert(&mut self, layout_id: impl Into<String>, table: Arc<KeyMapTable>) {
        let layout_id = layout_id.into();
        self.entries.shift_remove(&layout_id);
        self.entries.insert(layout_id, table);
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                log::debug!("Evicted layout '{}' from cache", evicted);
            }
        }
    }

    pub fn contains(&self, layout_id: &str) -> bool {
        self.entries.contains_key(layout_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached ids, least recently used first
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Layout cache shared between sessions
pub type SharedLayoutCache = Arc<Mutex<LayoutCache>>;

/// Create an empty shared cache with the default capacity
pub fn shared_cache() -> SharedLayoutCache {
    Arc::new(Mutex::new(LayoutCache::default()))
}

/// Tracks the active layout of a session
pub struct LayoutManager {
    provider: Arc<dyn LayoutProvider>,
    cache: SharedLayoutCache,
    current: Option<Arc<KeyMapTable>>,
    current_id: Option<String>,
    failed: Option<String>,
}

impl LayoutManager {
    pub fn new(provider: Arc<dyn LayoutProvider>, cache: SharedLayoutCache) -> Self {
        Self {
            provider,
            cache,
            current: None,
            current_id: None,
            failed: None,
        }
    }

    /// Make `layout_id` the active layout.
    ///
    /// An empty id is ignored. On a load failure the previously active
    /// table stays in place and the error is returned; the failure is
    /// also remembered until [`take_failure`](Self::take_failure).
    pub fn switch_to(&mut self, layout_id: &str) -> Result<Arc<KeyMapTable>, LayoutError> {
        if layout_id.is_empty() {
            return self
                .current
                .clone()
                .ok_or_else(|| LayoutError::NotFound(String::new()));
        }

        let cached = self.cache.lock().get(layout_id);
        let table = match cached {
            Some(table) => table,
            None => match self.provider.load(layout_id) {
                Ok(table) => {
                    let table = Arc::new(table);
                    self.cache.lock().insert(layout_id, Arc::clone(&table));
                    table
                }
                Err(e) => {
                    log::warn!("Failed to load layout '{}': {}", layout_id, e);
                    self.failed = Some(layout_id.to_string());
                    return Err(e);
                }
            },
        };

        log::debug!("Active layout: {} ({})", layout_id, table.name());
        self.current = Some(Arc::clone(&table));
        self.current_id = Some(layout_id.to_string());
        Ok(table)
    }

    /// Switch to the numeric layout
    pub fn switch_to_numeric(&mut self) -> Result<Arc<KeyMapTable>, LayoutError> {
        self.switch_to(NUMERIC_LAYOUT)
    }

    /// Active table, if any layout loaded successfully
    pub fn current(&self) -> Option<&Arc<KeyMapTable>> {
        self.current.as_ref()
    }

    /// Id of the active layout
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Id of the last layout that failed to load, cleared on read
    pub fn take_failure(&mut self) -> Option<String> {
        self.failed.take()
    }

    /// Shared cache handle
    pub fn cache(&self) -> &SharedLayoutCache {
        &self.cache
    }
}
