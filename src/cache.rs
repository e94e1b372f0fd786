use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use normalize_path::NormalizePath;

use crate::{Result, TileSet};

/// Cache of parsed external tilesets, keyed by path.
///
/// Maps referencing the same tileset file share one parsed copy.
/// The cache is meant to be created once by the host application,
/// wrapped in an [Arc] and handed to every [Loader](crate::Loader).
///
/// All access goes through a single lock.
/// Concurrent loads of different tilesets therefore wait for each other.
pub struct TilesetCache {
    provider: Box<dyn Provider>,
    tilesets: Mutex<HashMap<PathBuf, Arc<TileSet>>>,
    parses: AtomicUsize,
}

impl TilesetCache {
    /// Create a cache that reads files from the file system.
    pub fn new() -> Self {
        Self::with_provider(FileProvider{})
    }

    /// Create a cache with a custom data provider.
    pub fn with_provider<P: Provider + 'static>(file_provider: P) -> Self {
        Self {
            provider: Box::new(file_provider),
            tilesets: Mutex::new(HashMap::new()),
            parses: AtomicUsize::new(0),
        }
    }

    /// The provider used to read files. The loader reads map files through it as well.
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Return the tileset stored at `path`, parsing it on first access.
    /// The returned tileset is shared and must be cloned before modification.
    pub fn get_tileset(&self, path: &Path) -> Result<Arc<TileSet>> {
        let key = path.normalize();
        let mut tilesets = self.lock();

        if let Some(tileset) = tilesets.get(&key) {
            tracing::debug!(path = %key.display(), "tileset cache hit");
            return Ok(tileset.clone());
        }

        tracing::debug!(path = %key.display(), "tileset cache miss, parsing");
        let data = self.provider.read(&key)?;
        let text = String::from_utf8(data)?;
        let tileset = Arc::new(TileSet::parse_file_contents(&key, &text)?);
        self.parses.fetch_add(1, Ordering::Relaxed);

        tilesets.insert(key, tileset.clone());
        Ok(tileset)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(&path.normalize())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all cached tilesets. Maps that were already loaded keep their copies.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of tileset files actually parsed by this cache.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<TileSet>>> {
        // A panic while holding the lock cannot leave a half inserted entry behind
        self.tilesets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TilesetCache {
    fn default() -> Self {
        TilesetCache::new()
    }
}

impl std::fmt::Debug for TilesetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilesetCache")
            .field("len", &self.len())
            .field("parses", &self.parse_count())
            .finish()
    }
}

/// Trait to provide external data.
pub trait Provider: Send + Sync {
    /// Read the file located at `path` and return its contents.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// [Provider] that reads the data from files on the file system.
pub struct FileProvider {}

impl Provider for FileProvider {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = std::fs::File::open(path)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }
}
