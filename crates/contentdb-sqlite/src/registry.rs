//! Process-wide deduplication of database handles by file path.
//!
//! The registry maps canonical file paths to weak references. Opening a path
//! that already has a live handle returns that handle, so every caller in the
//! process shares one connection per file. The registry never keeps a handle
//! alive; when the last `Arc<Database>` is dropped the handle closes and its
//! entry is swept.
//!
//! Handles are dropped outside the registry lock. A handle's `Drop` sweeps the
//! registry, and the lock is not reentrant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use crate::connection::{Database, DatabaseConfig};

type Handles = HashMap<PathBuf, Weak<Database>>;

static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Shared table of open file-backed handles.
///
/// Cloning a `Registry` yields another reference to the same table. Tests and
/// embedders can create isolated registries with [`Registry::new`]; most code
/// uses [`Registry::global`].
#[derive(Clone, Default)]
pub struct Registry {
    handles: Arc<Mutex<Handles>>,
}

/// A handle's back-reference to the registry it is listed in.
pub(crate) struct RegistryLink(Weak<Mutex<Handles>>);

impl RegistryLink {
    pub(crate) fn sweep(&self) {
        if let Some(handles) = self.0.upgrade() {
            sweep(&mut lock(&handles));
        }
    }
}

impl Registry {
    /// Create an empty registry, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static Registry {
        GLOBAL_REGISTRY.get_or_init(Registry::new)
    }

    /// Open the database at `path`, or return the live handle already open
    /// for the same file.
    pub fn open_database(&self, path: &str) -> Arc<Database> {
        self.open_database_with_config(&DatabaseConfig::file(path))
    }

    /// Like [`open_database`](Self::open_database), with explicit open
    /// options. The options only apply when a new handle is created.
    ///
    /// In-memory paths and paths that cannot be resolved always produce a
    /// fresh, unlisted handle. A handle whose open failed is returned but
    /// never listed.
    #[tracing::instrument(level = "debug", skip(self, config), fields(path = %config.path))]
    pub fn open_database_with_config(&self, config: &DatabaseConfig) -> Arc<Database> {
        if config.is_in_memory() {
            return Arc::new(Database::open(config));
        }

        let Some(key) = canonical_path(&config.path) else {
            tracing::debug!("Path cannot be resolved, opening unlisted handle");
            return Arc::new(Database::open(config));
        };

        // Find-or-create happens entirely under the lock, so concurrent
        // openers of one file agree on a single handle.
        let mut handles = lock(&self.handles);
        if let Some(existing) = handles.get(&key).and_then(Weak::upgrade) {
            tracing::debug!(key = %key.display(), "Registry hit");
            return existing;
        }
        sweep(&mut handles);

        let mut db = Database::open(config);
        db.attach_registry(RegistryLink(Arc::downgrade(&self.handles)));
        let db = Arc::new(db);

        if db.open_error().is_none() {
            handles.insert(key.clone(), Arc::downgrade(&db));
            tracing::debug!(key = %key.display(), "Registered database");
        }
        db
    }

    /// Open a private in-memory database. It is never shared or listed.
    pub fn open_in_memory_database(&self) -> Database {
        Database::open_in_memory()
    }

    /// Drop entries whose handle has been released.
    pub fn sweep(&self) {
        sweep(&mut lock(&self.handles));
    }

    /// Number of listed entries, including any not yet swept.
    pub fn len(&self) -> usize {
        lock(&self.handles).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.handles).is_empty()
    }

    /// Canonical paths of the handles that are currently alive.
    pub fn live_paths(&self) -> Vec<PathBuf> {
        let handles = lock(&self.handles);
        let mut paths: Vec<PathBuf> = handles
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.len())
            .finish()
    }
}

fn lock(handles: &Mutex<Handles>) -> MutexGuard<'_, Handles> {
    handles.lock().unwrap_or_else(PoisonError::into_inner)
}

// Checks liveness with strong_count rather than upgrade: an upgraded handle
// dropped here could be the last one, and its Drop would re-enter the lock.
fn sweep(handles: &mut Handles) {
    let before = handles.len();
    handles.retain(|_, weak| weak.strong_count() > 0);
    let removed = before - handles.len();
    if removed > 0 {
        tracing::debug!(removed, remaining = handles.len(), "Swept registry");
    }
}

/// Resolve `path` to the absolute, symlink-free form used as registry key.
///
/// The file itself need not exist yet; its parent directory must.
pub fn canonical_path(path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let path = Path::new(path);
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return Some(resolved);
    }

    let file_name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::canonicalize(parent)
        .ok()
        .map(|dir| dir.join(file_name))
}
