use crate::error::{LedgerError, Result};
use crate::loader::load_ledger;
use crate::schema::LedgerLayout;
use crate::Ledger;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// What the cache compares to decide whether a source file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIdentity {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceIdentity {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|source| LedgerError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

struct CachedLedger {
    identity: SourceIdentity,
    layout: LedgerLayout,
    ledger: Arc<Ledger>,
    /// Paths as callers supplied them, so an entry can be dropped after the
    /// file is gone and its canonical form no longer resolves.
    requested_as: HashSet<PathBuf>,
}

/// Loaded ledgers keyed by canonical source path.
///
/// An entry is reused while the file's identity and the requested layout
/// are unchanged; anything else triggers a fresh load.
#[derive(Default)]
pub struct LedgerCache {
    entries: HashMap<PathBuf, CachedLedger>,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: impl AsRef<Path>, layout: &LedgerLayout) -> Result<Arc<Ledger>> {
        let path = path.as_ref();
        let key = path
            .canonicalize()
            .map_err(|source| LedgerError::SourceNotFound {
                path: path.to_path_buf(),
                source,
            })?;
        let identity = SourceIdentity::of(&key)?;

        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.identity == identity && entry.layout == *layout {
                debug!("Ledger cache hit for {}", key.display());
                entry.requested_as.insert(path.to_path_buf());
                return Ok(Arc::clone(&entry.ledger));
            }
            debug!("Ledger source {} changed; reloading", key.display());
        } else {
            debug!("Ledger cache miss for {}", key.display());
        }

        let ledger = Arc::new(load_ledger(&key, layout)?);
        let mut requested_as = self
            .entries
            .remove(&key)
            .map(|previous| previous.requested_as)
            .unwrap_or_default();
        requested_as.insert(path.to_path_buf());

        self.entries.insert(
            key,
            CachedLedger {
                identity,
                layout: layout.clone(),
                ledger: Arc::clone(&ledger),
                requested_as,
            },
        );

        Ok(ledger)
    }

    /// Drops the cached ledger for `path`. Returns whether an entry existed.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if let Ok(key) = path.canonicalize() {
            if self.entries.remove(&key).is_some() {
                return true;
            }
        }

        let before = self.entries.len();
        self.entries
            .retain(|key, entry| key != path && !entry.requested_as.contains(path));
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LEDGER: &str = ",\"Jan 1, 24\",TOTAL\nTotal Income,100,100\n";

    fn write_source(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("Fiscal_Y2D.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_second_load_reuses_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, LEDGER);
        let mut cache = LedgerCache::new();

        let first = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();
        let second = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_source_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, LEDGER);
        let mut cache = LedgerCache::new();

        let first = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();
        write_source(&dir, ",\"Jan 1, 24\",TOTAL\nTotal Income,12345,12345\n");
        let second = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.rows[0].fields.get("Total Income"), Some(&Some(12345.0)));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, LEDGER);
        let mut cache = LedgerCache::new();

        let first = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();
        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&path));

        let second = cache.get_or_load(&path, &LedgerLayout::default()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_invalidate_after_source_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let real = write_source(&dir, LEDGER);
        let indirect = dir.path().join("sub").join("..").join("Fiscal_Y2D.csv");
        let mut cache = LedgerCache::new();

        cache.get_or_load(&indirect, &LedgerLayout::default()).unwrap();
        std::fs::remove_file(&real).unwrap();

        assert!(cache.invalidate(&indirect));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_any_requested_path_after_removal() {
        let dir = tempfile::tempdir().unwrap();
        let real = write_source(&dir, LEDGER);
        let indirect = dir.path().join(".").join("Fiscal_Y2D.csv");
        let mut cache = LedgerCache::new();

        cache.get_or_load(&real, &LedgerLayout::default()).unwrap();
        cache.get_or_load(&indirect, &LedgerLayout::default()).unwrap();
        assert_eq!(cache.len(), 1);
        std::fs::remove_file(&real).unwrap();

        assert!(cache.invalidate(&indirect));
        assert!(!cache.invalidate(&real));
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = LedgerCache::new();
        let err = cache
            .get_or_load(dir.path().join("absent.csv"), &LedgerLayout::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::SourceNotFound { .. }));
        assert!(cache.is_empty());
    }
}
