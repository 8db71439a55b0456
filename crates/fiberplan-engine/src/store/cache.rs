//! Local fallback cache for the serialized diagram list.

use std::fs;
use std::path::{Path, PathBuf};

use fiberplan_types::DiagramRecord;

use super::CacheError;

/// Keyed local store of the last known diagram list
pub trait FallbackCache {
    /// Read the cached list, `None` if nothing was ever written
    fn load(&self) -> Result<Option<Vec<DiagramRecord>>, CacheError>;

    /// Replace the cached list
    fn save(&mut self, records: &[DiagramRecord]) -> Result<(), CacheError>;
}

/// Cache stored as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FallbackCache for FileCache {
    fn load(&self) -> Result<Option<Vec<DiagramRecord>>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&mut self, records: &[DiagramRecord]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(records)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-memory cache, counts writes
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    records: Option<Vec<DiagramRecord>>,
    saves: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DiagramRecord>) -> Self {
        Self {
            records: Some(records),
            saves: 0,
        }
    }

    pub fn records(&self) -> Option<&[DiagramRecord]> {
        self.records.as_deref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl FallbackCache for MemoryCache {
    fn load(&self) -> Result<Option<Vec<DiagramRecord>>, CacheError> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[DiagramRecord]) -> Result<(), CacheError> {
        self.records = Some(records.to_vec());
        self.saves += 1;
        Ok(())
    }
}
