//! Write-once snapshots of parsed logs.
//!
//! A snapshot sits next to its source with the same base name and is
//! trusted whenever it exists. Delete it to force a re-parse.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Result, VizError};
use crate::reader::read_log;
use crate::schema::SourceKind;
use crate::table::TimeSeriesLog;

pub const ARTIFACT_EXTENSION: &str = "snapshot";

pub fn artifact_path(source: &Path) -> PathBuf {
    source.with_extension(ARTIFACT_EXTENSION)
}

pub trait TableCache {
    fn get(&self, key: &Path) -> Result<Option<TimeSeriesLog>>;
    fn put(&self, key: &Path, log: &TimeSeriesLog) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ArtifactCache;

impl TableCache for ArtifactCache {
    fn get(&self, key: &Path) -> Result<Option<TimeSeriesLog>> {
        let path = artifact_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        info!("Processing archive \"{}\"", path.display());
        let file = File::open(&path).map_err(|e| VizError::io(&path, e))?;
        let log = bincode::deserialize_from(BufReader::new(file)).map_err(|e| VizError::Cache {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(log))
    }

    fn put(&self, key: &Path, log: &TimeSeriesLog) -> Result<()> {
        let path = artifact_path(key);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let cache_err = |reason: String| VizError::Cache {
            path: path.clone(),
            reason,
        };
        // staged beside the target, then renamed over it
        let staging = NamedTempFile::new_in(&dir).map_err(|e| VizError::io(&dir, e))?;
        let mut writer = BufWriter::new(staging);
        bincode::serialize_into(&mut writer, log).map_err(|e| cache_err(e.to_string()))?;
        let staging = writer
            .into_inner()
            .map_err(|e| cache_err(e.into_error().to_string()))?;
        staging
            .as_file()
            .sync_all()
            .map_err(|e| VizError::io(staging.path(), e))?;
        staging
            .persist(&path)
            .map_err(|e| cache_err(e.error.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<PathBuf, TimeSeriesLog>>,
}

impl MemoryCache {
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl TableCache for MemoryCache {
    fn get(&self, key: &Path) -> Result<Option<TimeSeriesLog>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &Path, log: &TimeSeriesLog) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_path_buf(), log.clone());
        Ok(())
    }
}

pub struct CachedReader<C> {
    cache: C,
}

impl<C: TableCache> CachedReader<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn load(&self, path: &Path, kind: SourceKind) -> Result<TimeSeriesLog> {
        let log = self.load_with(path, |p| read_log(p, kind))?;
        if log.kind() != kind {
            return Err(VizError::Cache {
                path: artifact_path(path),
                reason: format!(
                    "holds a {} log, expected {}",
                    log.kind().label(),
                    kind.label()
                ),
            });
        }
        Ok(log)
    }

    /// Returns the cached table for `path`, or parses it with `parse` and
    /// stores the result before returning it.
    pub fn load_with<F>(&self, path: &Path, parse: F) -> Result<TimeSeriesLog>
    where
        F: FnOnce(&Path) -> Result<TimeSeriesLog>,
    {
        if let Some(log) = self.cache.get(path)? {
            return Ok(log);
        }
        let log = parse(path)?;
        self.cache.put(path, &log)?;
        Ok(log)
    }
}

impl Default for CachedReader<ArtifactCache> {
    fn default() -> Self {
        Self::new(ArtifactCache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn artifact_swaps_extension() {
        assert_eq!(
            artifact_path(Path::new("output/node.json")),
            PathBuf::from("output/node.snapshot")
        );
    }

    #[test]
    fn memory_cache_parses_once() {
        let reader = CachedReader::new(MemoryCache::default());
        let parses = Cell::new(0);
        let parse = |_: &Path| {
            parses.set(parses.get() + 1);
            Ok(TimeSeriesLog::new(SourceKind::Measurement))
        };
        let first = reader.load_with(Path::new("a.json"), parse).unwrap();
        let second = reader.load_with(Path::new("a.json"), parse).unwrap();
        assert_eq!(first, second);
        assert_eq!(parses.get(), 1);
        assert_eq!(reader.cache().len(), 1);
    }

    #[test]
    fn parse_failure_is_not_cached() {
        let reader = CachedReader::new(MemoryCache::default());
        let result = reader.load_with(Path::new("bad.json"), |_| {
            Err(VizError::malformed("truncated"))
        });
        assert!(result.is_err());
        assert!(reader.cache().is_empty());
    }

    #[test]
    fn snapshot_is_stored_beside_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("measurement.json");
        let log = TimeSeriesLog::new(SourceKind::Measurement);
        ArtifactCache.put(&source, &log).unwrap();
        assert_eq!(ArtifactCache.get(&source).unwrap(), Some(log));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn corrupt_snapshot_is_a_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("measurement.json");
        std::fs::write(artifact_path(&source), b"\xff\xff\xff\xffnot a snapshot").unwrap();
        let reader = CachedReader::default();
        assert!(matches!(
            reader.load(&source, SourceKind::Measurement),
            Err(VizError::Cache { .. })
        ));
    }

    #[test]
    fn cached_kind_must_match() {
        let cache = MemoryCache::default();
        cache
            .put(Path::new("c.json"), &TimeSeriesLog::new(SourceKind::Channel))
            .unwrap();
        let reader = CachedReader::new(cache);
        assert!(matches!(
            reader.load(Path::new("c.json"), SourceKind::Measurement),
            Err(VizError::Cache { .. })
        ));
    }
}
