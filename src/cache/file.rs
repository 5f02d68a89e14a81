/// File-backed cache slot (`~/.pollen-gauge/cache.json`).
///
/// Reads are best-effort: a missing, truncated or outdated file reads as an
/// empty slot so a bad cache can never block a fetch. Writes go through a
/// temporary file and a rename so a reader never sees a half-written entry.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::CacheStore;
use crate::model::CachedResponse;

#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Cache stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache stored at `~/.pollen-gauge/cache.json`, if a home directory exists.
    pub fn default_location() -> Option<Self> {
        default_cache_path().map(Self::at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl CacheStore for FileCache {
    fn read(&self) -> Option<CachedResponse> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write(&mut self, entry: &CachedResponse) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string(entry).context("failed to serialize cache entry")?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Path to the persisted cache slot.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pollen-gauge").join("cache.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryData, CategorySeries, Interval, RequestKey};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pollen-gauge-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_entry() -> CachedResponse {
        CachedResponse {
            fetched_at: Utc.with_ymd_and_hms(2024, 9, 12, 14, 5, 0).unwrap(),
            request: RequestKey {
                date: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
                interval: Interval::Hour,
                categories: vec!["POL".to_string(), "GRA".to_string()],
            },
            payload: CategoryData {
                moments: vec![
                    "2024-09-12T13:00:00Z".to_string(),
                    "2024-09-12T14:00:00Z".to_string(),
                ],
                categories: vec![
                    Some(CategorySeries {
                        code: "POL".to_string(),
                        description: "Pollen".to_string(),
                        ppm_values: vec![Some(12.25), None],
                        misery_values: Some(vec![Some(0.375), None]),
                    }),
                    None,
                ],
            },
        }
    }

    #[test]
    fn write_then_read_is_identical() {
        let dir = scratch_dir("roundtrip");
        let mut cache = FileCache::at(dir.join("nested").join("cache.json"));
        let entry = sample_entry();

        cache.write(&entry).unwrap();
        let back = cache.read().unwrap();
        assert_eq!(back.payload.moments, entry.payload.moments);
        assert_eq!(back.payload.categories, entry.payload.categories);
        assert_eq!(back.fetched_at, entry.fetched_at);
        assert!(!cache.temp_path().exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = FileCache::at(&path);
        assert!(cache.read().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = scratch_dir("clear");
        let mut cache = FileCache::at(dir.join("cache.json"));
        cache.clear().unwrap();

        cache.write(&sample_entry()).unwrap();
        cache.clear().unwrap();
        assert!(cache.read().is_none());
        cache.clear().unwrap();

        let _ = fs::remove_dir_all(dir);
    }
}
