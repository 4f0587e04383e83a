// src/output.rs
//! Persisting the site's JSON files and the seen-set cache.
//!
//! Write order is fixed: every category file, then the combined file, then
//! the cache. A failure anywhere stops before the cache is touched, so the
//! next run re-processes rather than silently losing items.

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::aggregate::Snapshot;
use crate::dedup::SeenSet;
use crate::model::{Category, NewsItem};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Pretty JSON to `<path>.tmp`, then rename over `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| PersistenceError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
    f.write_all(&json).map_err(|e| PersistenceError::io(&tmp, e))?;
    f.write_all(b"\n").map_err(|e| PersistenceError::io(&tmp, e))?;
    f.sync_all().map_err(|e| PersistenceError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}

/// File layout under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub combined_file: String,
    pub cache_file: String,
}

impl OutputLayout {
    pub fn from_config(cfg: &crate::config::pipeline::PipelineConfig) -> Self {
        Self {
            dir: cfg.output_dir.clone(),
            combined_file: cfg.combined_file.clone(),
            cache_file: cfg.cache_file.clone(),
        }
    }

    pub fn category_path(&self, c: Category) -> PathBuf {
        self.dir.join(format!("{}.json", c.slug()))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.dir.join(&self.combined_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(&self.cache_file)
    }

    /// Previously written items of one category. Missing files count as
    /// empty silently; unreadable or malformed ones count as empty with a
    /// warning, since the retained items are about to be overwritten.
    pub fn load_previous(&self, c: Category) -> Vec<NewsItem> {
        let path = self.category_path(c);
        match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "ignoring malformed category file");
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "ignoring unreadable category file");
                Vec::new()
            }
        }
    }

    pub fn load_seen(&self) -> Result<SeenSet, PersistenceError> {
        SeenSet::load(&self.cache_path())
    }

    /// Categories, then combined, then the cache.
    pub fn persist(&self, snapshot: &Snapshot, seen: &SeenSet) -> Result<(), PersistenceError> {
        for c in Category::ALL {
            let items = snapshot.buckets.get(&c).map(Vec::as_slice).unwrap_or(&[]);
            write_json_atomic(&self.category_path(c), items)?;
        }
        write_json_atomic(&self.combined_path(), &snapshot.combined)?;
        seen.save(&self.cache_path())?;
        tracing::info!(
            dir = %self.dir.display(),
            combined = snapshot.combined.len(),
            cache = seen.len(),
            "output persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::fingerprint_parts;

    fn layout(dir: &Path) -> OutputLayout {
        OutputLayout {
            dir: dir.to_path_buf(),
            combined_file: "canada-news.json".into(),
            cache_file: "news_cache.json".into(),
        }
    }

    #[test]
    fn persist_writes_every_shard_and_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let out = layout(tmp.path());
        let mut seen = SeenSet::new();
        seen.insert(fingerprint_parts("t", "l"));

        out.persist(&Snapshot::default(), &seen).unwrap();

        for c in Category::ALL {
            let s = fs::read_to_string(out.category_path(c)).unwrap();
            let v: Vec<NewsItem> = serde_json::from_str(&s).unwrap();
            assert!(v.is_empty());
        }
        assert!(tmp.path().join("politics.json").exists());
        assert!(out.combined_path().exists());
        assert_eq!(SeenSet::load(&out.cache_path()).unwrap().len(), 1);
        assert!(!tmp.path().join("news_cache.json.tmp").exists());
    }

    #[test]
    fn cache_untouched_when_a_shard_cannot_be_written() {
        let tmp = tempfile::tempdir().unwrap();
        let out = layout(tmp.path());

        let mut old = SeenSet::new();
        old.insert(fingerprint_parts("old", "l"));
        old.save(&out.cache_path()).unwrap();

        // A directory where the shard file should go makes the rename fail.
        fs::create_dir_all(out.category_path(Category::Sports)).unwrap();

        let mut new_seen = old.clone();
        new_seen.insert(fingerprint_parts("new", "l"));
        let err = out.persist(&Snapshot::default(), &new_seen).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
        assert_eq!(SeenSet::load(&out.cache_path()).unwrap(), old);
    }

    #[derive(Clone, Default)]
    struct LogBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, b: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(b);
            Ok(b.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let buf = LogBuf::default();
        let w = buf.clone();
        let sub = tracing_subscriber::fmt()
            .with_writer(move || w.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(sub, f);
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn unreadable_previous_file_warns_missing_one_does_not() {
        let tmp = tempfile::tempdir().unwrap();
        let out = layout(tmp.path());
        // Reading a directory fails with something other than NotFound.
        fs::create_dir_all(out.category_path(Category::Business)).unwrap();

        let logs = capture_logs(|| {
            assert!(out.load_previous(Category::Business).is_empty());
        });
        assert!(logs.contains("ignoring unreadable category file"), "{logs}");
        assert!(logs.contains("business.json"), "{logs}");

        let logs = capture_logs(|| {
            assert!(out.load_previous(Category::Weather).is_empty());
        });
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn garbage_previous_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let out = layout(tmp.path());
        fs::write(out.category_path(Category::General), "nope").unwrap();
        assert!(out.load_previous(Category::General).is_empty());
        assert!(out.load_previous(Category::Weather).is_empty());
    }
}
