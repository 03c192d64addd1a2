//! seen.rs — dedup record of news items that reached the primary platform.
//!
//! Ids are kept in insertion order and persisted as JSON after every mark
//! (temp file + rename), so a restart never re-posts an item. The oldest ids
//! are evicted once the store grows past its capacity.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEEN_STATE_PATH: &str = "state/seen_items.json";
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenFile {
    ids: Vec<String>,
}

#[derive(Debug)]
pub struct SeenStore {
    ids: HashSet<String>,
    order: VecDeque<String>,
    cap: usize,
    path: Option<PathBuf>,
}

impl SeenStore {
    /// Store without persistence (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            cap: DEFAULT_SEEN_CAPACITY,
            path: None,
        }
    }

    /// Load from `path`. A missing file yields an empty store; an unreadable or
    /// corrupt file is an error, since starting empty could re-post everything.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "no seen-set on disk, starting empty");
            return Ok(store);
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading seen-set from {}", path.display()))?;
        let file: SeenFile = serde_json::from_str(&data)
            .with_context(|| format!("parsing seen-set {}", path.display()))?;
        for id in file.ids {
            store.insert(id);
        }
        tracing::info!(path = %path.display(), count = store.len(), "seen-set loaded");
        Ok(store)
    }

    pub fn with_capacity(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self.evict();
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Ids oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Record `id` and persist. The in-memory mark survives a failed write;
    /// returns whether the id was new.
    pub fn mark_seen(&mut self, id: &str) -> Result<bool> {
        if self.ids.contains(id) {
            return Ok(false);
        }
        self.insert(id.to_string());
        self.persist()?;
        Ok(true)
    }

    fn insert(&mut self, id: String) {
        if self.ids.insert(id.clone()) {
            self.order.push_back(id);
            self.evict();
        }
    }

    fn evict(&mut self) {
        while self.order.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let file = SeenFile {
            ids: self.order.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).context("serializing seen-set")?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())
            .with_context(|| format!("writing {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_is_idempotent() {
        let mut s = SeenStore::in_memory();
        assert!(s.mark_seen("a").unwrap());
        assert!(!s.mark_seen("a").unwrap());
        assert_eq!(s.len(), 1);
        assert!(s.contains("a"));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut s = SeenStore::in_memory().with_capacity(2);
        s.mark_seen("a").unwrap();
        s.mark_seen("b").unwrap();
        s.mark_seen("c").unwrap();
        assert!(!s.contains("a"));
        assert_eq!(s.ids().collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
