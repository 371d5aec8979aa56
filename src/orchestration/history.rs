// History store - keyed local persistence of completed batches

use super::types::HistoryEntry;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

const ENTRY_EXTENSION: &str = "json";

/// Directory-backed collection of history entries, one JSON document per
/// entry, keyed by entry id. All operations are best-effort.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/lookbook/history`
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("lookbook").join("history"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an entry. Failures are logged and swallowed.
    pub async fn save(&self, entry: &HistoryEntry) {
        match self.try_save(entry).await {
            Ok(path) => tracing::info!(
                "Saved history entry {} ({} images) to {}",
                entry.id,
                entry.images.len(),
                path.display()
            ),
            Err(e) => tracing::error!("History save failed for entry {}: {}", entry.id, e),
        }
    }

    /// All entries, most recent first. Returns an empty list when the store
    /// cannot be opened.
    pub async fn load_all(&self) -> Vec<HistoryEntry> {
        match self.try_load_all().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("History load failed from {}: {}", self.root.display(), e);
                Vec::new()
            }
        }
    }

    async fn try_save(&self, entry: &HistoryEntry) -> Result<PathBuf, HistoryError> {
        let path = self.entry_path(&entry.id)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write to a sibling temp file, then rename over the target
        let tmp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(entry)?;
        tokio::fs::write(&tmp_path, contents).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(path)
    }

    async fn try_load_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = dir.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            match read_entry(&path).await {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable history file {}: {}", path.display(), e),
            }
        }

        sort_by_recency(&mut entries);
        Ok(entries)
    }

    fn entry_path(&self, id: &str) -> Result<PathBuf, HistoryError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(HistoryError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, ENTRY_EXTENSION)))
    }
}

async fn read_entry(path: &Path) -> Result<HistoryEntry, HistoryError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Most recent first; equal keys fall back to the id text so a single load
/// is deterministic
fn sort_by_recency(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        Reverse(a.recency())
            .cmp(&Reverse(b.recency()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Debug, thiserror::Error)]
enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid entry id: {0:?}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::{AspectRatio, GarmentDescriptor, GeneratedItem};

    fn entry(id: &str) -> HistoryEntry {
        let garment = GarmentDescriptor::new("Kente", "Kumasi");
        let mut item = GeneratedItem::pending(&garment, "prompt".into(), AspectRatio::Square, 1);
        item.mark_loading();
        item.mark_success("data:image/jpeg;base64,AAAA".into());
        HistoryEntry {
            id: id.to_string(),
            date: "2026-10-19".to_string(),
            images: vec![item],
        }
    }

    #[tokio::test]
    async fn test_load_all_orders_by_recency() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"));

        for id in ["100", "300", "200"] {
            store.save(&entry(id)).await;
        }

        let ids: Vec<String> = store.load_all().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["300", "200", "100"]);
    }

    #[tokio::test]
    async fn test_numeric_not_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        for id in ["9", "10", "1000"] {
            store.save(&entry(id)).await;
        }

        let ids: Vec<String> = store.load_all().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["1000", "10", "9"]);
    }

    #[tokio::test]
    async fn test_round_trips_entry_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        let original = entry("1700000000000");

        store.save(&original).await;
        assert_eq!(store.load_all().await, vec![original]);
    }

    #[tokio::test]
    async fn test_missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("never-created"));
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_root_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = HistoryStore::new(&blocker);
        store.save(&entry("100")).await;
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store.save(&entry("100")).await;
        std::fs::write(dir.path().join("200.json"), b"{ truncated").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let ids: Vec<String> = store.load_all().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["100"]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"));
        store.save(&entry("../escape")).await;

        assert!(store.load_all().await.is_empty());
        assert!(!dir.path().join("escape.json").exists());
    }
}
