//! The storage collaborator interface and local implementations.
//!
//! The pipeline consumes storage through the narrow [`CardStore`] trait —
//! upload two image artifacts, persist one metadata row, list and fetch
//! rows. A production deployment plugs in its blob/table backend behind
//! this trait; the crate ships two local implementations:
//!
//! * [`FsStore`] — images and per-card JSON documents under a root
//!   directory; what the CLI uses.
//! * [`MemoryStore`] — everything in memory; for tests and demos.

use crate::card::{CardRecord, ExtractionMethod};
use crate::error::CardScanError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// The persisted metadata handle for one processed card.
///
/// A flattened summary of the [`CardRecord`] plus the artifact URLs —
/// what a collection listing needs without re-reading full records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMetadata {
    /// Unique row id.
    pub id: String,
    /// Display name (English, else Japanese, else `Unknown`).
    pub card_name: String,
    pub card_name_japanese: Option<String>,
    pub card_name_english: Option<String>,
    pub original_image_url: String,
    pub translated_image_url: String,
    pub card_type: Option<String>,
    pub color: Option<String>,
    pub cost: Option<u32>,
    pub power: Option<u32>,
    pub rarity: Option<String>,
    pub set_code: Option<String>,
    pub collector_number: Option<String>,
    pub analysis_method: ExtractionMethod,
    /// Headline confidence — the name-group score from the record.
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl CardMetadata {
    /// Build the metadata row for a record and its uploaded artifacts.
    pub fn from_record(card: &CardRecord, original_url: &str, translated_url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            card_name: card.display_name().to_string(),
            card_name_japanese: card.name_japanese.clone(),
            card_name_english: card.name_english.clone(),
            original_image_url: original_url.to_string(),
            translated_image_url: translated_url.to_string(),
            card_type: card.card_type.clone(),
            color: card.color.clone(),
            cost: card.cost,
            power: card.power,
            rarity: card.rarity.clone(),
            set_code: card.set_code.clone(),
            collector_number: card.collector_number.clone(),
            analysis_method: card.extraction_method,
            confidence: card.confidences.name,
            created_at: Utc::now(),
        }
    }
}

/// Narrow upload/persist interface the pipeline drives.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Upload an image artifact and return its URL.
    async fn upload_image(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String, CardScanError>;

    /// Persist a metadata row for a processed card.
    async fn store_metadata(
        &self,
        card: &CardRecord,
        original_url: &str,
        translated_url: &str,
    ) -> Result<CardMetadata, CardScanError>;

    /// All stored rows, most recent first.
    async fn list_metadata(&self) -> Result<Vec<CardMetadata>, CardScanError>;

    /// One row by id, or `None` when absent.
    async fn get_metadata(&self, id: &str) -> Result<Option<CardMetadata>, CardScanError>;
}

// ── Filesystem store ─────────────────────────────────────────────────────

/// Stores images under `<root>/images/` and metadata documents under
/// `<root>/cards/<id>.json`.
///
/// Upload filenames are prefixed with a timestamp and a UUID so repeated
/// runs never collide.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }
}

#[async_trait]
impl CardStore for FsStore {
    async fn upload_image(
        &self,
        bytes: &[u8],
        filename: &str,
        _content_type: &str,
    ) -> Result<String, CardScanError> {
        let dir = self.images_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CardScanError::Upload {
                filename: filename.to_string(),
                detail: e.to_string(),
            })?;

        let unique = format!(
            "{}_{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4(),
            filename
        );
        let path = dir.join(&unique);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CardScanError::Upload {
                filename: filename.to_string(),
                detail: e.to_string(),
            })?;

        debug!("fs store: wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    async fn store_metadata(
        &self,
        card: &CardRecord,
        original_url: &str,
        translated_url: &str,
    ) -> Result<CardMetadata, CardScanError> {
        let metadata = CardMetadata::from_record(card, original_url, translated_url);
        let dir = self.cards_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CardScanError::Persist {
                detail: e.to_string(),
            })?;

        let json =
            serde_json::to_string_pretty(&metadata).map_err(|e| CardScanError::Persist {
                detail: e.to_string(),
            })?;
        tokio::fs::write(dir.join(format!("{}.json", metadata.id)), json)
            .await
            .map_err(|e| CardScanError::Persist {
                detail: e.to_string(),
            })?;

        Ok(metadata)
    }

    async fn list_metadata(&self) -> Result<Vec<CardMetadata>, CardScanError> {
        let dir = self.cards_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| CardScanError::Persist {
                detail: e.to_string(),
            })?;

        let mut rows = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CardScanError::Persist {
                detail: e.to_string(),
            })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let text =
                    tokio::fs::read_to_string(&path)
                        .await
                        .map_err(|e| CardScanError::Persist {
                            detail: e.to_string(),
                        })?;
                match serde_json::from_str::<CardMetadata>(&text) {
                    Ok(row) => rows.push(row),
                    // A corrupt document should not hide the rest of the
                    // collection.
                    Err(e) => debug!("fs store: skipping {}: {e}", path.display()),
                }
            }
        }

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<CardMetadata>, CardScanError> {
        let path = self.cards_dir().join(format!("{id}.json"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| CardScanError::Persist {
                    detail: e.to_string(),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CardScanError::Persist {
                detail: e.to_string(),
            }),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

/// An in-memory [`CardStore`] for tests and demos.
///
/// Upload URLs are synthetic (`memory://images/<n>/<filename>`); uploaded
/// bytes and stored rows can be inspected afterwards.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    uploads: Vec<(String, Vec<u8>)>,
    rows: Vec<CardMetadata>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images uploaded so far.
    pub fn upload_count(&self) -> usize {
        self.inner.lock().expect("store lock").uploads.len()
    }

    /// Uploaded bytes by URL, if present.
    pub fn uploaded_bytes(&self, url: &str) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .expect("store lock")
            .uploads
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn upload_image(
        &self,
        bytes: &[u8],
        filename: &str,
        _content_type: &str,
    ) -> Result<String, CardScanError> {
        let mut inner = self.inner.lock().expect("store lock");
        let url = format!("memory://images/{}/{filename}", inner.uploads.len());
        inner.uploads.push((url.clone(), bytes.to_vec()));
        Ok(url)
    }

    async fn store_metadata(
        &self,
        card: &CardRecord,
        original_url: &str,
        translated_url: &str,
    ) -> Result<CardMetadata, CardScanError> {
        let metadata = CardMetadata::from_record(card, original_url, translated_url);
        self.inner
            .lock()
            .expect("store lock")
            .rows
            .push(metadata.clone());
        Ok(metadata)
    }

    async fn list_metadata(&self) -> Result<Vec<CardMetadata>, CardScanError> {
        let mut rows = self.inner.lock().expect("store lock").rows.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<CardMetadata>, CardScanError> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card() -> CardRecord {
        CardRecord {
            name_english: Some("Roronoa Zoro".into()),
            cost: Some(3),
            ..CardRecord::default()
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let original = store
            .upload_image(b"orig", "original.jpg", "image/jpeg")
            .await
            .unwrap();
        let translated = store
            .upload_image(b"trans", "translated.png", "image/png")
            .await
            .unwrap();
        let row = store
            .store_metadata(&sample_card(), &original, &translated)
            .await
            .unwrap();

        assert_eq!(store.upload_count(), 2);
        assert_eq!(store.uploaded_bytes(&original).as_deref(), Some(&b"orig"[..]));
        assert_eq!(row.card_name, "Roronoa Zoro");
        assert_eq!(
            store.get_metadata(&row.id).await.unwrap().map(|r| r.id),
            Some(row.id.clone())
        );
        assert!(store.get_metadata("missing").await.unwrap().is_none());
        assert_eq!(store.list_metadata().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fs_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());

        let url = store
            .upload_image(b"jpeg bytes", "original.jpg", "image/jpeg")
            .await
            .unwrap();
        assert!(url.contains("original.jpg"));
        assert_eq!(tokio::fs::read(&url).await.unwrap(), b"jpeg bytes");

        let row = store
            .store_metadata(&sample_card(), &url, "t.png")
            .await
            .unwrap();
        let fetched = store.get_metadata(&row.id).await.unwrap();
        assert_eq!(fetched, Some(row.clone()));

        let listed = store.list_metadata().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, row.id);
    }

    #[tokio::test]
    async fn fs_store_lists_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());
        let first = store
            .store_metadata(&sample_card(), "o1", "t1")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store
            .store_metadata(&sample_card(), "o2", "t2")
            .await
            .unwrap();

        let listed = store.list_metadata().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
