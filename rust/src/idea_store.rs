use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, warn};

use crate::error::StoreError;

/// An idea as exposed over the API and to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaRecord {
    pub id: String,
    pub timestamp: String,
    pub domain: String,
    pub subdomain: String,
    pub missing_piece: String,
    pub text: String,
    pub tags: String,
}

/// Storage-boundary shape of an idea. `missing_piece` stays snake_case here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdea {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub timestamp: String,
    pub domain: String,
    pub subdomain: String,
    #[serde(alias = "missingPiece")]
    pub missing_piece: String,
    pub text: String,
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&IdeaRecord> for StoredIdea {
    fn from(record: &IdeaRecord) -> Self {
        Self {
            id: Some(record.id.clone()).filter(|id| !id.is_empty()),
            timestamp: record.timestamp.clone(),
            domain: record.domain.clone(),
            subdomain: record.subdomain.clone(),
            missing_piece: record.missing_piece.clone(),
            text: record.text.clone(),
            tags: record.tags.clone(),
            created_at: None,
        }
    }
}

impl From<StoredIdea> for IdeaRecord {
    fn from(row: StoredIdea) -> Self {
        Self {
            id: row.id.unwrap_or_else(|| row.timestamp.clone()),
            timestamp: row.timestamp,
            domain: row.domain,
            subdomain: row.subdomain,
            missing_piece: row.missing_piece,
            text: row.text,
            tags: row.tags,
        }
    }
}

#[async_trait]
pub trait IdeaStore: Send + Sync {
    async fn append(&self, record: &IdeaRecord) -> Result<(), StoreError>;

    /// All ideas, most recently created first.
    async fn fetch_all(&self) -> Result<Vec<IdeaRecord>, StoreError>;

    /// Like `fetch_all`, but an unreachable store reads as empty.
    async fn list(&self) -> Vec<IdeaRecord> {
        match self.fetch_all().await {
            Ok(ideas) => ideas,
            Err(err) => {
                warn!("failed to read ideas, returning empty list: {err}");
                Vec::new()
            }
        }
    }
}

/// Append-only record log kept as a JSON array, oldest first on disk.
pub struct JsonIdeaStore {
    ideas_json_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonIdeaStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir)?;
        let store = Self {
            ideas_json_path: data_dir.join("ideas.json"),
            lock: Mutex::new(()),
        };
        store.ensure_file()?;
        Ok(store)
    }

    pub fn ideas_json_path(&self) -> &Path {
        &self.ideas_json_path
    }

    fn ensure_file(&self) -> Result<(), StoreError> {
        if !self.ideas_json_path.exists() {
            fs::write(&self.ideas_json_path, "[]")?;
            return Ok(());
        }

        // Only an unreadable log is replaced; rows it holds are never rewritten.
        if let Err(err) = self.read_rows() {
            let now_tag = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let backup = self
                .ideas_json_path
                .with_file_name(format!("ideas.broken.{now_tag}.json"));
            error!(
                "idea log {} is unreadable ({err}); moving it to {}",
                self.ideas_json_path.display(),
                backup.display()
            );
            fs::rename(&self.ideas_json_path, backup)?;
            fs::write(&self.ideas_json_path, "[]")?;
        }
        Ok(())
    }

    fn read_rows(&self) -> Result<Vec<Value>, StoreError> {
        let raw_text = fs::read_to_string(&self.ideas_json_path)?;
        match serde_json::from_str::<Value>(&raw_text)? {
            Value::Array(rows) => Ok(rows),
            _ => Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("json is not an array: {}", self.ideas_json_path.display()),
            ))),
        }
    }

    fn write_rows(&self, rows: &[Value]) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(rows)?;
        let tmp_path = self.ideas_json_path.with_file_name("ideas.json.tmp");

        fs::write(&tmp_path, payload)?;
        if self.ideas_json_path.exists() {
            fs::remove_file(&self.ideas_json_path)?;
        }
        fs::rename(&tmp_path, &self.ideas_json_path)?;
        Ok(())
    }
}

/// Reads one stored row leniently: numeric ids become text and the camelCase
/// `missingPiece` key is accepted. Rows without text or timestamp are `None`.
pub(crate) fn stored_idea_from_value(mut row: Value) -> Option<StoredIdea> {
    if let Some(obj) = row.as_object_mut() {
        if let Some(id) = obj.get("id").and_then(value_to_text) {
            obj.insert("id".to_string(), Value::String(id));
        }
    }
    serde_json::from_value::<StoredIdea>(row)
        .ok()
        .filter(|idea| !idea.text.trim().is_empty() && !idea.timestamp.trim().is_empty())
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(v) => Some(v.clone()),
        Value::Number(v) => Some(v.to_string()),
        _ => None,
    }
}

#[async_trait]
impl IdeaStore for JsonIdeaStore {
    async fn append(&self, record: &IdeaRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Lock)?;
        let mut rows = self.read_rows()?;
        rows.push(serde_json::to_value(StoredIdea::from(record))?);
        self.write_rows(&rows)
    }

    async fn fetch_all(&self) -> Result<Vec<IdeaRecord>, StoreError> {
        let rows = {
            let _guard = self.lock.lock().map_err(|_| StoreError::Lock)?;
            self.read_rows()?
        };
        Ok(rows
            .into_iter()
            .rev()
            .filter_map(stored_idea_from_value)
            .map(IdeaRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{IdeaRecord, IdeaStore, JsonIdeaStore, StoredIdea};
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_FIXTURE_ID: AtomicU64 = AtomicU64::new(1);

    fn fixture_base() -> std::path::PathBuf {
        let mut base = std::env::temp_dir();
        let sequence = NEXT_FIXTURE_ID.fetch_add(1, Ordering::Relaxed);
        base.push(format!(
            "ideaforge_idea_store_test_{}_{}",
            std::process::id(),
            sequence
        ));
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).expect("mkdir fixture");
        base
    }

    fn record(id: &str, text: &str) -> IdeaRecord {
        IdeaRecord {
            id: id.to_string(),
            timestamp: "2026-10-18T12:00:00.000Z".to_string(),
            domain: "CRM".to_string(),
            subdomain: "Lead Management".to_string(),
            missing_piece: "AI-powered".to_string(),
            text: text.to_string(),
            tags: "(CRM) (Lead Management)".to_string(),
        }
    }

    #[tokio::test]
    async fn list_returns_most_recent_first() {
        let base = fixture_base();
        let store = JsonIdeaStore::new(base.clone()).expect("create store");

        store.append(&record("a", "A")).await.expect("append a");
        store.append(&record("b", "B")).await.expect("append b");
        store.append(&record("c", "C")).await.expect("append c");

        let texts: Vec<String> = store.list().await.into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["C", "B", "A"]);

        fs::remove_dir_all(base).ok();
    }

    #[tokio::test]
    async fn persists_missing_piece_in_snake_case() {
        let base = fixture_base();
        let store = JsonIdeaStore::new(base.clone()).expect("create store");
        store.append(&record("a", "A")).await.expect("append");

        let raw = fs::read_to_string(store.ideas_json_path()).expect("read log");
        assert!(raw.contains("\"missing_piece\""));
        assert!(!raw.contains("missingPiece"));

        let reopened = JsonIdeaStore::new(base.clone()).expect("reopen store");
        let ideas = reopened.fetch_all().await.expect("fetch");
        assert_eq!(ideas, vec![record("a", "A")]);

        fs::remove_dir_all(base).ok();
    }

    #[tokio::test]
    async fn broken_log_is_moved_aside() {
        let base = fixture_base();
        fs::write(base.join("ideas.json"), "{ not json").expect("fixture write");

        let store = JsonIdeaStore::new(base.clone()).expect("create store");
        assert!(store.fetch_all().await.expect("fetch").is_empty());

        let backups = fs::read_dir(&base)
            .expect("list base")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("ideas.broken."))
            .count();
        assert_eq!(backups, 1);

        fs::remove_dir_all(base).ok();
    }

    #[tokio::test]
    async fn skips_rows_without_text() {
        let base = fixture_base();
        fs::write(
            base.join("ideas.json"),
            r#"[
              {"timestamp": "t1", "domain": "CRM", "subdomain": "S", "missing_piece": "M", "text": "", "tags": ""},
              {"timestamp": "t2", "domain": "CRM", "subdomain": "S", "missing_piece": "M", "text": "kept", "tags": ""},
              "garbage"
            ]"#,
        )
        .expect("fixture write");

        let store = JsonIdeaStore::new(base.clone()).expect("create store");
        let ideas = store.fetch_all().await.expect("fetch");
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].text, "kept");
        assert_eq!(ideas[0].id, "t2", "id falls back to timestamp");

        fs::remove_dir_all(base).ok();
    }

    #[tokio::test]
    async fn opening_and_appending_keep_existing_rows_on_disk() {
        let base = fixture_base();
        fs::write(
            base.join("ideas.json"),
            r#"[
              {"id": 12, "timestamp": "t1", "domain": "CRM", "subdomain": "S", "missing_piece": "M", "text": "numeric id", "tags": ""},
              {"timestamp": "t2", "domain": "CRM", "subdomain": "S", "missingPiece": "M", "text": "camel row", "tags": ""},
              {"note": "unknown shape"}
            ]"#,
        )
        .expect("fixture write");

        let store = JsonIdeaStore::new(base.clone()).expect("create store");
        let on_disk = fs::read_to_string(store.ideas_json_path()).expect("read log");
        assert!(on_disk.contains("\"id\": 12"));
        assert!(on_disk.contains("missingPiece"));
        assert!(on_disk.contains("unknown shape"));

        let ideas = store.fetch_all().await.expect("fetch");
        let ids: Vec<&str> = ideas.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "12"]);
        assert_eq!(ideas[0].missing_piece, "M");

        store.append(&record("n", "new")).await.expect("append");
        let rows: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.ideas_json_path()).expect("read log"))
                .expect("parse log");
        let rows = rows.as_array().expect("array log");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["id"], 12);
        assert_eq!(rows[2]["note"], "unknown shape");
        assert_eq!(rows[3]["text"], "new");

        fs::remove_dir_all(base).ok();
    }

    #[tokio::test]
    async fn unreadable_store_lists_empty() {
        let base = fixture_base();
        let store = JsonIdeaStore::new(base.clone()).expect("create store");
        fs::remove_dir_all(&base).expect("remove base");

        assert!(store.fetch_all().await.is_err());
        assert!(store.list().await.is_empty());
    }

    #[test]
    fn record_round_trips_through_storage_shape() {
        let original = record("7", "text");
        let row = StoredIdea::from(&original);
        assert_eq!(row.missing_piece, "AI-powered");
        assert_eq!(IdeaRecord::from(row), original);

        let api = serde_json::to_value(&original).expect("serialize");
        assert_eq!(api["missingPiece"], "AI-powered");
    }
}
