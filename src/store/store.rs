use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::types::{
    JsonMap, KnowledgeChunk, MetricsLogEntry, RecommendationRecord, RecommendationStatus,
};
use crate::telemetry::TelemetrySnapshot;

const LOG_DIR: &str = "logs";
const RECOMMENDATIONS_DIR: &str = "recommendations";
const KNOWLEDGE_DIR: &str = "knowledge_base";
const METRICS_LOG_FILE: &str = "system_metrics.jsonl";

const RECOMMENDATION_PREFIX: &str = "recommendation_";
const CHUNK_PREFIX: &str = "kb_chunk_";
const DOC_SUFFIX: &str = ".json";

/// Upper bound on `-N` suffixes tried for one creation second.
const MAX_ID_SUFFIX: u32 = 10_000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("recommendation {0} not found")]
    NotFound(String),

    #[error("invalid record id '{0}'")]
    InvalidId(String),
}

/// Flat-file store for the metrics log, recommendation documents and
/// knowledge chunks.
///
/// The store keeps no cache; every read goes to disk. Updates are
/// read-modify-write without locking, so concurrent writers to the same id
/// resolve as last-writer-wins.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
    log_file: PathBuf,
    recommendations_dir: PathBuf,
    knowledge_dir: PathBuf,
}

impl RecordStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let log_dir = root.join(LOG_DIR);
        let recommendations_dir = root.join(RECOMMENDATIONS_DIR);
        let knowledge_dir = root.join(KNOWLEDGE_DIR);

        fs::create_dir_all(&log_dir)?;
        fs::create_dir_all(&recommendations_dir)?;
        fs::create_dir_all(&knowledge_dir)?;

        info!("Record store opened at {}", root.display());
        Ok(Self {
            log_file: log_dir.join(METRICS_LOG_FILE),
            root,
            recommendations_dir,
            knowledge_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metrics_log_path(&self) -> &Path {
        &self.log_file
    }

    pub fn recommendations_dir(&self) -> &Path {
        &self.recommendations_dir
    }

    // --- Metrics log ---

    /// Append one entry as a single newline-terminated line.
    pub fn append_metrics(
        &self,
        snapshot: &TelemetrySnapshot,
        context: Option<JsonMap>,
    ) -> Result<(), StoreError> {
        let entry = MetricsLogEntry {
            timestamp: Utc::now(),
            metrics: snapshot.clone(),
            context: context.unwrap_or_default(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        // One write per entry: readers see a whole line or nothing.
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// All log entries in file order. Unparsable lines are skipped.
    pub fn read_metrics_log(&self) -> Result<Vec<MetricsLogEntry>, StoreError> {
        let file = match File::open(&self.log_file) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        // Raw bytes: a line that is not UTF-8 is skipped like any other bad line.
        for (lineno, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping metrics log line {}: {}", lineno + 1, e),
            }
        }
        Ok(entries)
    }

    // --- Recommendations ---

    /// Persist a new recommendation in `PENDING_USER_APPLY`.
    ///
    /// The id is the creation second (`YYYYMMDDHHMMSS`); when that id is taken
    /// a `-N` suffix is added. The file is created with create-new semantics,
    /// so an existing record is never overwritten.
    pub fn create_recommendation(
        &self,
        text: &str,
        snapshot: &TelemetrySnapshot,
        goal: &str,
        algorithm: &str,
    ) -> Result<RecommendationRecord, StoreError> {
        let created_at = Utc::now();
        let (id, path, file) = self.claim_id(
            &self.recommendations_dir,
            RECOMMENDATION_PREFIX,
            &created_at.format("%Y%m%d%H%M%S").to_string(),
        )?;

        let record = RecommendationRecord {
            id,
            timestamp: created_at,
            user_goal: goal.to_string(),
            mining_algorithm: algorithm.to_string(),
            system_snapshot_at_recommendation: snapshot.clone(),
            llm_recommendation_text: text.to_string(),
            applied_status: RecommendationStatus::PendingUserApply,
            actual_performance_after_apply: JsonMap::new(),
            user_notes: None,
            last_updated: None,
        };

        let json = serde_json::to_string_pretty(&record)?;
        fill_claimed(file, &path, &json)?;

        info!("Recommendation {} saved", record.id);
        Ok(record)
    }

    /// Record the user's outcome for a recommendation.
    ///
    /// `actual_metrics` replaces the stored mapping only when non-empty;
    /// `notes` replaces the stored notes only when non-blank.
    pub fn update_recommendation(
        &self,
        id: &str,
        status: RecommendationStatus,
        actual_metrics: Option<JsonMap>,
        notes: Option<&str>,
    ) -> Result<RecommendationRecord, StoreError> {
        let path = self.recommendation_path(id)?;
        if !path.exists() {
            warn!("Update for unknown recommendation {}", id);
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut record: RecommendationRecord = read_json(&path)?;
        record.applied_status = status;
        if let Some(metrics) = actual_metrics.filter(|m| !m.is_empty()) {
            record.actual_performance_after_apply = metrics;
        }
        if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
            record.user_notes = Some(notes.to_string());
        }
        record.last_updated = Some(Utc::now());

        write_replace(&path, &serde_json::to_string_pretty(&record)?)?;
        info!("Recommendation {} status updated to {}", id, status);
        Ok(record)
    }

    pub fn get_recommendation(&self, id: &str) -> Result<RecommendationRecord, StoreError> {
        let path = self.recommendation_path(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        read_json(&path)
    }

    /// Every readable recommendation, most recent first.
    pub fn list_recommendations(&self) -> Result<Vec<RecommendationRecord>, StoreError> {
        let mut records: Vec<RecommendationRecord> =
            read_documents(&self.recommendations_dir, RECOMMENDATION_PREFIX)?;
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    // --- Knowledge base ---

    pub fn add_knowledge_chunk(
        &self,
        content: &str,
        source: JsonMap,
    ) -> Result<KnowledgeChunk, StoreError> {
        let timestamp: DateTime<Utc> = Utc::now();
        let (id, path, file) = self.claim_id(
            &self.knowledge_dir,
            CHUNK_PREFIX,
            &timestamp.format("%Y%m%d%H%M%S%6f").to_string(),
        )?;
        let chunk = KnowledgeChunk {
            content: content.to_string(),
            source,
            timestamp,
        };
        fill_claimed(file, &path, &serde_json::to_string_pretty(&chunk)?)?;
        info!("Knowledge chunk {} saved", id);
        Ok(chunk)
    }

    /// All knowledge chunks in creation order.
    pub fn list_knowledge_chunks(&self) -> Result<Vec<KnowledgeChunk>, StoreError> {
        let mut chunks: Vec<KnowledgeChunk> = read_documents(&self.knowledge_dir, CHUNK_PREFIX)?;
        chunks.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(chunks)
    }

    // --- Helpers ---

    fn recommendation_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self
            .recommendations_dir
            .join(format!("{}{}{}", RECOMMENDATION_PREFIX, id, DOC_SUFFIX)))
    }

    /// Create the first free `<prefix><base>[-N].json` in `dir`.
    fn claim_id(
        &self,
        dir: &Path,
        prefix: &str,
        base: &str,
    ) -> Result<(String, PathBuf, File), StoreError> {
        for attempt in 0..MAX_ID_SUFFIX {
            let id = if attempt == 0 {
                base.to_string()
            } else {
                format!("{}-{}", base, attempt)
            };
            let path = dir.join(format!("{}{}{}", prefix, id, DOC_SUFFIX));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((id, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free id for {}{}", prefix, base),
        )))
    }
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    let bad = id.is_empty()
        || id.contains("..")
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load every `<prefix>*.json` in `dir`, skipping documents that fail to parse.
fn read_documents<T: DeserializeOwned>(dir: &Path, prefix: &str) -> Result<Vec<T>, StoreError> {
    let mut docs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_doc = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(prefix) && n.ends_with(DOC_SUFFIX))
            .unwrap_or(false);
        if !is_doc {
            continue;
        }
        match read_json(&path) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(docs)
}

/// Write a freshly claimed document; the claim is released if the write fails.
fn fill_claimed(mut file: File, path: &Path, contents: &str) -> Result<(), StoreError> {
    let result = file
        .write_all(contents.as_bytes())
        .and_then(|_| file.sync_all());
    if result.is_err() {
        drop(file);
        let _ = fs::remove_file(path);
    }
    Ok(result?)
}

/// Replace `path` through a sibling temp file and a rename.
fn write_replace(path: &Path, contents: &str) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_ids() {
        assert!(matches!(validate_id("../etc"), Err(StoreError::InvalidId(_))));
        assert!(matches!(validate_id("a/b"), Err(StoreError::InvalidId(_))));
        assert!(matches!(validate_id(""), Err(StoreError::InvalidId(_))));
        assert!(validate_id("20250101120000-2").is_ok());
    }
}
