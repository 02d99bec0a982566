//! JSON metadata ledger recording the prompt history of each generation
//!
//! The ledger is a single document keyed by generation id. Every mutation
//! reloads the whole document, changes one record and writes it back, all
//! inside one per-process critical section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Prompt provenance of one generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    #[serde(default)]
    pub video_prompts: Vec<String>,
}

/// Record shapes accepted on load, oldest last
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    #[serde(rename_all = "camelCase")]
    SinglePrompt {
        prompt: String,
        #[serde(default)]
        enhanced_prompt: Option<String>,
        #[serde(default)]
        video_prompt: Option<String>,
        #[serde(default)]
        video_prompts: Vec<String>,
    },
    Current(GenerationRecord),
    Bare(String),
}

impl From<StoredRecord> for GenerationRecord {
    fn from(stored: StoredRecord) -> Self {
        match stored {
            StoredRecord::Current(record) => record,
            StoredRecord::SinglePrompt {
                prompt,
                enhanced_prompt,
                video_prompt,
                mut video_prompts,
            } => {
                if video_prompts.is_empty() {
                    video_prompts.extend(video_prompt);
                }
                GenerationRecord {
                    prompts: vec![prompt],
                    enhanced_prompt,
                    video_prompts,
                }
            }
            StoredRecord::Bare(prompt) => GenerationRecord {
                prompts: vec![prompt],
                ..Default::default()
            },
        }
    }
}

/// Ledger document, ordered by generation id
pub type LedgerDocument = BTreeMap<i64, GenerationRecord>;

/// File-backed metadata ledger
pub struct MetadataLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MetadataLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing or malformed document reads as empty.
    pub async fn load(&self) -> Result<LedgerDocument> {
        Ok(self.read_document().await?.0)
    }

    /// Record the creation prompt of a generation.
    ///
    /// The prompt is appended unless it already is the most recent entry; the
    /// enhanced prompt is only set if the record has none yet.
    pub async fn record_creation(
        &self,
        generation_id: i64,
        prompt: &str,
        enhanced_prompt: Option<&str>,
    ) -> Result<GenerationRecord> {
        self.update(generation_id, |record| {
            if record.prompts.last().map(String::as_str) != Some(prompt) {
                record.prompts.push(prompt.to_string());
            }
            if record.enhanced_prompt.is_none() {
                record.enhanced_prompt = enhanced_prompt.map(str::to_string);
            }
        })
        .await
    }

    /// Append an edit prompt
    pub async fn append_edit(&self, generation_id: i64, prompt: &str) -> Result<GenerationRecord> {
        self.update(generation_id, |record| record.prompts.push(prompt.to_string()))
            .await
    }

    /// Append a video prompt
    pub async fn append_video_prompt(
        &self,
        generation_id: i64,
        prompt: &str,
    ) -> Result<GenerationRecord> {
        self.update(generation_id, |record| {
            record.video_prompts.push(prompt.to_string())
        })
        .await
    }

    async fn update<F>(&self, generation_id: i64, mutate: F) -> Result<GenerationRecord>
    where
        F: FnOnce(&mut GenerationRecord),
    {
        let _guard = self.write_lock.lock().await;

        let (mut document, malformed) = self.read_document().await?;
        if malformed {
            self.preserve_malformed().await?;
        }

        let record = document.entry(generation_id).or_default();
        mutate(record);
        let updated = record.clone();

        self.write_document(&document).await?;
        debug!(generation_id, prompts = updated.prompts.len(), "Updated ledger record");

        Ok(updated)
    }

    /// Returns the parsed document and whether the file on disk was malformed
    async fn read_document(&self) -> Result<(LedgerDocument, bool)> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((LedgerDocument::new(), false)),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok((LedgerDocument::new(), false));
        }

        match parse_document(&raw) {
            Ok(document) => Ok((document, false)),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Metadata ledger is malformed, treating as empty");
                Ok((LedgerDocument::new(), true))
            }
        }
    }

    async fn write_document(&self, document: &LedgerDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_vec_pretty(document)?;
        let temp = self.sibling(&format!("{}.tmp", Uuid::new_v4()));

        fs::write(&temp, &serialized).await?;
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn preserve_malformed(&self) -> Result<()> {
        let backup = self.sibling(&format!(
            "corrupt-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        fs::rename(&self.path, &backup).await?;
        warn!(backup = ?backup, "Preserved malformed metadata ledger");
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

fn parse_document(raw: &str) -> serde_json::Result<LedgerDocument> {
    let stored: BTreeMap<String, StoredRecord> = serde_json::from_str(raw)?;

    let mut document = LedgerDocument::new();
    for (key, record) in stored {
        match key.trim().parse::<i64>() {
            Ok(id) => {
                document.insert(id, record.into());
            }
            Err(_) => warn!(key = %key, "Skipping ledger entry with non-numeric id"),
        }
    }
    Ok(document)
}
