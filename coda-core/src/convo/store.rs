//! Append-only JSONL message store.
//!
//! One record per line. The file is the source of truth; an in-memory index
//! is rebuilt on open and kept in sync on every append. Saving is
//! idempotent: messages already carrying a stamped id are skipped, so saving
//! the same dialog twice writes nothing new.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::llm::provider::{Dialog, Message};

use super::MESSAGE_ID_KEY;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store at line {line}: {message}")]
    Corrupt { line: usize, message: String },
    #[error("no such message: {0}")]
    UnknownMessage(String),
    #[error("message {0} has descendants; pass cascade to delete the subtree")]
    HasDescendants(String),
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub message: Message,
}

/// One row of `list()` output: a conversation is a leaf message.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub preview: String,
}

pub struct MessageStore {
    path: PathBuf,
    records: Vec<MessageRecord>,
}

impl MessageStore {
    /// Opens (or creates) the store file and rebuilds the index, validating
    /// that every parent reference resolves.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Vec::new();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut seen: HashSet<String> = HashSet::new();
            for (index, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: MessageRecord =
                    serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                        line: index + 1,
                        message: e.to_string(),
                    })?;
                if let Some(parent) = &record.parent_id {
                    if !seen.contains(parent) {
                        return Err(StoreError::Corrupt {
                            line: index + 1,
                            message: format!("parent {parent} not found"),
                        });
                    }
                }
                seen.insert(record.id.clone());
                records.push(record);
            }
        } else if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stamped_id(message: &Message) -> Option<&str> {
        message.extra.get(MESSAGE_ID_KEY).and_then(Value::as_str)
    }

    fn find(&self, id: &str) -> Option<&MessageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn children_of(&self, id: &str) -> Vec<&MessageRecord> {
        self.records
            .iter()
            .filter(|r| r.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Persists every unsaved message in the dialog, chaining each onto the
    /// previous message's id, and stamps the new ids back into the dialog.
    pub fn save_dialog(&mut self, dialog: &mut Dialog, model: &str) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut parent_id: Option<String> = None;
        for message in dialog.iter_mut() {
            if let Some(id) = Self::stamped_id(message) {
                parent_id = Some(id.to_string());
                continue;
            }
            let id = Uuid::new_v4().to_string();
            message
                .extra
                .insert(MESSAGE_ID_KEY.to_string(), Value::String(id.clone()));
            let record = MessageRecord {
                id: id.clone(),
                parent_id: parent_id.take(),
                model: model.to_string(),
                created_at: Utc::now(),
                message: message.clone(),
            };
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{line}")?;
            self.records.push(record);
            parent_id = Some(id);
        }
        file.flush()?;
        Ok(())
    }

    /// Rebuilds the dialog ending at `leaf_id` by walking the parent chain.
    /// Returned messages carry their stamped ids, so a later save continues
    /// the same chain. Also returns the model the leaf was generated with.
    pub fn dialog_from_leaf(&self, leaf_id: &str) -> Result<(Dialog, String), StoreError> {
        let leaf = self
            .find(leaf_id)
            .ok_or_else(|| StoreError::UnknownMessage(leaf_id.to_string()))?;
        let model = leaf.model.clone();
        let mut chain = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(record) = cursor {
            let mut message = record.message.clone();
            message.extra.insert(
                MESSAGE_ID_KEY.to_string(),
                Value::String(record.id.clone()),
            );
            chain.push(message);
            cursor = match &record.parent_id {
                Some(parent) => Some(self.find(parent).ok_or_else(|| {
                    StoreError::UnknownMessage(parent.clone())
                })?),
                None => None,
            };
        }
        chain.reverse();
        Ok((chain, model))
    }

    /// The most recently appended message with no children, if any.
    pub fn latest_leaf(&self) -> Option<&MessageRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| self.children_of(&r.id).is_empty())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Deletes a message. Without `cascade` the message must be a leaf; with
    /// it the whole subtree goes. The file is rewritten in place.
    pub fn delete(&mut self, id: &str, cascade: bool) -> Result<usize, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::UnknownMessage(id.to_string()));
        }
        let mut doomed: HashSet<String> = HashSet::new();
        doomed.insert(id.to_string());
        loop {
            let next: Vec<String> = self
                .records
                .iter()
                .filter(|r| {
                    r.parent_id
                        .as_ref()
                        .is_some_and(|p| doomed.contains(p))
                        && !doomed.contains(&r.id)
                })
                .map(|r| r.id.clone())
                .collect();
            if next.is_empty() {
                break;
            }
            doomed.extend(next);
        }
        if doomed.len() > 1 && !cascade {
            return Err(StoreError::HasDescendants(id.to_string()));
        }
        self.records.retain(|r| !doomed.contains(&r.id));
        self.rewrite()?;
        Ok(doomed.len())
    }

    fn rewrite(&self) -> Result<(), StoreError> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        fs::write(&self.path, out)?;
        Ok(())
    }

    /// Every conversation in the store, one summary per leaf, newest first.
    pub fn list(&self) -> Vec<ConversationSummary> {
        let mut leaves: Vec<ConversationSummary> = self
            .records
            .iter()
            .filter(|r| self.children_of(&r.id).is_empty())
            .map(|leaf| ConversationSummary {
                id: leaf.id.clone(),
                model: leaf.model.clone(),
                created_at: leaf.created_at,
                preview: self.preview_for(leaf),
            })
            .collect();
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leaves
    }

    /// First user message text on the leaf's chain, clipped for display.
    fn preview_for(&self, leaf: &MessageRecord) -> String {
        let mut cursor = Some(leaf);
        let mut root = leaf;
        while let Some(record) = cursor {
            root = record;
            cursor = record.parent_id.as_ref().and_then(|p| self.find(p));
        }
        let text = root.message.text();
        let mut preview: String = text.chars().take(60).collect();
        if text.chars().count() > 60 {
            preview.push_str("...");
        }
        preview.replace('\n', " ")
    }
}
