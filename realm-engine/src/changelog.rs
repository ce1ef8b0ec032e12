//! Append-only record of committed file mutations.
//!
//! Every commit lands here with full before/after content, which is
//! what makes post-commit rollback a corrective write rather than a
//! guess. The log is bounded; old entries are pruned oldest-first.

use realm_types::{ChangeId, Operation, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

const DEFAULT_MAX_ENTRIES: usize = 1000;

/// One committed change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: ChangeId,
    pub transaction_id: TransactionId,
    pub timestamp: Timestamp,
    pub file_path: String,
    pub operations: Vec<Operation>,
    pub before_content: String,
    pub after_content: String,
    pub before_hash: String,
    pub after_hash: String,
    pub rolled_back: bool,
    pub rolled_back_at: Option<Timestamp>,
}

/// Filter for [`ChangeLog::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ChangeQuery {
    pub file_path: Option<String>,
    pub transaction_id: Option<TransactionId>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<usize>,
    pub exclude_rolled_back: bool,
}

/// Aggregate counters over the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogStats {
    pub total_entries: usize,
    pub rolled_back: usize,
    pub files_touched: usize,
    pub oldest: Option<Timestamp>,
    pub newest: Option<Timestamp>,
}

/// In-memory append-only change log with secondary indexes.
pub struct ChangeLog {
    entries: Vec<ChangeLogEntry>,
    by_transaction: HashMap<TransactionId, usize>,
    by_file: HashMap<String, Vec<usize>>,
    max_entries: usize,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl ChangeLog {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            by_transaction: HashMap::new(),
            by_file: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Appends an entry, pruning the oldest entries past capacity.
    pub fn append(&mut self, entry: ChangeLogEntry) -> ChangeId {
        let id = entry.id;
        debug!(file = %entry.file_path, tx = %entry.transaction_id, "change logged");
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.rebuild_indexes();
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ChangeId) -> Option<&ChangeLogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The entry for a transaction, if still retained.
    pub fn by_transaction(&self, transaction_id: TransactionId) -> Option<&ChangeLogEntry> {
        self.by_transaction
            .get(&transaction_id)
            .and_then(|&i| self.entries.get(i))
    }

    /// Entries matching `query`, newest first.
    pub fn query(&self, query: &ChangeQuery) -> Vec<&ChangeLogEntry> {
        let mut out: Vec<&ChangeLogEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| {
                query
                    .file_path
                    .as_ref()
                    .map_or(true, |f| &e.file_path == f)
                    && query
                        .transaction_id
                        .map_or(true, |t| e.transaction_id == t)
                    && query.since.map_or(true, |s| e.timestamp >= s)
                    && query.until.map_or(true, |u| e.timestamp <= u)
                    && !(query.exclude_rolled_back && e.rolled_back)
            })
            .collect();
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        out
    }

    /// All retained changes for a file, newest first.
    pub fn get_file_history(&self, file_path: &str) -> Vec<&ChangeLogEntry> {
        self.by_file
            .get(file_path)
            .map(|idxs| idxs.iter().rev().filter_map(|&i| self.entries.get(i)).collect())
            .unwrap_or_default()
    }

    /// The newest non-rolled-back change for a file.
    pub fn get_last_valid_change(&self, file_path: &str) -> Option<&ChangeLogEntry> {
        self.get_file_history(file_path)
            .into_iter()
            .find(|e| !e.rolled_back)
    }

    /// Flags a change as rolled back. Returns false for unknown ids.
    pub fn mark_rolled_back(&mut self, id: ChangeId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.rolled_back = true;
                entry.rolled_back_at = Some(Timestamp::now());
                true
            }
            None => false,
        }
    }

    /// Serializes the full log to JSON.
    pub fn export(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Replays a previously exported snapshot through [`Self::append`],
    /// entry by entry, on top of whatever the log already holds. The
    /// input is parsed in full before any state is touched, so a
    /// malformed payload leaves the log untouched.
    pub fn import(&mut self, json: &str) -> EngineResult<usize> {
        let entries: Vec<ChangeLogEntry> = serde_json::from_str(json)
            .map_err(|e| EngineError::ImportFailure(e.to_string()))?;
        let count = entries.len();
        for entry in entries {
            self.append(entry);
        }
        Ok(count)
    }

    pub fn stats(&self) -> ChangeLogStats {
        ChangeLogStats {
            total_entries: self.entries.len(),
            rolled_back: self.entries.iter().filter(|e| e.rolled_back).count(),
            files_touched: self.by_file.len(),
            oldest: self.entries.first().map(|e| e.timestamp),
            newest: self.entries.last().map(|e| e.timestamp),
        }
    }

    fn rebuild_indexes(&mut self) {
        self.by_transaction.clear();
        self.by_file.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.by_transaction.insert(entry.transaction_id, i);
            self.by_file
                .entry(entry.file_path.clone())
                .or_default()
                .push(i);
        }
    }
}
