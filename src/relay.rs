//!
//! Relay state and evaluator
//! -------------------------
//! `RelayState` is the single shared object handed to the HTTP handlers and the broker
//! poller. The ledger and the last-result record sit behind one mutex so that a commit
//! appends and overwrites together; readers clone a projection and release the lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::directory::Directory;
use crate::ledger::{AccessAttempt, LastResult, Ledger, LedgerStats, Verdict};

/// Timestamp format used for ledger entries and the last-result record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Default)]
struct Journal {
    ledger: Ledger,
    last: LastResult,
}

struct Shared {
    directory: Directory,
    journal: Mutex<Journal>,
}

#[derive(Clone)]
pub struct RelayState {
    inner: Arc<Shared>,
}

impl RelayState {
    pub fn new(directory: Directory) -> Self {
        Self { inner: Arc::new(Shared { directory, journal: Mutex::new(Journal::default()) }) }
    }

    pub fn directory(&self) -> &Directory { &self.inner.directory }

    /// Decide an identifier against the directory and commit the outcome.
    pub fn evaluate(&self, id: &str) -> Verdict {
        let verdict = decide(&self.inner.directory, id, now_timestamp());
        self.commit(verdict.clone());
        verdict
    }

    /// Append to the ledger and overwrite the last result in one critical section.
    pub fn commit(&self, verdict: Verdict) {
        if verdict.outcome.is_granted() {
            info!(target: "access", id = %verdict.id, nome = %verdict.nome, departamento = %verdict.departamento, timestamp = %verdict.timestamp, "ACESSO LIBERADO");
        } else {
            warn!(target: "access", id = %verdict.id, nome = %verdict.nome, departamento = %verdict.departamento, timestamp = %verdict.timestamp, "ACESSO NEGADO: ID não autorizado");
        }
        let mut j = self.inner.journal.lock();
        j.ledger.append(AccessAttempt::from(&verdict));
        j.last = LastResult::from(&verdict);
    }

    pub fn last_result(&self) -> LastResult {
        self.inner.journal.lock().last.clone()
    }

    pub fn recent(&self, limit: usize) -> Vec<AccessAttempt> {
        self.inner.journal.lock().ledger.recent(limit)
    }

    pub fn stats(&self) -> LedgerStats {
        self.inner.journal.lock().ledger.stats()
    }

    pub fn history(&self) -> Vec<AccessAttempt> {
        self.inner.journal.lock().ledger.entries().to_vec()
    }

    pub fn ledger_len(&self) -> usize {
        self.inner.journal.lock().ledger.len()
    }
}

/// Pure directory decision; `timestamp` is supplied by the caller.
pub fn decide(directory: &Directory, id: &str, timestamp: String) -> Verdict {
    match directory.get(id) {
        Some(entry) => Verdict::granted(id, &entry.nome, &entry.departamento, timestamp),
        None => Verdict::denied(id, timestamp),
    }
}
