//! Access ledger and last-result projection.
//!
//! The ledger is append-only: entries are never edited or removed, so index order is
//! chronological order. Read views (`recent`, `stats`) are computed on demand.

use serde::{Deserialize, Serialize};

/// Number of entries returned by the recent-history view.
pub const RECENT_LIMIT: usize = 10;

pub const UNKNOWN_NAME: &str = "Desconhecido";
pub const UNKNOWN_DEPARTMENT: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "LIBERADO")]
    Granted,
    #[serde(rename = "NEGADO")]
    Denied,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Granted => "LIBERADO",
            Outcome::Denied => "NEGADO",
        }
    }

    pub fn is_granted(&self) -> bool { matches!(self, Outcome::Granted) }
}

/// Full detail of one evaluation, before it is split into a ledger entry and the last-result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub id: String,
    pub outcome: Outcome,
    pub nome: String,
    pub departamento: String,
    pub timestamp: String,
}

impl Verdict {
    pub fn granted(id: &str, nome: &str, departamento: &str, timestamp: String) -> Self {
        Self { id: id.to_string(), outcome: Outcome::Granted, nome: nome.to_string(), departamento: departamento.to_string(), timestamp }
    }

    pub fn denied(id: &str, timestamp: String) -> Self {
        Self {
            id: id.to_string(),
            outcome: Outcome::Denied,
            nome: UNKNOWN_NAME.to_string(),
            departamento: UNKNOWN_DEPARTMENT.to_string(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub timestamp: String,
    pub id: String,
    pub nome: String,
    pub status: Outcome,
}

impl From<&Verdict> for AccessAttempt {
    fn from(v: &Verdict) -> Self {
        Self { timestamp: v.timestamp.clone(), id: v.id.clone(), nome: v.nome.clone(), status: v.outcome }
    }
}

/// Most recent evaluation. `Default` is the empty sentinel served before any attempt:
/// every field is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastResult {
    pub id: String,
    pub status: String,
    pub nome: String,
    pub departamento: String,
    pub timestamp: String,
}

impl LastResult {
    pub fn is_empty(&self) -> bool { self.id.is_empty() && self.status.is_empty() }
}

impl From<&Verdict> for LastResult {
    fn from(v: &Verdict) -> Self {
        Self {
            id: v.id.clone(),
            status: v.outcome.as_str().to_string(),
            nome: v.nome.clone(),
            departamento: v.departamento.clone(),
            timestamp: v.timestamp.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total: usize,
    pub liberados: usize,
    pub negados: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<AccessAttempt>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn append(&mut self, attempt: AccessAttempt) {
        self.entries.push(attempt);
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entries(&self) -> &[AccessAttempt] { &self.entries }

    /// Up to `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AccessAttempt> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Full scan; no counters are kept between calls.
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats { total: self.entries.len(), ..Default::default() };
        for e in &self.entries {
            match e.status {
                Outcome::Granted => stats.liberados += 1,
                Outcome::Denied => stats.negados += 1,
            }
        }
        stats
    }
}
