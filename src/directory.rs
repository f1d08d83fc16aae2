//!
//! Authorization directory
//! -----------------------
//! Static identifier -> person mapping consulted by the evaluator in broker mode.
//! Loaded once at startup, either from the built-in table or from a JSON file of the form
//! `{"<id>": {"nome": "...", "departamento": "..."}}`, and never mutated afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One authorized person, keyed by tag identifier in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedEntry {
    pub nome: String,
    pub departamento: String,
}

impl AuthorizedEntry {
    pub fn new<S: Into<String>>(nome: S, departamento: S) -> Self {
        Self { nome: nome.into(), departamento: departamento.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Directory {
    entries: BTreeMap<String, AuthorizedEntry>,
}

impl Directory {
    /// The table the relay ships with when no directory file is configured.
    pub fn builtin() -> Self {
        Self::from_entries([
            ("12345", AuthorizedEntry::new("João Silva", "TI")),
            ("67890", AuthorizedEntry::new("Maria Santos", "RH")),
            ("11111", AuthorizedEntry::new("Pedro Costa", "Financeiro")),
            ("22222", AuthorizedEntry::new("Ana Oliveira", "Marketing")),
            ("99999", AuthorizedEntry::new("Admin", "Administração")),
        ])
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AuthorizedEntry)>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }

    pub fn load_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read directory file: {}", path.display()))?;
        let entries: BTreeMap<String, AuthorizedEntry> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid directory JSON in {}", path.display()))?;
        Ok(Self { entries })
    }

    /// Exact-match lookup; no trimming or case folding.
    pub fn get(&self, id: &str) -> Option<&AuthorizedEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AuthorizedEntry)> {
        self.entries.iter()
    }
}
