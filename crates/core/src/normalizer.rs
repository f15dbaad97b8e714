//! Typo correction applied to chat input before it reaches the agent.

use std::collections::HashMap;
use std::path::Path;

use crate::error::IngestError;

const BUILTIN_CORRECTIONS: [(&str, &str); 3] = [
    ("comman", "common"),
    ("prject", "project"),
    ("resme", "resume"),
];

/// Lowercase misspelling to replacement token. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionTable {
    entries: HashMap<String, String>,
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self::from_pairs(BUILTIN_CORRECTIONS)
    }
}

impl CorrectionTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Keys are lowercased so lookups match regardless of how the table was written.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(misspelled, corrected)| (misspelled.as_ref().to_lowercase(), corrected.into()))
                .collect(),
        }
    }

    /// Loads a JSON object such as `{"recieve": "receive"}`.
    pub fn from_json_file(path: &Path) -> Result<Self, IngestError> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: HashMap<String, String> = serde_json::from_str(&raw).map_err(|error| {
            IngestError::InvalidArgument(format!(
                "corrections file {} is not a JSON object of strings: {error}",
                path.display()
            ))
        })?;
        Ok(Self::from_pairs(parsed))
    }

    /// Entries of `overrides` win over entries of `self`.
    pub fn merged_with(&self, overrides: &CorrectionTable) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(
            overrides
                .entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn correction_for(&self, token: &str) -> Option<&str> {
        self.entries.get(&token.to_lowercase()).map(String::as_str)
    }

    /// See [`normalize_user_input`].
    pub fn normalize(&self, input: &str) -> String {
        normalize_user_input(input, self)
    }
}

/// Replaces known misspellings token by token.
///
/// Tokens split on whitespace only, so `"prject,"` is left alone. A corrected
/// token takes the table's casing; others keep theirs. Whitespace runs,
/// tabs and newlines collapse to single spaces.
pub fn normalize_user_input(input: &str, table: &CorrectionTable) -> String {
    input
        .split_whitespace()
        .map(|token| table.correction_for(token).unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}
