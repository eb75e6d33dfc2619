use logbook_core::CanonicalKey;
use logbook_types::{Details, FileSignature, Summary};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot schema version. A mismatch invalidates the whole table.
pub(crate) const SUMMARY_TABLE_VERSION: &str = "1";
pub(crate) const DETAIL_TABLE_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub sig: FileSignature,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDetails {
    pub sig: FileSignature,
    pub details: Details,
}

/// In-memory materialization of the summary tier.
///
/// One entry per canonical key; re-insertion overwrites. An entry is only
/// trustworthy while its stored signature equals the file's live signature,
/// which is the caller's check ([`SummaryTable::get_if_fresh`]).
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    entries: HashMap<CanonicalKey, CachedSummary>,
}

impl SummaryTable {
    pub fn get(&self, key: &CanonicalKey) -> Option<&CachedSummary> {
        self.entries.get(key)
    }

    pub fn get_if_fresh(&self, key: &CanonicalKey, live: FileSignature) -> Option<&Summary> {
        self.entries
            .get(key)
            .filter(|cached| cached.sig == live)
            .map(|cached| &cached.summary)
    }

    pub fn insert(&mut self, key: CanonicalKey, sig: FileSignature, summary: Summary) {
        self.entries.insert(key, CachedSummary { sig, summary });
    }

    pub fn remove(&mut self, key: &CanonicalKey) -> Option<CachedSummary> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summaries(&self) -> impl Iterator<Item = &Summary> {
        self.entries.values().map(|cached| &cached.summary)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CanonicalKey, &CachedSummary)> {
        self.entries.iter()
    }
}

/// In-memory materialization of the detail tier. Same discipline as
/// [`SummaryTable`], holding full parses instead of projections.
#[derive(Debug, Clone, Default)]
pub struct DetailTable {
    entries: HashMap<CanonicalKey, CachedDetails>,
}

impl DetailTable {
    pub fn get_if_fresh(&self, key: &CanonicalKey, live: FileSignature) -> Option<&Details> {
        self.entries
            .get(key)
            .filter(|cached| cached.sig == live)
            .map(|cached| &cached.details)
    }

    pub fn insert(&mut self, key: CanonicalKey, sig: FileSignature, details: Details) {
        self.entries.insert(key, CachedDetails { sig, details });
    }

    pub fn remove(&mut self, key: &CanonicalKey) -> Option<CachedDetails> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// On-disk form: `{version, files, savedAt}` as one whole-file document.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableFile<E> {
    pub version: String,
    pub files: HashMap<CanonicalKey, E>,
    #[serde(rename = "savedAt")]
    pub saved_at: i64,
}

impl SummaryTable {
    pub(crate) fn from_file(file: TableFile<CachedSummary>) -> Self {
        Self {
            entries: file.files,
        }
    }

    pub(crate) fn to_file(&self, saved_at: i64) -> TableFile<CachedSummary> {
        TableFile {
            version: SUMMARY_TABLE_VERSION.to_string(),
            files: self.entries.clone(),
            saved_at,
        }
    }
}

impl DetailTable {
    pub(crate) fn from_file(file: TableFile<CachedDetails>) -> Self {
        Self {
            entries: file.files,
        }
    }

    pub(crate) fn to_file(&self, saved_at: i64) -> TableFile<CachedDetails> {
        TableFile {
            version: DETAIL_TABLE_VERSION.to_string(),
            files: self.entries.clone(),
            saved_at,
        }
    }
}
