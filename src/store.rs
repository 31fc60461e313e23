//! Entry and result stores with incremental merge.
//!
//! `ResultStore` holds the canonical extracted entries and the scoring results
//! under the same natural key, hands out bounded batches of entries that have
//! not been scored yet, and merges scoring responses back onto their entries.
//! Both collections keep insertion order: replacing a record keeps its
//! original position. Candidate selection walks that order, the translation
//! corpus sorts explicitly.

use crate::error::{Result, ReviewError};
use crate::identity::KeyMap;
use crate::models::{
    AiResponse, AiResult, AiTranslation, Entry, EntryFields, MergeDrift, TranslationPair,
    MERGE_ERROR_MESSAGE,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Locations of the persisted collections
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Extracted entries
    pub entries: PathBuf,
    /// Merged scoring results
    pub results: PathBuf,
    /// Sorted `{en, fr}` corpus
    pub translations: PathBuf,
    /// Numeric key assignments
    pub key_map: PathBuf,
}

impl StorePaths {
    /// Standard file names inside a working directory
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            entries: dir.join("entries.json"),
            results: dir.join("results.json"),
            translations: dir.join("translations.json"),
            key_map: dir.join("keymap.json"),
        }
    }
}

/// Insertion-ordered records addressed by natural key
#[derive(Debug, Clone)]
struct Ordered<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Ordered<T> {
    /// Insert or replace; a replaced record keeps its position
    fn upsert(&mut self, key: String, item: T) {
        match self.index.get(&key) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
            }
        }
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.items[position])
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Summary of merging one batch of scoring responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Responses merged into the result store
    pub merged: usize,
    /// Merged responses whose text disagreed with the entry
    pub drifted: usize,
    /// Numeric keys that could not be resolved to an entry
    pub unresolved: Vec<u64>,
}

/// Canonical entries, scoring results and the numeric key map
#[derive(Debug, Clone)]
pub struct ResultStore {
    paths: StorePaths,
    entries: Ordered<Entry>,
    results: Ordered<AiResult>,
    keys: KeyMap,
}

impl ResultStore {
    /// Create an empty store persisting to `paths`
    #[must_use]
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            entries: Ordered::default(),
            results: Ordered::default(),
            keys: KeyMap::new(),
        }
    }

    /// Create an empty store persisting inside `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(StorePaths::in_dir(dir))
    }

    /// Where this store persists
    #[must_use]
    pub const fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Read persisted entries, results and key map.
    ///
    /// Entries are the source of truth: a missing file starts an empty store,
    /// an unreadable one is an error. Results and the key map are caches and
    /// fall back to empty on any failure.
    pub fn load(&mut self) -> Result<()> {
        match read_json::<Vec<Entry>>(&self.paths.entries) {
            Ok(entries) => self.add_entries(entries.into_iter().map(|e| e.fields)),
            Err(ReviewError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.paths.entries.display(), "No entries file yet, starting empty");
            }
            Err(e) => return Err(e),
        }

        match read_json::<KeyMap>(&self.paths.key_map) {
            Ok(keys) => self.keys = keys,
            Err(e) => debug!(error = %e, "No usable key map, starting empty"),
        }

        match read_json::<Vec<AiResult>>(&self.paths.results) {
            Ok(results) => self.add_results(results),
            Err(e) => warn!(error = %e, "Could not read results, continuing with none"),
        }

        info!(
            entries = self.entries.len(),
            results = self.results.len(),
            numeric_keys = self.keys.len(),
            "Store loaded"
        );
        Ok(())
    }

    /// Add extracted records; an existing entry under the same natural key is replaced
    pub fn add_entries<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = EntryFields>,
    {
        for fields in records {
            let entry = Entry::from_fields(fields);
            self.entries.upsert(entry.key.clone(), entry);
        }
    }

    /// All entries in insertion order, with `include_for_ai` freshly derived
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .map(|entry| Entry {
                include_for_ai: Some(entry.include_for_ai()),
                ..entry.clone()
            })
            .collect()
    }

    /// All stored results in insertion order
    #[must_use]
    pub fn results(&self) -> &[AiResult] {
        &self.results.items
    }

    /// Numeric key assignments made so far
    #[must_use]
    pub const fn key_map(&self) -> &KeyMap {
        &self.keys
    }

    /// Merge one result onto its entry and store it, replacing any earlier
    /// result under the same key. Returns true when the texts drifted.
    pub fn add_result(&mut self, result: AiResult) -> bool {
        let merged = match self.entries.get(&result.key) {
            Some(entry) => merge_onto_entry(entry, result),
            None => AiResult {
                ai_result_available: true,
                drift: None,
                ..result
            },
        };
        let drifted = merged.drift.is_some();
        self.results.upsert(merged.key.clone(), merged);
        drifted
    }

    /// Merge several results in order
    pub fn add_results<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = AiResult>,
    {
        for result in results {
            self.add_result(result);
        }
    }

    /// Resolve a response's numeric key and merge it.
    ///
    /// Returns `None` when the numeric key is unknown; the response is not
    /// merged. Otherwise returns whether the merged text drifted.
    pub fn add_ai_response(&mut self, response: AiResponse) -> Option<bool> {
        let key = self.keys.resolve(response.key)?.to_string();
        Some(self.add_result(response.into_result(key)))
    }

    /// Merge a batch of responses, reporting keys that could not be resolved
    pub fn add_ai_responses<I>(&mut self, responses: I) -> MergeReport
    where
        I: IntoIterator<Item = AiResponse>,
    {
        let mut report = MergeReport::default();
        for response in responses {
            let number = response.key;
            match self.add_ai_response(response) {
                Some(drifted) => {
                    report.merged += 1;
                    if drifted {
                        report.drifted += 1;
                    }
                }
                None => {
                    warn!(key = number, "Response key is not known to this store, dropped");
                    report.unresolved.push(number);
                }
            }
        }
        report
    }

    /// Next batch for scoring: the first `length` candidates without a result,
    /// in insertion order, each with its numeric key.
    pub fn next_ai_request_set(&mut self, length: usize) -> Vec<AiTranslation> {
        let pending: Vec<(String, String, String)> = self
            .entries
            .iter()
            .filter(|entry| entry.include_for_ai())
            .filter(|entry| !self.results.contains(&entry.key))
            .take(length)
            .filter_map(|entry| {
                entry
                    .fields
                    .text_pair()
                    .map(|(en, fr)| (entry.key.clone(), en.to_string(), fr.to_string()))
            })
            .collect();

        pending
            .into_iter()
            .map(|(key, en, fr)| AiTranslation {
                key: self.keys.assign(&key),
                en,
                fr,
            })
            .collect()
    }

    /// Candidate pairs sorted by natural key; `length == 0 && start == 0`
    /// returns the whole corpus, otherwise the pairs at positions
    /// `start..length` (empty when `start >= length`).
    #[must_use]
    pub fn ai_translation_set(&self, length: usize, start: usize) -> Vec<TranslationPair> {
        let mut candidates: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.include_for_ai())
            .collect();
        candidates.sort_by(|a, b| a.key.cmp(&b.key));

        let pairs = candidates.into_iter().filter_map(|entry| {
            entry.fields.text_pair().map(|(en, fr)| TranslationPair {
                en: en.to_string(),
                fr: fr.to_string(),
            })
        });

        if length == 0 && start == 0 {
            pairs.collect()
        } else {
            pairs.take(length).skip(start).collect()
        }
    }

    /// Persist entries, including the derived `includeForAi` flag
    pub fn save_entries(&self) -> Result<()> {
        write_json(&self.paths.entries, &self.entries())
    }

    /// Persist results
    pub fn save_results(&self) -> Result<()> {
        write_json(&self.paths.results, &self.results())
    }

    /// Persist the full sorted translation corpus
    pub fn save_translations(&self) -> Result<()> {
        write_json(&self.paths.translations, &self.ai_translation_set(0, 0))
    }

    /// Persist numeric key assignments
    pub fn save_key_map(&self) -> Result<()> {
        write_json(&self.paths.key_map, &self.keys)
    }
}

fn merge_onto_entry(entry: &Entry, result: AiResult) -> AiResult {
    let drift = (entry.fields.fr != result.fields.fr || entry.fields.en != result.fields.en)
        .then(|| MergeDrift {
            entry_fr: entry.fields.fr.clone(),
            ai_fr: result.fields.fr.clone(),
            entry_en: entry.fields.en.clone(),
            ai_en: result.fields.en.clone(),
            merge_error: MERGE_ERROR_MESSAGE.to_string(),
        });

    AiResult {
        key: result.key,
        fields: entry.fields.overlay(&result.fields),
        scores: result.scores,
        ai_result_available: true,
        drift,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Write `value` as JSON indented by four spaces, creating parent directories
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scores;

    fn fields(file: &str, property: &str, en: &str, fr: &str) -> EntryFields {
        EntryFields {
            file_name: Some(file.to_string()),
            property_name: Some(property.to_string()),
            en: Some(en.to_string()),
            fr: Some(fr.to_string()),
            ..EntryFields::default()
        }
    }

    fn store() -> ResultStore {
        ResultStore::in_dir(Path::new("unused"))
    }

    #[test]
    fn test_replacement_keeps_position() {
        let mut store = store();
        store.add_entries(vec![
            fields("A", "1", "One", "Un"),
            fields("A", "2", "Two", "Deux"),
        ]);
        store.add_entries(vec![fields("A", "1", "One!", "Un !")]);

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "A-1");
        assert_eq!(entries[0].fields.en.as_deref(), Some("One!"));
    }

    #[test]
    fn test_merge_no_drift() {
        let mut store = store();
        store.add_entries(vec![fields("A", "B", "Hello", "Bonjour")]);
        let drifted = store.add_result(AiResult {
            key: "A-B".to_string(),
            fields: EntryFields {
                en: Some("Hello".to_string()),
                fr: Some("Bonjour".to_string()),
                ..EntryFields::default()
            },
            scores: Scores::default(),
            ai_result_available: false,
            drift: None,
        });

        assert!(!drifted);
        let result = &store.results()[0];
        assert!(result.ai_result_available);
        assert_eq!(result.fields.file_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_stale_drift_is_recomputed() {
        let mut store = store();
        store.add_entries(vec![fields("A", "B", "Hello", "Bonjour")]);
        store.add_result(AiResult {
            key: "A-B".to_string(),
            fields: fields("A", "B", "Hello", "Bonjour"),
            scores: Scores::default(),
            ai_result_available: true,
            drift: Some(MergeDrift {
                entry_fr: Some("Bonjour".to_string()),
                ai_fr: Some("Salut".to_string()),
                entry_en: Some("Hello".to_string()),
                ai_en: Some("Hello".to_string()),
                merge_error: MERGE_ERROR_MESSAGE.to_string(),
            }),
        });
        assert!(store.results()[0].drift.is_none());
    }

    #[test]
    fn test_translation_set_window() {
        let mut store = store();
        store.add_entries(vec![
            fields("C", "1", "Gamma", "Gamma fr"),
            fields("A", "1", "Alpha", "Alpha fr"),
            fields("B", "1", "Beta", "Beta fr"),
        ]);
        let window = store.ai_translation_set(2, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].en, "Beta");

        let head = store.ai_translation_set(2, 0);
        assert_eq!(head.iter().map(|p| p.en.as_str()).collect::<Vec<_>>(), vec!["Alpha", "Beta"]);

        assert!(store.ai_translation_set(0, 2).is_empty());
        assert!(store.ai_translation_set(1, 1).is_empty());
        assert_eq!(store.ai_translation_set(10, 2).len(), 1);
    }
}
