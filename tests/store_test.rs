use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

use translation_review::models::{AiResponse, AiResult, EntryFields, Scores, MERGE_ERROR_MESSAGE};
use translation_review::{ResultStore, ReviewError};

fn fields(file: &str, property: &str, en: &str, fr: &str) -> EntryFields {
    EntryFields {
        file_name: Some(file.to_string()),
        property_name: Some(property.to_string()),
        en: Some(en.to_string()),
        fr: Some(fr.to_string()),
        ..EntryFields::default()
    }
}

fn scores(translation: u8, consistency: u8) -> Scores {
    Scores {
        ai_translation_score: translation,
        ai_consistency_score: consistency,
        ai_comments: None,
        ai_suggestion: None,
    }
}

fn response(key: u64, en: &str, fr: &str) -> AiResponse {
    AiResponse {
        key,
        en: Some(en.to_string()),
        fr: Some(fr.to_string()),
        scores: scores(4, 5),
    }
}

fn memory_store() -> ResultStore {
    ResultStore::in_dir(std::path::Path::new("unused"))
}

fn sample_store() -> ResultStore {
    let mut store = memory_store();
    store.add_entries(vec![
        fields("menu", "open", "Open", "Ouvrir"),
        fields("menu", "placeholder", "Title", "undefined"),
        fields("menu", "close", "Close", "Fermer"),
        fields("menu", "ok", "OK", "ok"),
        fields("menu", "todo", "Later", "later_fr"),
        fields("menu", "help", "Help", "Aide"),
    ]);
    store
}

#[test]
fn test_reextraction_replaces_entry() {
    let mut store = memory_store();
    let mut first = fields("menu", "open", "Open", "Ouvrir");
    first.component = Some("Toolbar".to_string());
    store.add_entries(vec![first]);

    let mut second = fields("menu", "open", "Open file", "Ouvrir le fichier");
    second.path = Some("/menu/file".to_string());
    store.add_entries(vec![second]);

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "menu-open");
    assert_eq!(entries[0].fields.en.as_deref(), Some("Open file"));
    assert_eq!(entries[0].fields.path.as_deref(), Some("/menu/file"));
    // last write wins wholesale
    assert_eq!(entries[0].fields.component, None);
}

#[test]
fn test_entries_carry_derived_flag() {
    let store = sample_store();
    let flags: Vec<(String, bool)> = store
        .entries()
        .into_iter()
        .map(|e| (e.key, e.include_for_ai.unwrap_or_default()))
        .collect();

    assert_eq!(
        flags,
        vec![
            ("menu-open".to_string(), true),
            ("menu-placeholder".to_string(), false),
            ("menu-close".to_string(), true),
            ("menu-ok".to_string(), false),
            ("menu-todo".to_string(), false),
            ("menu-help".to_string(), true),
        ]
    );
}

#[test]
fn test_next_request_set_in_insertion_order() {
    let mut store = sample_store();
    let batch = store.next_ai_request_set(2);

    assert_eq!(batch.len(), 2);
    assert_eq!((batch[0].key, batch[0].en.as_str()), (0, "Open"));
    assert_eq!((batch[1].key, batch[1].en.as_str()), (1, "Close"));
}

#[test]
fn test_next_request_set_is_repeatable_until_scored() {
    let mut store = sample_store();
    let first = store.next_ai_request_set(10);
    let second = store.next_ai_request_set(10);
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);

    let report = store.add_ai_responses(first.iter().map(|t| response(t.key, &t.en, &t.fr)));
    assert_eq!(report.merged, 3);
    assert!(store.next_ai_request_set(10).is_empty());
}

#[test]
fn test_numeric_keys_never_reassigned() {
    let mut store = sample_store();
    let first = store.next_ai_request_set(1);
    assert_eq!(first[0].key, 0);
    store.add_ai_responses(vec![response(0, "Open", "Ouvrir")]);

    store.add_entries(vec![fields("dialog", "cancel", "Cancel", "Annuler")]);
    let next = store.next_ai_request_set(10);
    let keys: Vec<u64> = next.iter().map(|t| t.key).collect();
    assert_eq!(keys, vec![1, 2, 3]);

    assert_eq!(store.key_map().resolve(0), Some("menu-open"));
    assert_eq!(store.key_map().resolve(3), Some("dialog-cancel"));
}

#[test]
fn test_drift_detection() {
    let mut store = memory_store();
    store.add_entries(vec![fields("A", "B", "Hello", "Bonjour")]);

    let drifted = store.add_result(AiResult {
        key: "A-B".to_string(),
        fields: EntryFields {
            en: Some("Hello".to_string()),
            fr: Some("Salut".to_string()),
            ..EntryFields::default()
        },
        scores: scores(3, 4),
        ai_result_available: false,
        drift: None,
    });
    assert!(drifted);

    let merged = &store.results()[0];
    assert!(merged.ai_result_available);
    assert_eq!(merged.fields.file_name.as_deref(), Some("A"));
    assert_eq!(merged.fields.fr.as_deref(), Some("Salut"));

    let drift = merged.drift.as_ref().unwrap();
    assert_eq!(drift.merge_error, MERGE_ERROR_MESSAGE);
    assert_eq!(drift.entry_fr.as_deref(), Some("Bonjour"));
    assert_eq!(drift.ai_fr.as_deref(), Some("Salut"));
    assert_eq!(drift.entry_en.as_deref(), Some("Hello"));
    assert_eq!(drift.ai_en.as_deref(), Some("Hello"));
}

#[test]
fn test_merge_without_entry() {
    let mut store = memory_store();
    let result = AiResult {
        key: "X-Y".to_string(),
        fields: fields("X", "Y", "Yes", "Oui"),
        scores: scores(5, 5),
        ai_result_available: false,
        drift: None,
    };

    assert!(!store.add_result(result.clone()));
    assert_eq!(
        store.results(),
        &[AiResult {
            ai_result_available: true,
            ..result
        }]
    );
}

#[test]
fn test_rescoring_overwrites_in_place() {
    let mut store = sample_store();
    let batch = store.next_ai_request_set(2);
    store.add_ai_responses(batch.iter().map(|t| response(t.key, &t.en, &t.fr)));

    let mut rescored = response(0, "Open", "Ouvrir");
    rescored.scores = scores(2, 2);
    store.add_ai_responses(vec![rescored]);

    assert_eq!(store.results().len(), 2);
    assert_eq!(store.results()[0].key, "menu-open");
    assert_eq!(store.results()[0].scores.ai_translation_score, 2);
}

#[test]
fn test_unknown_numeric_key_is_reported() {
    let mut store = sample_store();
    store.next_ai_request_set(1);

    let report = store.add_ai_responses(vec![response(0, "Open", "Ouvrir"), response(42, "Ghost", "Fantome")]);
    assert_eq!(report.merged, 1);
    assert_eq!(report.unresolved, vec![42]);
    assert_eq!(store.results().len(), 1);
}

#[test]
fn test_translation_set_sorted_by_natural_key() {
    let store = sample_store();
    let corpus = store.ai_translation_set(0, 0);
    let en: Vec<&str> = corpus.iter().map(|p| p.en.as_str()).collect();
    // menu-close, menu-help, menu-open
    assert_eq!(en, vec!["Close", "Help", "Open"]);

    let window = store.ai_translation_set(2, 1);
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].fr, "Aide");
}

#[test]
fn test_translation_window_ends_at_length() {
    let mut store = memory_store();
    store.add_entries(vec![
        fields("C", "1", "Gamma", "Gamma fr"),
        fields("A", "1", "Alpha", "Alpha fr"),
        fields("B", "1", "Beta", "Beta fr"),
    ]);

    let en = |length, start| -> Vec<String> {
        store.ai_translation_set(length, start).into_iter().map(|p| p.en).collect()
    };
    assert_eq!(en(2, 1), vec!["Beta"]);
    assert_eq!(en(3, 1), vec!["Beta", "Gamma"]);
    assert_eq!(en(2, 0), vec!["Alpha", "Beta"]);
    assert!(en(1, 2).is_empty());
    assert_eq!(en(0, 0).len(), 3);
}

#[test]
fn test_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(dir.path());
    store.add_entries(vec![
        fields("menu", "open", "Open", "Ouvrir"),
        EntryFields {
            path: Some("/dialog".to_string()),
            component: Some("Dialog".to_string()),
            ..fields("dialog", "title", "Title", "undefined")
        },
    ]);
    store.save_entries().unwrap();

    let written = fs::read_to_string(&store.paths().entries).unwrap();
    assert!(written.contains("\n    {"));
    assert!(written.contains("\"includeForAi\": true"));

    let mut reloaded = ResultStore::in_dir(dir.path());
    reloaded.load().unwrap();

    let original: Vec<_> = store.entries().into_iter().map(|e| (e.key, e.fields)).collect();
    let restored: Vec<_> = reloaded.entries().into_iter().map(|e| (e.key, e.fields)).collect();
    assert_eq!(original, restored);
}

#[test]
fn test_persisted_key_map_resolves_after_restart() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(dir.path());
    store.add_entries(vec![fields("menu", "open", "Open", "Ouvrir"), fields("menu", "close", "Close", "Fermer")]);
    store.save_entries().unwrap();
    let batch = store.next_ai_request_set(2);
    store.save_key_map().unwrap();

    let mut restarted = ResultStore::in_dir(dir.path());
    restarted.load().unwrap();
    let report = restarted.add_ai_responses(batch.iter().map(|t| response(t.key, &t.en, &t.fr)));

    assert_eq!(report.merged, 2);
    assert!(report.unresolved.is_empty());
    assert_eq!(restarted.results()[1].key, "menu-close");
}

#[test]
fn test_load_without_files_starts_empty() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(&dir.path().join("fresh"));
    store.load().unwrap();
    assert!(store.entries().is_empty());
    assert!(store.results().is_empty());
    assert!(store.key_map().is_empty());
}

#[test]
fn test_load_rejects_corrupt_entries() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(dir.path());
    fs::write(&store.paths().entries, "{ not json").unwrap();
    assert!(matches!(store.load(), Err(ReviewError::Serialization(_))));
}

#[test]
fn test_load_tolerates_corrupt_results() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(dir.path());
    store.add_entries(vec![fields("menu", "open", "Open", "Ouvrir")]);
    store.save_entries().unwrap();
    fs::write(&store.paths().results, "[{\"broken\": ").unwrap();

    let mut reloaded = ResultStore::in_dir(dir.path());
    reloaded.load().unwrap();
    assert_eq!(reloaded.entries().len(), 1);
    assert!(reloaded.results().is_empty());
}

#[test]
fn test_save_translations_writes_corpus() {
    let dir = tempdir().unwrap();
    let mut store = ResultStore::in_dir(dir.path());
    store.add_entries(vec![fields("b", "1", "Beta", "Bêta"), fields("a", "1", "Alpha", "Alpha fr")]);
    store.save_translations().unwrap();

    let corpus: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&store.paths().translations).unwrap()).unwrap();
    assert_eq!(corpus[0], serde_json::json!({"en": "Alpha", "fr": "Alpha fr"}));
    assert_eq!(corpus[1], serde_json::json!({"en": "Beta", "fr": "Bêta"}));
}

fn excluded_pair() -> impl Strategy<Value = (String, String)> {
    prop_oneof![
        "[A-Za-z ]{1,12}".prop_map(|en| (en, "undefined".to_string())),
        "[A-Za-z ]{1,12}".prop_map(|en| (en, "Data?".to_string())),
        ("[A-Za-z ]{1,12}", "[a-z]{0,8}").prop_map(|(en, stem)| (en, format!("{stem}_FR"))),
        "[A-Za-z]{1,3}".prop_map(|en| (en.clone(), en.to_uppercase())),
    ]
}

proptest! {
    #[test]
    fn prop_excluded_entries_never_selected(
        excluded in prop::collection::vec(excluded_pair(), 1..20),
        batch in 1usize..50,
        start in 0usize..5,
    ) {
        let mut store = memory_store();
        store.add_entries(
            excluded
                .iter()
                .enumerate()
                .map(|(i, (en, fr))| fields("bad", &i.to_string(), en, fr)),
        );
        store.add_entries(vec![fields("good", "1", "Welcome", "Bienvenue")]);

        let requested = store.next_ai_request_set(batch);
        prop_assert_eq!(requested.len(), 1);
        prop_assert_eq!(requested[0].en.as_str(), "Welcome");

        prop_assert!(store.ai_translation_set(batch, start).iter().all(|p| p.en == "Welcome"));
        prop_assert_eq!(store.ai_translation_set(0, 0).len(), 1);
    }

    #[test]
    fn prop_numeric_keys_strictly_increasing(count in 1usize..30, batch in 1usize..10) {
        let mut store = memory_store();
        store.add_entries((0..count).map(|i| fields("f", &i.to_string(), &format!("Text {i}"), &format!("Texte {i}"))));

        let mut seen = Vec::new();
        loop {
            let next = store.next_ai_request_set(batch);
            if next.is_empty() {
                break;
            }
            store.add_ai_responses(next.iter().map(|t| response(t.key, &t.en, &t.fr)));
            seen.extend(next.into_iter().map(|t| t.key));
        }

        prop_assert_eq!(seen, (0..count as u64).collect::<Vec<_>>());
    }

    #[test]
    fn prop_reextraction_keeps_one_entry_per_key(texts in prop::collection::vec("[A-Za-z]{4,10}", 1..10)) {
        let mut store = memory_store();
        for text in &texts {
            store.add_entries(vec![fields("menu", "open", text, text)]);
        }
        let entries = store.entries();
        prop_assert_eq!(entries.len(), 1);
        prop_assert_eq!(entries[0].fields.en.as_deref(), texts.last().map(String::as_str));
    }
}
