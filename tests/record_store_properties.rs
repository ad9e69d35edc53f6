//! Merge dedup and flush/reload round-trip of the record store

use proptest::prelude::*;
use std::collections::HashSet;
use tempfile::TempDir;

use tyre_crawler_lib::domain::TyreRecord;
use tyre_crawler_lib::infrastructure::config::StorageSettings;
use tyre_crawler_lib::infrastructure::record_store::RecordStore;

fn record(id: u8, complete: bool) -> TyreRecord {
    let mut record = TyreRecord::empty(format!("https://shop.test/tyre/{id}"));
    record.name = format!("Brand Model {id}");
    if complete {
        record.size = "195/65R15".to_string();
    }
    record
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn urls_stay_unique_across_merges(
        batches in prop::collection::vec(
            prop::collection::vec((0u8..20, any::<bool>()), 0..8),
            1..5,
        )
    ) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(&StorageSettings {
            data_dir: dir.path().to_path_buf(),
            ..StorageSettings::default()
        });

        let mut expected = HashSet::new();
        let rt = runtime();
        for batch in &batches {
            let records: Vec<_> = batch
                .iter()
                .map(|(id, complete)| record(*id, *complete))
                .collect();
            rt.block_on(store.merge_and_flush(&records, false)).unwrap();
            for record in records.iter().filter(|r| r.is_complete()) {
                expected.insert(record.url.clone());
            }
        }

        let stored = rt.block_on(store.load()).unwrap();
        let urls: Vec<_> = stored.iter().map(|r| r.url.clone()).collect();
        let unique: HashSet<_> = urls.iter().cloned().collect();

        prop_assert_eq!(urls.len(), unique.len());
        prop_assert_eq!(unique, expected);
        prop_assert!(stored.iter().all(TyreRecord::is_complete));
    }
}

#[tokio::test]
async fn reload_returns_what_was_merged() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(&StorageSettings {
        data_dir: dir.path().to_path_buf(),
        ..StorageSettings::default()
    });

    let merged = vec![record(1, true), record(2, true), record(3, true)];
    store.merge_and_flush(&merged, true).await.unwrap();

    let reloaded = store.load().await.unwrap();
    assert_eq!(reloaded, merged);
}
