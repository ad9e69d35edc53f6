//! Batch barrier, interval saves and ledger updates of the scheduler

mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{FetchEvent, HOST, ScriptedFetcher, product_page, url};
use tyre_crawler_lib::crawling::{BatchScheduler, TargetScope, UrlPipeline};
use tyre_crawler_lib::domain::LedgerKind;
use tyre_crawler_lib::infrastructure::config::{CrawlSettings, RetrySettings, StorageSettings};
use tyre_crawler_lib::infrastructure::ledger_store::Ledger;
use tyre_crawler_lib::infrastructure::parsing::TyreDetailParser;
use tyre_crawler_lib::infrastructure::record_store::RecordStore;

struct Fixture {
    _dir: TempDir,
    urls: Vec<String>,
    fetcher: Arc<ScriptedFetcher>,
    storage: StorageSettings,
}

fn fixture(count: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let urls: Vec<String> = (0..count).map(|i| url(&format!("tyre/{i}"))).collect();

    let mut fetcher = ScriptedFetcher::new();
    for (i, u) in urls.iter().enumerate() {
        // later URLs in a batch finish first
        let latency = Duration::from_millis(100 * (5 - (i % 5) as u64));
        fetcher = fetcher
            .page(u, product_page(&format!("Brand Model {i}"), "205/55R16"))
            .latency(u, latency);
    }

    let storage = StorageSettings {
        data_dir: dir.path().to_path_buf(),
        ..StorageSettings::default()
    };

    Fixture {
        _dir: dir,
        urls,
        fetcher: Arc::new(fetcher),
        storage,
    }
}

fn scheduler(fixture: &Fixture, settings: &CrawlSettings) -> BatchScheduler {
    let pipeline = UrlPipeline::new(
        fixture.fetcher.clone(),
        TyreDetailParser::new().unwrap(),
        TargetScope::new([HOST]),
        &RetrySettings::default(),
    );
    BatchScheduler::new(pipeline, RecordStore::new(&fixture.storage), settings)
}

fn settings(batch_size: usize, save_interval: usize) -> CrawlSettings {
    CrawlSettings {
        batch_size,
        save_interval,
        batch_delay_ms: 500,
        ..CrawlSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn next_batch_waits_for_previous_to_settle() {
    let fixture = fixture(12);
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();

    let report = scheduler(&fixture, &settings(5, 10))
        .run(&fixture.urls, &mut ledger)
        .await;
    assert_eq!(report.batches, 3);
    assert_eq!(report.processed, 12);

    let batch_of = |u: &str| fixture.urls.iter().position(|x| x == u).unwrap() / 5;
    let events = fixture.fetcher.events();

    for (index, event) in events.iter().enumerate() {
        if let FetchEvent::Started(started) = event {
            let batch = batch_of(started.as_str());
            let earlier = &events[..index];
            let settled_before = fixture
                .urls
                .iter()
                .filter(|u| batch_of(u.as_str()) + 1 == batch)
                .all(|u| earlier.contains(&FetchEvent::Finished(u.clone())));
            assert!(settled_before, "{started} started before batch {} settled", batch - 1);
        }
    }

    // every fetch of a batch is in flight before any of them finishes
    let first_finish = events
        .iter()
        .position(|e| matches!(e, FetchEvent::Finished(_)))
        .unwrap();
    assert_eq!(first_finish, 5);
}

async fn on_disk_success_urls(storage: &StorageSettings) -> Vec<String> {
    let ledger = Ledger::open(storage).await.unwrap();
    ledger.set(LedgerKind::Success).urls().to_vec()
}

async fn stored_urls(storage: &StorageSettings) -> Vec<String> {
    let records = RecordStore::new(storage).load().await.unwrap();
    records.into_iter().map(|r| r.url).collect()
}

#[tokio::test(start_paused = true)]
async fn interval_save_merges_all_unsaved_records() {
    let fixture = fixture(12);
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();

    let report = scheduler(&fixture, &settings(5, 10))
        .run(&fixture.urls, &mut ledger)
        .await;

    // processed count crosses 10 after the second batch only
    assert_eq!(report.saved, 10);
    assert_eq!(report.records.len(), 12);
    assert_eq!(report.held_success, fixture.urls[10..].to_vec());

    assert_eq!(stored_urls(&fixture.storage).await, fixture.urls[..10].to_vec());
    assert_eq!(on_disk_success_urls(&fixture.storage).await, fixture.urls[..10].to_vec());
}

#[tokio::test(start_paused = true)]
async fn success_entries_wait_for_their_records() {
    let fixture = fixture(5);
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();

    // one batch with default settings, then the process stops
    let report = scheduler(&fixture, &CrawlSettings::default())
        .run(&fixture.urls, &mut ledger)
        .await;

    assert_eq!(report.processed, 5);
    assert_eq!(report.saved, 0);
    assert_eq!(report.held_success, fixture.urls);
    assert_eq!(ledger.len(LedgerKind::Success), 0);
    assert!(stored_urls(&fixture.storage).await.is_empty());
    assert!(on_disk_success_urls(&fixture.storage).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn ledger_and_store_advance_together_when_saving_every_batch() {
    let fixture = fixture(7);
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();

    let report = scheduler(&fixture, &settings(5, 1))
        .run(&fixture.urls, &mut ledger)
        .await;

    assert_eq!(report.saved, 7);
    assert!(report.held_success.is_empty());
    assert_eq!(ledger.len(LedgerKind::Success), 7);
    assert_eq!(on_disk_success_urls(&fixture.storage).await, fixture.urls);
    assert_eq!(stored_urls(&fixture.storage).await, fixture.urls);
}

#[tokio::test(start_paused = true)]
async fn failed_saves_keep_records_queued() {
    let fixture = fixture(12);
    std::fs::create_dir_all(fixture.storage.records_path()).unwrap();
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();

    let report = scheduler(&fixture, &settings(5, 5))
        .run(&fixture.urls, &mut ledger)
        .await;

    assert_eq!(report.processed, 12);
    assert_eq!(report.succeeded, 12);
    assert_eq!(report.saved, 0);
    assert_eq!(report.held_success, fixture.urls);
    assert!(on_disk_success_urls(&fixture.storage).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn inter_batch_delay_is_skipped_after_last_batch() {
    let fixture = fixture(10);
    let mut ledger = Ledger::open(&fixture.storage).await.unwrap();
    let started = tokio::time::Instant::now();

    scheduler(&fixture, &settings(5, 100))
        .run(&fixture.urls, &mut ledger)
        .await;

    // two batches of at most 500ms latency, one 500ms pause between them
    assert!(started.elapsed() < Duration::from_millis(1600));
    assert!(started.elapsed() >= Duration::from_millis(1500));
}
