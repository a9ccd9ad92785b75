//! Results import integration tests

use std::sync::Arc;
use std::time::Duration;

use phoenix_ingest::{
    DATA_SOURCE_MAP_KEY, DataSourceMapReader, ImportSummary, IngestError, ResultsDocument,
    ResultsImporter, UNIQUE_METRICS_KEY, UNSPECIFIED, metric_hosts_key,
};
use phoenix_lock::{GuardedCache, LockConfig, LockError};
use phoenix_store::testing::FaultyStore;
use phoenix_store::{KvStore, MemoryKvStore, StoreError};
use serde_json::{Value, json};

fn results() -> ResultsDocument {
    ResultsDocument::from_json(
        &json!({
            "hosts": [
                {
                    "memcache_key": "host:1",
                    "metrics": {"cpu": {"value": 0.25}, "mem": {"value": 512}},
                    "mtime": 1700000000
                },
                {
                    "memcache_key": "host:2",
                    "metrics": {"cpu": {"value": 0.75}}
                }
            ],
            "hosts_by_metric": {
                "cpu": ["web-1", "web-2"],
                "mem": ["web-1"]
            },
            "unique_metrics": ["cpu", "mem"]
        })
        .to_string(),
    )
    .unwrap()
}

async fn stored_json(store: &dyn KvStore, key: &str) -> Option<Value> {
    store
        .get(key)
        .await
        .unwrap()
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
}

// ============== Import ==============

#[tokio::test]
async fn test_import_writes_hosts_and_metric_maps() {
    let store = Arc::new(MemoryKvStore::new());
    store
        .set(
            "host:1",
            br#"{"name":"web-1","metrics":{"old":{"value":1}},"mtime":1}"#,
            None,
        )
        .await
        .unwrap();
    let importer = ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()));

    let summary = importer.import(&results()).await.unwrap();

    assert_eq!(
        summary,
        ImportSummary {
            hosts_updated: 2,
            metric_maps_written: 2,
            unique_metrics: 2,
        }
    );
    assert_eq!(summary, ImportSummary::planned(&results()));
    assert_eq!(
        stored_json(store.as_ref(), "host:1").await,
        Some(json!({
            "name": "web-1",
            "metrics": {"cpu": {"value": 0.25}, "mem": {"value": 512}},
            "mtime": 1700000000
        }))
    );
    assert_eq!(
        stored_json(store.as_ref(), "host:2").await,
        Some(json!({"metrics": {"cpu": {"value": 0.75}}}))
    );
    assert_eq!(
        stored_json(store.as_ref(), &metric_hosts_key("cpu")).await,
        Some(json!(["web-1", "web-2"]))
    );
    assert_eq!(
        stored_json(store.as_ref(), &metric_hosts_key("mem")).await,
        Some(json!(["web-1"]))
    );
    assert_eq!(
        stored_json(store.as_ref(), UNIQUE_METRICS_KEY).await,
        Some(json!(["cpu", "mem"]))
    );

    // no lock keys left behind
    assert_eq!(store.get("lock;host:1").await.unwrap(), None);
    assert_eq!(store.get("lock;host:2").await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_import_times_out_on_held_host() {
    let store = Arc::new(MemoryKvStore::new());
    store
        .insert_if_absent("lock;host:1", b"other-writer", Duration::from_secs(30))
        .await
        .unwrap();
    let importer = ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()))
        .with_lock_timeout(Duration::from_secs(1));

    let err = importer.import(&results()).await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Lock(LockError::LockTimeout { ref key, .. }) if key == "host:1"
    ));
    // stopped before anything else was written
    assert_eq!(store.get("host:1").await.unwrap(), None);
    assert_eq!(store.get("host:2").await.unwrap(), None);
    assert_eq!(store.get(UNIQUE_METRICS_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_import_proceeds_when_lock_store_unavailable() {
    let store = Arc::new(FaultyStore::new(Arc::new(MemoryKvStore::new())));
    store.fail_inserts(true);
    let importer = ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()));

    let summary = importer.import(&results()).await.unwrap();

    assert_eq!(summary.hosts_updated, 2);
    assert_eq!(
        stored_json(store.as_ref(), "host:2").await,
        Some(json!({"metrics": {"cpu": {"value": 0.75}}}))
    );
}

#[tokio::test]
async fn test_import_surfaces_unguarded_write_failure() {
    let store = Arc::new(FaultyStore::new(Arc::new(MemoryKvStore::new())));
    store.fail_writes(true);
    let importer = ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()));

    let err = importer
        .import(&ResultsDocument::default())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Store(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn test_import_surfaces_guarded_write_failure() {
    let store = Arc::new(FaultyStore::new(Arc::new(MemoryKvStore::new())));
    store.fail_writes(true);
    let importer = ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()));

    let err = importer.import(&results()).await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Lock(LockError::Store(StoreError::Unavailable(_)))
    ));
}

// ============== Data Source Map ==============

#[tokio::test]
async fn test_device_names_after_import() {
    let store = Arc::new(MemoryKvStore::new());
    store
        .set(
            DATA_SOURCE_MAP_KEY,
            json!({"unspecified": {"unspecified": {"rrd-a": "host:1", "rrd-b": "host:2"}}})
                .to_string()
                .as_bytes(),
            None,
        )
        .await
        .unwrap();
    store
        .set("host:1", br#"{"name":"web-1"}"#, None)
        .await
        .unwrap();
    store
        .set("host:2", br#"{"name":"web-2"}"#, None)
        .await
        .unwrap();

    ResultsImporter::new(GuardedCache::new(store.clone(), LockConfig::default()))
        .import(&results())
        .await
        .unwrap();

    let names = DataSourceMapReader::new(store)
        .device_names(UNSPECIFIED, UNSPECIFIED)
        .await
        .unwrap();

    assert_eq!(names.len(), 2);
    assert_eq!(names["web-1"], "rrd-a");
    assert_eq!(names["web-2"], "rrd-b");
}
