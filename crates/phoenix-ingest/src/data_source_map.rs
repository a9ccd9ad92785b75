//! Read access to the data source map
//!
//! The map is shaped `grid -> cluster -> data source host name -> host record key`.

use std::collections::BTreeMap;
use std::sync::Arc;

use phoenix_store::KvStore;
use serde_json::Value;
use tracing::{debug, warn};

use crate::DATA_SOURCE_MAP_KEY;
use crate::error::{IngestError, Result};

pub struct DataSourceMapReader {
    store: Arc<dyn KvStore>,
}

impl DataSourceMapReader {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The whole map, as stored
    pub async fn load(&self) -> Result<Value> {
        let bytes = self
            .store
            .get(DATA_SOURCE_MAP_KEY)
            .await?
            .ok_or_else(|| IngestError::MissingMap(DATA_SOURCE_MAP_KEY.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Map each device name in `grid`/`cluster` to its data source host name.
    ///
    /// Entries whose host record is missing, unreadable or unnamed are skipped.
    pub async fn device_names(
        &self,
        grid: &str,
        cluster: &str,
    ) -> Result<BTreeMap<String, String>> {
        let map = self.load().await?;
        let hosts = map
            .get(grid)
            .and_then(|clusters| clusters.get(cluster))
            .and_then(Value::as_object)
            .ok_or_else(|| IngestError::MissingCluster {
                grid: grid.to_string(),
                cluster: cluster.to_string(),
            })?;

        let mut names = BTreeMap::new();
        for (source_host, host_key) in hosts {
            let Some(host_key) = host_key.as_str() else {
                warn!(source_host = %source_host, "Host key is not a string, skipping");
                continue;
            };

            match self.device_name(host_key).await? {
                Some(name) => {
                    debug!(device = %name, source_host = %source_host, "Mapped device");
                    names.insert(name, source_host.clone());
                }
                None => warn!(key = %host_key, "Host record has no name, skipping"),
            }
        }

        Ok(names)
    }

    async fn device_name(&self, host_key: &str) -> Result<Option<String>> {
        let Some(bytes) = self.store.get(host_key).await? else {
            return Ok(None);
        };
        let record: Value = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %host_key, error = %e, "Host record is not valid JSON");
                return Ok(None);
            }
        };
        Ok(record.get("name").and_then(Value::as_str).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNSPECIFIED;
    use phoenix_store::MemoryKvStore;
    use serde_json::json;

    async fn seeded(map: Value) -> Arc<MemoryKvStore> {
        let store = Arc::new(MemoryKvStore::new());
        store
            .set(DATA_SOURCE_MAP_KEY, map.to_string().as_bytes(), None)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_load_missing_map() {
        let reader = DataSourceMapReader::new(Arc::new(MemoryKvStore::new()));
        let err = reader.load().await.unwrap_err();
        assert!(matches!(err, IngestError::MissingMap(_)));
    }

    #[tokio::test]
    async fn test_load_returns_map() {
        let map = json!({"unspecified": {"unspecified": {"rrd-1": "host:1"}}});
        let reader = DataSourceMapReader::new(seeded(map.clone()).await);
        assert_eq!(reader.load().await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_json() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(DATA_SOURCE_MAP_KEY, b"not json", None).await.unwrap();
        let err = DataSourceMapReader::new(store).load().await.unwrap_err();
        assert!(matches!(err, IngestError::Json(_)));
    }

    #[tokio::test]
    async fn test_device_names() {
        let store = seeded(json!({
            "unspecified": {"unspecified": {
                "rrd-1": "host:1",
                "rrd-2": "host:2",
                "rrd-3": "host:3",
                "rrd-4": 4
            }}
        }))
        .await;
        store.set("host:1", br#"{"name":"web-1"}"#, None).await.unwrap();
        store.set("host:2", br#"{"ip":"10.0.0.2"}"#, None).await.unwrap();

        let names = DataSourceMapReader::new(store)
            .device_names(UNSPECIFIED, UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!(names.len(), 1);
        assert_eq!(names["web-1"], "rrd-1");
    }

    #[tokio::test]
    async fn test_device_names_missing_cluster() {
        let store = seeded(json!({"unspecified": {"east": {}}})).await;
        let err = DataSourceMapReader::new(store)
            .device_names(UNSPECIFIED, "west")
            .await
            .unwrap_err();

        match err {
            IngestError::MissingCluster { grid, cluster } => {
                assert_eq!(grid, "unspecified");
                assert_eq!(cluster, "west");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
