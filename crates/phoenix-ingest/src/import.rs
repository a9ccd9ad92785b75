//! Results import
//!
//! Host records are shared with other writers, so each one is updated with a
//! guarded modify that replaces only `metrics` (and `mtime` when known). The
//! metric maps are owned by this import and are written directly.

use std::time::Duration;

use phoenix_lock::{GuardedCache, ModifyOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::model::{HostResult, ResultsDocument};
use crate::{UNIQUE_METRICS_KEY, metric_hosts_key};

/// Counts of what an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub hosts_updated: usize,
    pub metric_maps_written: usize,
    pub unique_metrics: usize,
}

impl ImportSummary {
    /// What importing `results` would write, without touching the cache
    pub fn planned(results: &ResultsDocument) -> Self {
        Self {
            hosts_updated: results.hosts.len(),
            metric_maps_written: results.hosts_by_metric.len(),
            unique_metrics: results.unique_metrics.len(),
        }
    }
}

pub struct ResultsImporter {
    cache: GuardedCache,
    lock_timeout: Option<Duration>,
}

impl ResultsImporter {
    pub fn new(cache: GuardedCache) -> Self {
        Self {
            cache,
            lock_timeout: None,
        }
    }

    /// Override the lock configuration's acquisition timeout for host updates
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Record `results` in the cache.
    ///
    /// Stops at the first failure; hosts already updated stay updated.
    pub async fn import(&self, results: &ResultsDocument) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        info!(count = results.hosts.len(), "Updating hosts");
        for host in &results.hosts {
            self.update_host(host).await?;
            summary.hosts_updated += 1;
        }

        info!(
            count = results.hosts_by_metric.len(),
            "Recording metric -> host maps"
        );
        for (metric, hosts) in &results.hosts_by_metric {
            self.write_json(&metric_hosts_key(metric), hosts).await?;
            summary.metric_maps_written += 1;
        }

        info!(count = results.unique_metrics.len(), "Recording unique metrics");
        self.write_json(UNIQUE_METRICS_KEY, &results.unique_metrics)
            .await?;
        summary.unique_metrics = results.unique_metrics.len();

        Ok(summary)
    }

    async fn update_host(&self, host: &HostResult) -> Result<()> {
        let mut options = ModifyOptions::new(Map::new());
        if let Some(timeout) = self.lock_timeout {
            options = options.with_timeout(timeout);
        }

        self.cache
            .modify(
                &host.memcache_key,
                options,
                |record: &mut Map<String, Value>| {
                    record.insert("metrics".to_string(), Value::Object(host.metrics.clone()));
                    if let Some(mtime) = &host.mtime {
                        record.insert("mtime".to_string(), mtime.clone());
                    }
                    Ok::<_, IngestError>(())
                },
            )
            .await?;

        debug!(key = %host.memcache_key, metrics = host.metrics.len(), "Host updated");
        Ok(())
    }

    async fn write_json<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.cache.store().set(key, &bytes, None).await?;
        Ok(())
    }
}
