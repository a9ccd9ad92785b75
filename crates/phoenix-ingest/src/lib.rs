//! Phoenix Ingest - moves monitoring results into the shared cache
//!
//! This crate provides:
//! - Results import: per-host metric records updated under the cache lock,
//!   plus the metric-to-host maps and the unique metric list
//! - Data-source-map access: dump the map and resolve device names

pub mod data_source_map;
pub mod error;
pub mod import;
pub mod model;

pub use data_source_map::DataSourceMapReader;
pub use error::{IngestError, Result};
pub use import::{ImportSummary, ResultsImporter};
pub use model::{HostResult, ResultsDocument};

/// Cache key holding the data source map
pub const DATA_SOURCE_MAP_KEY: &str = "hacor:data_source_map";

/// Prefix of the per-metric host list keys
pub const METRIC_HOSTS_KEY_PREFIX: &str = "meryl:metric:";

/// Cache key holding the list of unique metrics
pub const UNIQUE_METRICS_KEY: &str = "meryl:unique_metrics";

/// Grid/cluster used when none is given
pub const UNSPECIFIED: &str = "unspecified";

/// Cache key holding the hosts that report `metric`
pub fn metric_hosts_key(metric: &str) -> String {
    format!("{}{}", METRIC_HOSTS_KEY_PREFIX, metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_metric_hosts_key() {
        assert_eq!(metric_hosts_key("cpu.load"), "meryl:metric:cpu.load");
    }

    proptest! {
        #[test]
        fn metric_hosts_key_round_trips(metric in "[a-zA-Z0-9_.:-]{0,32}") {
            let key = metric_hosts_key(&metric);
            prop_assert_eq!(key.strip_prefix(METRIC_HOSTS_KEY_PREFIX), Some(metric.as_str()));
        }
    }
}
