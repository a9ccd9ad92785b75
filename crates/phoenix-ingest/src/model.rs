//! Results document produced by the metric processing run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Processing results to be recorded in the cache.
///
/// Missing sections are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(default)]
    pub hosts: Vec<HostResult>,
    /// Metric name -> hosts reporting it
    #[serde(default)]
    pub hosts_by_metric: BTreeMap<String, Value>,
    #[serde(default)]
    pub unique_metrics: Vec<Value>,
}

/// Latest metrics for one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResult {
    /// Cache key of the host record
    pub memcache_key: String,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    /// Modification time of the source data, left untouched in the record when absent
    #[serde(default)]
    pub mtime: Option<Value>,
}

impl ResultsDocument {
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_document() {
        let doc = ResultsDocument::from_json(
            &json!({
                "hosts": [
                    {
                        "memcache_key": "host:1",
                        "metrics": {"cpu": {"value": 0.5}},
                        "mtime": 1700000000
                    },
                    {"memcache_key": "host:2", "metrics": {}, "mtime": null}
                ],
                "hosts_by_metric": {"cpu": ["web-1"]},
                "unique_metrics": ["cpu"]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(doc.hosts.len(), 2);
        assert_eq!(doc.hosts[0].mtime, Some(json!(1700000000)));
        assert_eq!(doc.hosts[1].mtime, None);
        assert_eq!(doc.hosts_by_metric["cpu"], json!(["web-1"]));
        assert_eq!(doc.unique_metrics, vec![json!("cpu")]);
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let doc = ResultsDocument::from_json("{}").unwrap();
        assert_eq!(doc, ResultsDocument::default());
    }

    #[test]
    fn test_host_requires_key() {
        let result = ResultsDocument::from_json(r#"{"hosts": [{"metrics": {}}]}"#);
        assert!(result.is_err());
    }
}
