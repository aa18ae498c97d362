use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

/// One representative document returned by the `top_hits` sub-aggregation.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub document_type: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "sort", default)]
    pub sort_values: Vec<Value>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostBucket {
    pub key: String,
}

/// One `group_by_process` bucket, flattened out of the engine's nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub hits: Vec<Hit>,
    pub total: u64,
    pub host_buckets: Vec<HostBucket>,
}

/// Buckets plus the `process_count` cardinality of a single search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResponse {
    pub buckets: Vec<Bucket>,
    pub total_count: u64,
}

// Engine-side bucket layout:
// {key, process: {hits: {total, hits: [..]}}, hosts: {buckets: [{key}]}}
#[derive(Debug, Deserialize)]
pub(crate) struct RawBucket {
    key: String,
    process: RawTopHits,
    hosts: RawHostsAggregation,
}

#[derive(Debug, Deserialize)]
struct RawTopHits {
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: HitsTotal,
    hits: Vec<Hit>,
}

// Pre-7.x clusters report a bare integer, newer ones `{value, relation}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitsTotal {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct RawHostsAggregation {
    #[serde(default)]
    buckets: Vec<HostBucket>,
}

impl From<RawBucket> for Bucket {
    fn from(raw: RawBucket) -> Self {
        let total = match raw.process.hits.total {
            HitsTotal::Count(value) | HitsTotal::Object { value } => value,
        };
        Self {
            key: raw.key,
            hits: raw.process.hits.hits,
            total,
            host_buckets: raw.hosts.buckets,
        }
    }
}

/// Pagination continuation token. `value` is empty, never absent, when the
/// hit carried no cursor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CursorType {
    pub value: String,
    pub tiebreaker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessNode {
    pub id: String,
    pub instances: u64,
    pub hosts: Vec<String>,
    /// Requested fields projected out of the hit's `_source`, nested by dotted name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub node: ProcessNode,
    pub cursor: CursorType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub edges: Vec<Edge>,
    pub total_count: u64,
    pub page_info: PageInfo,
}

/// Index and field names of the process event source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfiguration {
    pub index: String,
    pub timestamp_field: String,
    pub process_field: String,
    pub host_field: String,
    /// Upper bound on distinct hosts listed per process group.
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,
}

fn default_max_hosts() -> usize {
    100
}

impl Default for SourceConfiguration {
    fn default() -> Self {
        Self {
            index: "auditbeat-*".to_string(),
            timestamp_field: "@timestamp".to_string(),
            process_field: "process.name".to_string(),
            host_field: "host.name".to_string(),
            max_hosts: default_max_hosts(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationInput {
    pub limit: usize,
}

/// Inclusive time window in epoch milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerangeInput {
    pub from: i64,
    pub to: i64,
}

impl TimerangeInput {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: from.timestamp_millis(),
            to: to.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default)]
    pub source_configuration: SourceConfiguration,
    pub pagination: PaginationInput,
    pub fields: Vec<String>,
    pub timerange: TimerangeInput,
    /// Either a JSON object or a string holding serialized JSON.
    #[serde(default)]
    pub filter_query: Option<Value>,
}
