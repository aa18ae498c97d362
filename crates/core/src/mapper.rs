//! Turns `group_by_process` aggregation buckets into one page of edges.
//!
//! The query asks the engine for `limit + 1` groups; the extra bucket is a
//! lookahead that tells the mapper a next page exists without a second search.

use crate::error::{AdapterError, Result};
use crate::fields::{project_fields, FieldMap};
use crate::models::{
    AggregationResponse, Bucket, CursorType, Edge, PageInfo, PageResult, PaginationInput,
    ProcessNode, RawBucket,
};
use serde::Deserialize;
use serde_json::Value;

const BUCKETS_POINTER: &str = "/aggregations/group_by_process/buckets";
const COUNT_POINTER: &str = "/aggregations/process_count/value";

/// Extracts buckets and the group count from a raw search response.
///
/// A response without the aggregation paths is read as zero results. A bucket
/// that is present but does not have the expected shape is an error.
pub fn parse_response(response: &Value) -> Result<AggregationResponse> {
    let total_count = match response.pointer(COUNT_POINTER) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            AdapterError::MalformedAggregation(format!(
                "process_count.value is not a non-negative integer: {value}"
            ))
        })?,
    };

    let buckets = match response.pointer(BUCKETS_POINTER) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(raw_buckets)) => raw_buckets
            .iter()
            .enumerate()
            .map(|(position, raw)| {
                RawBucket::deserialize(raw).map(Bucket::from).map_err(|error| {
                    AdapterError::MalformedAggregation(format!("bucket {position}: {error}"))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(AdapterError::MalformedAggregation(format!(
                "group_by_process.buckets is not an array: {other}"
            )))
        }
    };

    Ok(AggregationResponse {
        buckets,
        total_count,
    })
}

pub struct AggregationEdgeMapper<'a> {
    field_map: &'a FieldMap,
}

impl<'a> AggregationEdgeMapper<'a> {
    pub fn new(field_map: &'a FieldMap) -> Self {
        Self { field_map }
    }

    pub fn map_to_page(
        &self,
        response: &AggregationResponse,
        pagination: &PaginationInput,
        fields: &[String],
    ) -> Result<PageResult> {
        let limit = pagination.limit;
        if limit == 0 {
            return Err(AdapterError::InvalidArgument(
                "pagination limit must be positive".to_string(),
            ));
        }

        let candidates = response
            .buckets
            .iter()
            .map(|bucket| self.build_edge(bucket, fields))
            .collect::<Result<Vec<_>>>()?;

        let has_next_page = candidates.len() > limit;
        let edges: Vec<Edge> = candidates.into_iter().take(limit).collect();
        let end_cursor = edges.last().map(|edge| edge.cursor.value.clone());

        Ok(PageResult {
            edges,
            total_count: response.total_count,
            page_info: PageInfo {
                has_next_page,
                end_cursor,
            },
        })
    }

    fn build_edge(&self, bucket: &Bucket, fields: &[String]) -> Result<Edge> {
        let hit = bucket.hits.first().ok_or_else(|| {
            AdapterError::MalformedAggregation(format!(
                "bucket {:?} has no top hits",
                bucket.key
            ))
        })?;

        let node = ProcessNode {
            id: hit.id.clone(),
            instances: bucket.total,
            hosts: bucket
                .host_buckets
                .iter()
                .map(|host| host.key.clone())
                .collect(),
            fields: project_fields(fields, self.field_map, &hit.source),
        };

        let cursor = CursorType {
            value: hit
                .cursor
                .as_deref()
                .filter(|cursor| !cursor.is_empty())
                .unwrap_or_default()
                .to_string(),
            tiebreaker: None,
        };

        Ok(Edge { node, cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::process_fields_map;
    use crate::models::{Hit, HostBucket};
    use serde_json::{json, Map};

    fn hit(id: &str, cursor: Option<&str>, source: Value) -> Hit {
        Hit {
            id: id.to_string(),
            index: "auditbeat-7.0.0".to_string(),
            document_type: None,
            score: None,
            source: source.as_object().cloned().unwrap_or_default(),
            sort_values: vec![json!(1_556_000_000_000_i64)],
            cursor: cursor.map(str::to_string),
        }
    }

    fn bucket(key: &str, cursor: Option<&str>, total: u64, hosts: &[&str]) -> Bucket {
        Bucket {
            key: key.to_string(),
            hits: vec![hit(&format!("{key}-hit"), cursor, json!({"process": {"name": key}}))],
            total,
            host_buckets: hosts
                .iter()
                .map(|host| HostBucket {
                    key: host.to_string(),
                })
                .collect(),
        }
    }

    fn response(buckets: Vec<Bucket>, total_count: u64) -> AggregationResponse {
        AggregationResponse {
            buckets,
            total_count,
        }
    }

    fn page(response: &AggregationResponse, limit: usize, fields: &[&str]) -> Result<PageResult> {
        let map = process_fields_map();
        let fields: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
        AggregationEdgeMapper::new(&map).map_to_page(response, &PaginationInput { limit }, &fields)
    }

    fn numbered(count: usize) -> Vec<Bucket> {
        (0..count)
            .map(|index| bucket(&format!("p{index}"), Some(format!("c{index}").as_str()), 1, &[]))
            .collect()
    }

    #[test]
    fn edges_never_exceed_limit() {
        for bucket_count in 0..8 {
            for limit in 1..6 {
                let result = page(&response(numbered(bucket_count), 0), limit, &[]).unwrap();
                assert!(result.edges.len() <= limit);
            }
        }
    }

    #[test]
    fn lookahead_bucket_signals_next_page_and_is_dropped() {
        let result = page(&response(numbered(4), 9), 3, &[]).unwrap();

        assert!(result.page_info.has_next_page);
        let ids: Vec<_> = result.edges.iter().map(|edge| edge.node.id.as_str()).collect();
        assert_eq!(ids, vec!["p0-hit", "p1-hit", "p2-hit"]);
        assert_eq!(result.page_info.end_cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn surplus_buckets_are_clamped_and_flag_next_page() {
        let result = page(&response(numbered(7), 7), 3, &[]).unwrap();

        assert_eq!(result.edges.len(), 3);
        assert!(result.page_info.has_next_page);
        assert_eq!(result.page_info.end_cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn seeded_node_fields_survive_colliding_field_names() {
        let map = FieldMap::new().with("hosts.name", "host.name");
        let mut with_host = bucket("nc", Some("c1"), 5, &["host1"]);
        with_host.hits[0].source = json!({"host": {"name": "web-1"}})
            .as_object()
            .cloned()
            .unwrap();
        let result = AggregationEdgeMapper::new(&map)
            .map_to_page(
                &response(vec![with_host], 1),
                &PaginationInput { limit: 10 },
                &["hosts.name".to_string()],
            )
            .unwrap();

        let node = &result.edges[0].node;
        assert!(node.fields.is_empty());
        assert_eq!(
            serde_json::to_value(node).unwrap(),
            json!({"id": "nc-hit", "instances": 5, "hosts": ["host1"]})
        );
        assert_eq!(
            serde_json::to_string(node).unwrap(),
            r#"{"id":"nc-hit","instances":5,"hosts":["host1"]}"#
        );
    }

    #[test]
    fn exact_page_has_no_next_page() {
        let result = page(&response(numbered(3), 3), 3, &[]).unwrap();

        assert!(!result.page_info.has_next_page);
        assert_eq!(result.edges.len(), 3);
    }

    #[test]
    fn empty_input_yields_empty_page() {
        let result = page(&response(Vec::new(), 0), 10, &["process.name"]).unwrap();

        assert_eq!(result, PageResult::default());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"edges": [], "totalCount": 0, "pageInfo": {"hasNextPage": false}})
        );
    }

    #[test]
    fn hosts_keep_bucket_order() {
        let result = page(&response(vec![bucket("p1", None, 2, &["a", "b"])], 1), 5, &[]).unwrap();

        assert_eq!(result.edges[0].node.hosts, vec!["a", "b"]);
    }

    #[test]
    fn cursor_passes_through_or_defaults_to_empty() {
        let buckets = vec![
            bucket("p1", Some("xyz"), 1, &[]),
            bucket("p2", Some(""), 1, &[]),
            bucket("p3", None, 1, &[]),
        ];
        let result = page(&response(buckets, 3), 5, &[]).unwrap();

        assert_eq!(result.edges[0].cursor.value, "xyz");
        for edge in &result.edges[1..] {
            assert_eq!(edge.cursor.value, "");
            assert_eq!(edge.cursor.tiebreaker, None);
        }
    }

    #[test]
    fn bucket_without_hits_fails_the_whole_page() {
        let mut empty = bucket("broken", None, 0, &[]);
        empty.hits.clear();
        let buckets = vec![bucket("p1", None, 1, &[]), empty];

        let error = page(&response(buckets, 2), 5, &[]).unwrap_err();
        assert!(matches!(error, AdapterError::MalformedAggregation(_)));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let error = page(&response(numbered(1), 1), 0, &[]).unwrap_err();
        assert!(matches!(error, AdapterError::InvalidArgument(_)));
    }

    #[test]
    fn single_bucket_maps_to_documented_shape() {
        let buckets = vec![Bucket {
            key: "p1".to_string(),
            hits: vec![hit("h1", Some("c1"), json!({"process": {"name": "p1"}}))],
            total: 5,
            host_buckets: vec![HostBucket {
                key: "host1".to_string(),
            }],
        }];
        let result = page(&response(buckets, 42), 10, &["_id", "instances", "hosts"]).unwrap();

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "edges": [{
                    "node": {"id": "h1", "instances": 5, "hosts": ["host1"]},
                    "cursor": {"value": "c1", "tiebreaker": null}
                }],
                "totalCount": 42,
                "pageInfo": {
                    "hasNextPage": false,
                    "endCursor": "c1"
                }
            })
        );
    }

    #[test]
    fn requested_source_fields_are_projected() {
        let result = page(
            &response(vec![bucket("sshd", None, 1, &[])], 1),
            5,
            &["process.name", "process.title"],
        )
        .unwrap();

        let mut expected = Map::new();
        expected.insert("process".to_string(), json!({"name": "sshd"}));
        assert_eq!(result.edges[0].node.fields, expected);
    }

    #[test]
    fn parse_tolerates_missing_aggregations() {
        let parsed = parse_response(&json!({"took": 3, "hits": {"hits": []}})).unwrap();
        assert_eq!(parsed, AggregationResponse::default());
    }

    #[test]
    fn parse_reads_buckets_and_count() {
        let raw = json!({
            "aggregations": {
                "process_count": {"value": 7},
                "group_by_process": {
                    "buckets": [{
                        "key": "nc",
                        "doc_count": 3,
                        "process": {"hits": {
                            "total": {"value": 3, "relation": "eq"},
                            "hits": [{
                                "_id": "abc",
                                "_index": "auditbeat",
                                "_score": null,
                                "_source": {"process": {"name": "nc"}},
                                "sort": [1556000000000_i64],
                                "cursor": "c-abc"
                            }]
                        }},
                        "hosts": {"buckets": [{"key": "web-1", "doc_count": 2}, {"key": "web-2", "doc_count": 1}]}
                    }, {
                        "key": "curl",
                        "process": {"hits": {"total": 1, "hits": [{"_id": "def", "_index": "auditbeat", "sort": null}]}},
                        "hosts": {"buckets": []}
                    }]
                }
            }
        });
        let parsed = parse_response(&raw).unwrap();

        assert_eq!(parsed.total_count, 7);
        assert_eq!(parsed.buckets.len(), 2);
        assert_eq!(parsed.buckets[0].total, 3);
        assert_eq!(parsed.buckets[0].hits[0].cursor.as_deref(), Some("c-abc"));
        assert_eq!(parsed.buckets[0].host_buckets.len(), 2);
        assert_eq!(parsed.buckets[1].total, 1);
        assert!(parsed.buckets[1].hits[0].sort_values.is_empty());
        assert!(parsed.buckets[1].hits[0].source.is_empty());
    }

    #[test]
    fn parse_rejects_misshapen_buckets() {
        let missing_hosts = json!({"aggregations": {"group_by_process": {"buckets": [{
            "key": "nc",
            "process": {"hits": {"total": 1, "hits": []}}
        }]}}});
        let bad_cursor = json!({"aggregations": {"group_by_process": {"buckets": [{
            "key": "nc",
            "process": {"hits": {"total": 1, "hits": [{"_id": "a", "_index": "i", "cursor": 12}]}},
            "hosts": {"buckets": []}
        }]}}});
        let bad_count = json!({"aggregations": {"process_count": {"value": "many"}}});

        for raw in [missing_hosts, bad_cursor, bad_count] {
            let error = parse_response(&raw).unwrap_err();
            assert!(matches!(error, AdapterError::MalformedAggregation(_)));
        }
    }
}
