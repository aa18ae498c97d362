use crate::error::{AdapterError, Result};
use crate::fields::FieldMap;
use crate::models::RequestOptions;
use serde_json::{json, Value};

/// Builds the `_search` body for the uncommon-processes aggregation.
///
/// Groups are ordered rarest first and the terms aggregation asks for one
/// group more than the page size so the mapper can detect a next page.
pub fn build_query(options: &RequestOptions, field_map: &FieldMap) -> Result<Value> {
    let limit = options.pagination.limit;
    if limit == 0 {
        return Err(AdapterError::InvalidArgument(
            "pagination limit must be positive".to_string(),
        ));
    }
    if options.timerange.from > options.timerange.to {
        return Err(AdapterError::InvalidArgument(format!(
            "timerange starts after it ends: {} > {}",
            options.timerange.from, options.timerange.to
        )));
    }

    let source = &options.source_configuration;
    let source_paths = field_map.source_paths(&options.fields);

    Ok(json!({
        "size": 0,
        "track_total_hits": false,
        "query": {
            "bool": {
                "filter": build_filters(options)?
            }
        },
        "aggregations": {
            "process_count": {
                "cardinality": {"field": source.process_field}
            },
            "group_by_process": {
                "terms": {
                    "size": limit + 1,
                    "field": source.process_field,
                    "order": [{"_count": "asc"}, {"_key": "asc"}]
                },
                "aggregations": {
                    "process": {
                        "top_hits": {
                            "size": 1,
                            "sort": [{source.timestamp_field.as_str(): {"order": "desc"}}],
                            "_source": source_paths
                        }
                    },
                    "hosts": {
                        "terms": {"field": source.host_field, "size": source.max_hosts}
                    }
                }
            }
        }
    }))
}

fn build_filters(options: &RequestOptions) -> Result<Vec<Value>> {
    let mut predicates = Vec::new();

    match &options.filter_query {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) if raw.trim().is_empty() => {}
        Some(Value::String(raw)) => {
            let parsed: Value = serde_json::from_str(raw).map_err(|error| {
                AdapterError::InvalidArgument(format!("filter query is not valid JSON: {error}"))
            })?;
            predicates.push(parsed);
        }
        Some(filter @ Value::Object(_)) => predicates.push(filter.clone()),
        Some(other) => {
            return Err(AdapterError::InvalidArgument(format!(
                "filter query must be an object or a JSON string, got {other}"
            )))
        }
    }

    predicates.push(json!({
        "range": {
            options.source_configuration.timestamp_field.as_str(): {
                "gte": options.timerange.from,
                "lte": options.timerange.to,
                "format": "epoch_millis"
            }
        }
    }));

    Ok(predicates)
}
