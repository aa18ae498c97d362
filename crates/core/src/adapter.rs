use crate::fields::{process_fields_map, FieldMap};
use crate::mapper::{parse_response, AggregationEdgeMapper};
use crate::query_dsl::build_query;
use crate::traits::QueryExecutor;
use crate::{AdapterError, PageResult, RequestOptions};
use tracing::{debug, info};

pub struct UncommonProcessesAdapter<E>
where
    E: QueryExecutor,
{
    executor: E,
    field_map: FieldMap,
}

impl<E> UncommonProcessesAdapter<E>
where
    E: QueryExecutor + Send + Sync,
{
    pub fn new(executor: E) -> Self {
        Self::with_field_map(executor, process_fields_map())
    }

    pub fn with_field_map(executor: E, field_map: FieldMap) -> Self {
        Self {
            executor,
            field_map,
        }
    }

    pub async fn get_uncommon_processes(
        &self,
        options: &RequestOptions,
    ) -> Result<PageResult, AdapterError> {
        let body = build_query(options, &self.field_map)?;
        debug!(
            index = %options.source_configuration.index,
            limit = options.pagination.limit,
            "querying uncommon processes"
        );

        let response = self
            .executor
            .search(&options.source_configuration.index, &body)
            .await?;
        let aggregation = parse_response(&response)?;

        let page = AggregationEdgeMapper::new(&self.field_map).map_to_page(
            &aggregation,
            &options.pagination,
            &options.fields,
        )?;

        info!(
            buckets = aggregation.buckets.len(),
            edges = page.edges.len(),
            total_count = page.total_count,
            has_next_page = page.page_info.has_next_page,
            "uncommon processes page ready"
        );
        Ok(page)
    }
}
