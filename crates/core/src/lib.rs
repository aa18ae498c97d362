pub mod adapter;
pub mod error;
pub mod fields;
pub mod mapper;
pub mod models;
pub mod query_dsl;
pub mod stores;
pub mod traits;

pub use adapter::UncommonProcessesAdapter;
pub use error::{AdapterError, Result};
pub use fields::{process_fields_map, FieldMap};
pub use mapper::{parse_response, AggregationEdgeMapper};
pub use models::{
    AggregationResponse, Bucket, CursorType, Edge, Hit, HostBucket, PageInfo, PageResult,
    PaginationInput, ProcessNode, RequestOptions, SourceConfiguration, TimerangeInput,
};
pub use query_dsl::build_query;
pub use stores::ElasticsearchExecutor;
pub use traits::QueryExecutor;
