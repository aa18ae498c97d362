pub mod elasticsearch;

pub use elasticsearch::ElasticsearchExecutor;
