use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uncommon_processes_core::{
    parse_response, process_fields_map, AggregationEdgeMapper, ElasticsearchExecutor,
    PageResult, PaginationInput, RequestOptions, SourceConfiguration, TimerangeInput,
    UncommonProcessesAdapter,
};

#[derive(Parser)]
#[command(name = "uncommon-processes", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Elasticsearch base URL
    #[arg(long, env = "ES_URL", default_value = "http://localhost:9200")]
    es_url: String,

    /// Index pattern holding process events
    #[arg(long, env = "ES_INDEX", default_value = "auditbeat-*")]
    index: String,

    /// Basic auth username
    #[arg(long, env = "ES_USERNAME")]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "ES_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Query the cluster for the rarest processes in a time window.
    Query {
        /// Window start (RFC 3339).
        #[arg(long)]
        from: DateTime<Utc>,
        /// Window end (RFC 3339).
        #[arg(long)]
        to: DateTime<Utc>,
        /// Page size.
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Field to project into each node; repeatable.
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Extra filter as an Elasticsearch query in JSON.
        #[arg(long)]
        filter_query: Option<String>,
        /// Most hosts listed per process.
        #[arg(long, default_value = "100")]
        max_hosts: usize,
    },
    /// Map a saved search response into a page without contacting the cluster.
    Map {
        /// File holding the raw JSON search response.
        #[arg(long)]
        input: PathBuf,
        /// Page size.
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Field to project into each node; repeatable.
        #[arg(long = "field")]
        fields: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "uncommon-processes boot"
    );

    let page = match cli.command {
        Command::Query {
            from,
            to,
            limit,
            fields,
            filter_query,
            max_hosts,
        } => {
            let mut executor = ElasticsearchExecutor::new(&cli.es_url);
            match (cli.username, cli.password) {
                (Some(username), Some(password)) => {
                    executor = executor.with_basic_auth(username, password);
                }
                (Some(_), None) | (None, Some(_)) => {
                    warn!("ignoring partial credentials; both username and password are required");
                }
                (None, None) => {}
            }

            let options = RequestOptions {
                source_configuration: SourceConfiguration {
                    index: cli.index,
                    max_hosts,
                    ..Default::default()
                },
                pagination: PaginationInput { limit },
                fields: with_default_fields(fields),
                timerange: TimerangeInput::between(from, to),
                filter_query: filter_query.map(serde_json::Value::String),
            };

            UncommonProcessesAdapter::new(executor)
                .get_uncommon_processes(&options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?
        }
        Command::Map {
            input,
            limit,
            fields,
        } => {
            let raw = tokio::fs::read_to_string(&input).await?;
            let response: serde_json::Value = serde_json::from_str(&raw)?;
            map_saved_response(&response, limit, &with_default_fields(fields))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

fn map_saved_response(
    response: &serde_json::Value,
    limit: usize,
    fields: &[String],
) -> anyhow::Result<PageResult> {
    let aggregation =
        parse_response(response).map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let field_map = process_fields_map();
    let page = AggregationEdgeMapper::new(&field_map)
        .map_to_page(&aggregation, &PaginationInput { limit }, fields)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    Ok(page)
}

fn with_default_fields(fields: Vec<String>) -> Vec<String> {
    if fields.is_empty() {
        vec!["_id".to_string(), "process.name".to_string()]
    } else {
        fields
    }
}
