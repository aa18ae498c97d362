use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed aggregation response: {0}")]
    MalformedAggregation(String),

    #[error("upstream {backend} unavailable: {details}")]
    UpstreamUnavailable { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = AdapterError> = std::result::Result<T, E>;
