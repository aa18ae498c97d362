use crate::traits::QueryExecutor;
use crate::AdapterError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const BACKEND: &str = "elasticsearch";

pub struct ElasticsearchExecutor {
    client: Arc<Client>,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl ElasticsearchExecutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            credentials: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn search_url(&self, index: &str) -> Result<Url, AdapterError> {
        if index.trim().is_empty() {
            return Err(AdapterError::InvalidArgument("index name is empty".to_string()));
        }
        let url = Url::parse(&format!(
            "{}/{}/_search",
            self.endpoint.trim_end_matches('/'),
            index.trim_matches('/')
        ))?;
        Ok(url)
    }
}

#[async_trait]
impl QueryExecutor for ElasticsearchExecutor {
    async fn search(&self, index: &str, body: &Value) -> Result<Value, AdapterError> {
        let url = self.search_url(index)?;
        let request_id = Uuid::new_v4().to_string();
        debug!(%url, request_id = %request_id, "sending aggregation search");

        let mut request = self
            .client
            .post(url)
            .header("X-Opaque-Id", &request_id)
            .json(body);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            warn!(status = %status, request_id = %request_id, "search request rejected");
            return Err(AdapterError::UpstreamUnavailable {
                backend: BACKEND.to_string(),
                details: format!("{status}: {details}"),
            });
        }

        Ok(response.json().await?)
    }
}
