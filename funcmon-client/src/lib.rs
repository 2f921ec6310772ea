use funcmon_common::{ErrorResponse, FuncMonError, MetricRecord, Result, FUNCTION_API_PATH, METRICS_PATH};
use reqwest::Url;

/// Default metrics server address.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

/// funcmon client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Metrics server as a bare `host:port`.
    pub server_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { server_addr: DEFAULT_SERVER_ADDR.to_string() }
    }
}

/// HTTP client for a function-metrics feed
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// URL of the metrics collection endpoint.
    pub fn build_metrics_url(&self) -> String {
        format!("http://{}{}", self.config.server_addr, METRICS_PATH)
    }

    /// URL of the per-function endpoint. The name is percent-encoded as a single path segment.
    pub fn build_function_url(&self, name: &str) -> Result<String> {
        let mut url = Url::parse(&format!("http://{}{}", self.config.server_addr, FUNCTION_API_PATH))
            .map_err(|e| FuncMonError::InvalidConfig(format!("bad server address {:?}: {}", self.config.server_addr, e)))?;
        url.path_segments_mut()
            .map_err(|_| FuncMonError::InvalidConfig(format!("bad server address {:?}", self.config.server_addr)))?
            .pop_if_empty()
            .push(name);
        Ok(url.into())
    }

    /// Fetch every function's metrics, in the order the server returns them.
    pub async fn fetch_metrics(&self) -> Result<Vec<MetricRecord>> {
        let url = self.build_metrics_url();

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FuncMonError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        decode_json(response).await
    }

    /// Fetch one function's metrics including its per-call history.
    pub async fn fetch_function(&self, name: &str) -> Result<MetricRecord> {
        if name.is_empty() {
            return Err(FuncMonError::FunctionNotFound(String::new()));
        }

        let url = self.build_function_url(name)?;

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FuncMonError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FuncMonError::FunctionNotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        decode_json(response).await
    }
}

/// Read the whole body, then decode it; a body that cannot be read is a network failure.
async fn decode_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FuncMonError::NetworkError(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| FuncMonError::DecodeError(e.to_string()))
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> FuncMonError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    FuncMonError::HttpError(status.as_u16(), error_msg)
}
