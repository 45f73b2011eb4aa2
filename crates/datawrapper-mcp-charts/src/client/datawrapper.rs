use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde_json::Value;

use super::{ChartClient, ChartState, ExportOptions, PublishedChart, RemoteChart};
use crate::{dataset::CanonicalDataset, error::RemoteFault};

pub const DEFAULT_API_URL: &str = "https://api.datawrapper.de/v3";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MISSING_TOKEN: &str = "no Datawrapper API token configured; set DATAWRAPPER_ACCESS_TOKEN \
                             (tokens are issued at https://app.datawrapper.de/account/api-tokens)";

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("datawrapper-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// [`ChartClient`] backed by the Datawrapper REST API (v3).
#[derive(Debug, Clone)]
pub struct DatawrapperClient {
    http: Client,
    config: ClientConfig,
}

impl DatawrapperClient {
    pub fn new(config: ClientConfig) -> Result<Self, RemoteFault> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RemoteFault::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteFault> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or_else(|| RemoteFault::transport(MISSING_TOKEN))?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteFault> {
        let response = request.send().await.map_err(transport_fault)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(fault_from_response(status.as_u16(), &body))
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, RemoteFault> {
        let response = self.send(request).await?;
        let text = response.text().await.map_err(transport_fault)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| RemoteFault::transport(format!("unreadable response from Datawrapper: {e}")))
    }
}

#[async_trait]
impl ChartClient for DatawrapperClient {
    async fn create_chart(&self, remote_type: &str, document: Value) -> Result<RemoteChart, RemoteFault> {
        let mut body = document;
        if let Value::Object(map) = &mut body {
            map.insert("type".to_string(), Value::String(remote_type.to_string()));
        }
        let request = self.request(Method::POST, "charts")?.json(&body);
        decode_chart(self.send_json(request).await?)
    }

    async fn upload_data(&self, chart_id: &str, dataset: &CanonicalDataset) -> Result<(), RemoteFault> {
        let csv = dataset
            .to_csv()
            .map_err(|e| RemoteFault::transport(format!("failed to encode data as CSV: {e}")))?;
        let request = self
            .request(Method::PUT, &format!("charts/{chart_id}/data"))?
            .header(header::CONTENT_TYPE, "text/csv")
            .body(csv);
        self.send(request).await?;
        Ok(())
    }

    async fn update_chart(&self, chart_id: &str, patch: Value) -> Result<(), RemoteFault> {
        let request = self
            .request(Method::PATCH, &format!("charts/{chart_id}"))?
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    async fn publish_chart(&self, chart_id: &str) -> Result<PublishedChart, RemoteFault> {
        let request = self.request(Method::POST, &format!("charts/{chart_id}/publish"))?;
        decode_publish(&self.send_json(request).await?)
    }

    async fn export_png(&self, chart_id: &str, options: &ExportOptions) -> Result<Vec<u8>, RemoteFault> {
        let request = self
            .request(Method::GET, &format!("charts/{chart_id}/export/png"))?
            .query(&options.query())
            .header(header::ACCEPT, "image/png");
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(transport_fault)?;
        Ok(bytes.to_vec())
    }

    async fn get_chart(&self, chart_id: &str) -> Result<RemoteChart, RemoteFault> {
        let request = self.request(Method::GET, &format!("charts/{chart_id}"))?;
        decode_chart(self.send_json(request).await?)
    }

    async fn delete_chart(&self, chart_id: &str) -> Result<(), RemoteFault> {
        let request = self.request(Method::DELETE, &format!("charts/{chart_id}"))?;
        self.send(request).await?;
        Ok(())
    }
}

fn transport_fault(error: reqwest::Error) -> RemoteFault {
    if error.is_timeout() {
        RemoteFault::transport(format!("request to Datawrapper timed out: {error}"))
    } else {
        RemoteFault::transport(format!("request to Datawrapper failed: {error}"))
    }
}

/// Builds a fault from an error response, preferring the API's own message.
fn fault_from_response(status: u16, body: &str) -> RemoteFault {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
    });
    let message = from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "request failed".to_string());
    RemoteFault::new(status, message)
}

fn decode_chart(document: Value) -> Result<RemoteChart, RemoteFault> {
    let id = document
        .get("id")
        .or_else(|| document.get("publicId"))
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteFault::transport("chart document from Datawrapper has no id"))?
        .to_string();
    let remote_type = document
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let public_url = document
        .get("publicUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    Ok(RemoteChart {
        id,
        remote_type,
        state: chart_state(&document),
        public_url,
        document,
    })
}

fn chart_state(document: &Value) -> ChartState {
    if document.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
        return ChartState::Deleted;
    }
    let version = document
        .get("publicVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let published_at = document.get("publishedAt").is_some_and(|v| !v.is_null());
    if version > 0 || published_at {
        ChartState::Published
    } else {
        ChartState::Draft
    }
}

fn decode_publish(body: &Value) -> Result<PublishedChart, RemoteFault> {
    let data = body.get("data").unwrap_or(body);
    let public_url = data
        .get("publicUrl")
        .and_then(Value::as_str)
        .or_else(|| body.get("url").and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RemoteFault::transport("publish response from Datawrapper has no public URL"))?
        .to_string();
    let version = body
        .get("version")
        .and_then(Value::as_u64)
        .or_else(|| data.get("publicVersion").and_then(Value::as_u64));

    Ok(PublishedChart {
        public_url,
        version,
    })
}
