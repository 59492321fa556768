use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Total request timeout. A feed that never answers fails its own
/// pipeline instead of blocking the cycle.
const TOTAL_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "feedloop/0.1 (RSS aggregator)";

/// The engine's only view of the network: a feed URL in, the raw body
/// text out. Implementations decide how the request is actually routed.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// AllOrigins-style response wrapper around the fetched resource.
#[derive(Deserialize)]
struct ProxyEnvelope {
    contents: String,
}

/// Production gateway over reqwest.
///
/// With a proxy endpoint configured, every request is rewritten to
/// `<endpoint>?disableCache=true&url=<target>` and the body is unwrapped
/// from the proxy's `{"contents": ...}` JSON envelope. Without one, the
/// target URL is fetched directly and the body returned as-is.
pub struct HttpGateway {
    client: Client,
    proxy: Option<Url>,
}

impl HttpGateway {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            proxy: None,
        }
    }

    pub fn with_proxy(endpoint: Url) -> Self {
        let mut gateway = Self::new();
        gateway.proxy = Some(endpoint);
        gateway
    }

    fn request_url(&self, url: &str) -> String {
        match &self.proxy {
            Some(endpoint) => {
                let mut proxied = endpoint.clone();
                proxied
                    .query_pairs_mut()
                    .append_pair("disableCache", "true")
                    .append_pair("url", url);
                proxied.to_string()
            }
            None => url.to_string(),
        }
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchGateway for HttpGateway {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let request_url = self.request_url(url);
        debug!("Fetching {}", request_url);

        let response = self.client.get(&request_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        if self.proxy.is_some() {
            let envelope: ProxyEnvelope = serde_json::from_str(&body)?;
            Ok(envelope.contents)
        } else {
            Ok(body)
        }
    }
}
