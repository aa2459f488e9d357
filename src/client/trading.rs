//! Authenticated access to the trading API.

use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::common::error::ClientError;
use crate::common::signer::RequestSigner;
use crate::common::types::Method;

#[derive(Clone)]
pub struct TradingClient {
    client: reqwest::Client,
    base_url: String,
    signer: Arc<RequestSigner>,
}

impl TradingClient {
    pub fn new(base_url: &str, signer: Arc<RequestSigner>) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            signer,
        })
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Resolves `path` against the base URL. A missing leading `/` is
    /// added so the path never fuses with the base path.
    pub fn request_url(&self, path: &str) -> Result<Url, ClientError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        self.send_json(Method::Get, path, None).await
    }

    /// Sends a signed request. The signature covers the encoded path of the
    /// exact URL sent (query excluded) and the exact body bytes sent.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.request_url(path)?;
        let body = body.map(Value::to_string).unwrap_or_default();
        let headers = self.signer.auth_headers(method, url.path(), &body)?;
        debug!(
            %method,
            path = url.path(),
            timestamp = %headers.timestamp,
            "Sending signed request"
        );

        let mut request = self
            .client
            .request(method.into(), url)
            .header("accept", "application/json");
        request = headers.apply(request);
        if !body.is_empty() {
            request = request.header("content-type", "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }
}
