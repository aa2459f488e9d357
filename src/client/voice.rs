//! Client for the voice agent's call-initiation endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::common::dispatch::CallTarget;
use crate::common::error::ClientError;

/// What the voice agent says on a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallScript {
    pub prompt: String,
    pub first_message: String,
}

impl CallScript {
    /// Backslashes are stripped; the agent reads escaped text literally.
    pub fn new(prompt: impl AsRef<str>, first_message: impl AsRef<str>) -> Self {
        Self {
            prompt: prompt.as_ref().replace('\\', ""),
            first_message: first_message.as_ref().replace('\\', ""),
        }
    }
}

#[derive(Serialize)]
struct OutboundCallRequest<'a> {
    prompt: &'a str,
    first_message: &'a str,
    number: &'a str,
}

#[derive(Clone, Debug)]
pub struct OutboundCallClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OutboundCallClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Asks the voice agent to call `target.recipient` with its script.
    pub async fn initiate(&self, target: &CallTarget<CallScript>) -> Result<Value, ClientError> {
        let request = OutboundCallRequest {
            prompt: &target.payload.prompt,
            first_message: &target.payload.first_message,
            number: &target.recipient,
        };
        debug!(
            recipient = %target.recipient,
            endpoint = %self.endpoint,
            "Requesting outbound call"
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_body(text))
    }
}

// The endpoint usually answers JSON but is not guaranteed to.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
