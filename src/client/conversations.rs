//! Read-only access to call transcripts summarised by the voice agent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::error::ClientError;

const API_KEY_HEADER: &str = "xi-api-key";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub summary: String,
}

#[derive(Deserialize)]
struct ConversationList {
    #[serde(default)]
    conversations: Vec<ConversationRef>,
}

#[derive(Deserialize)]
struct ConversationRef {
    conversation_id: String,
}

#[derive(Deserialize)]
struct ConversationDetail {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    analysis: Option<Analysis>,
}

#[derive(Deserialize)]
struct Analysis {
    #[serde(default)]
    transcript_summary: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ConversationClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    agent_id: String,
}

impl ConversationClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Summaries of the agent's most recent conversations, newest first as
    /// listed by the API. Conversations without an analysis yet get an empty
    /// summary, and a detail without its own id keeps the listed one.
    pub async fn recent_summaries(
        &self,
        page_size: u32,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        let list_url = format!("{}/v1/convai/conversations", self.base_url);
        let page_size = page_size.to_string();
        let query = [("agent_id", self.agent_id.as_str()), ("page_size", page_size.as_str())];
        let list: ConversationList = self
            .get_json(self.client.get(&list_url).query(&query))
            .await?;
        debug!(count = list.conversations.len(), "Fetched conversation list");

        let mut summaries = Vec::with_capacity(list.conversations.len());
        for conversation in list.conversations {
            let detail_url = format!("{}/{}", list_url, conversation.conversation_id);
            let detail: ConversationDetail = self.get_json(self.client.get(&detail_url)).await?;
            summaries.push(ConversationSummary {
                conversation_id: detail
                    .conversation_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or(conversation.conversation_id),
                summary: detail
                    .analysis
                    .and_then(|a| a.transcript_summary)
                    .unwrap_or_default(),
            });
        }
        Ok(summaries)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
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
