use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::debug;

use super::traits::ConversationBackend;
use super::types::{ConversationDetail, ModelInfo, SendTurnRequest, SendTurnResponse};
use crate::app::BackendConfig;
use crate::cache::ContextId;
use crate::session::{ConversationKey, ConversationSummary, Role, TokenUsage, Turn, TurnId};
use crate::utils::BackendError;

/// Conversation API client over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a client from config. The bearer token is read from the
    /// environment variable named in `token_env`.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .with_context(|| format!("Invalid backend URL: {}", config.url))?;
        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            base_url,
            token,
        })
    }

    /// Base URL with `segments` appended as escaped path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Validation(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.authorized(request).send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Network(format!("Invalid response body: {}", e)))
    }

    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        let response = self.authorized(request).send().await.map_err(transport_error)?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_status(status, &body))
        }
    }

    /// POST a turn for generation by the provider named in the request
    pub async fn post_turn(&self, request: &SendTurnRequest) -> Result<SendTurnResponse, BackendError> {
        let url = self.endpoint(&["turns"])?;
        debug!(provider = %request.provider_id, new = request.conversation_id.is_none(), "posting turn");

        let record: SendTurnRecord = self.execute(self.client.post(url).json(request)).await?;
        Ok(record.into())
    }

    pub async fn fetch_models(&self, provider: &str) -> Result<Vec<ModelInfo>, BackendError> {
        let url = self.endpoint(&["providers", provider, "models"])?;
        let record: ModelsRecord = self.execute(self.client.get(url)).await?;
        Ok(record.data)
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    async fn list_conversations(
        &self,
        context: &ContextId,
    ) -> Result<Vec<ConversationSummary>, BackendError> {
        let mut url = self.endpoint(&["conversations"])?;
        if let Some(org) = context.as_org() {
            url.query_pairs_mut().append_pair("context_id", org);
        }

        let records: Vec<ConversationRecord> = self.execute(self.client.get(url)).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn load_conversation_detail(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationDetail, BackendError> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        let record: DetailRecord = self.execute(self.client.get(url)).await?;

        Ok(ConversationDetail {
            conversation: record.conversation.into(),
            turns: record.turns.into_iter().map(Into::into).collect(),
        })
    }

    async fn delete_conversation(
        &self,
        conversation_id: &str,
        context: &ContextId,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint(&["conversations", conversation_id])?;
        if let Some(org) = context.as_org() {
            url.query_pairs_mut().append_pair("context_id", org);
        }
        self.execute_empty(self.client.delete(url)).await
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Network(err.to_string())
}

/// Map a non-success HTTP status onto the failure taxonomy
pub fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::AuthRequired,
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::BAD_REQUEST
        | StatusCode::CONFLICT
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => BackendError::Validation(message),
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            BackendError::Provider(message)
        }
        _ => BackendError::Network(message),
    }
}

/// `{"error": "..."}`, `{"message": "..."}`, or the raw body
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.or(parsed.message),
        Err(_) => Some(body.to_string()),
    }
}

#[derive(Deserialize)]
struct ModelsRecord {
    data: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ConversationRecord {
    id: String,
    #[serde(default)]
    context_id: Option<String>,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    default_prompt_id: Option<String>,
}

impl From<ConversationRecord> for ConversationSummary {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            context_id: ContextId::from(record.context_id),
            title: record.title,
            created_at: record.created_at,
            updated_at: record.updated_at,
            default_prompt_id: record.default_prompt_id,
        }
    }
}

#[derive(Deserialize)]
struct TurnRecord {
    id: String,
    conversation_id: String,
    role: Role,
    content: String,
    #[serde(default)]
    author_id: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    usage: Option<TokenUsage>,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    prompt_id: Option<String>,
}

fn default_active() -> bool {
    true
}

impl From<TurnRecord> for Turn {
    fn from(record: TurnRecord) -> Self {
        Self {
            id: TurnId::Durable(record.id),
            conversation: ConversationKey::Durable(record.conversation_id),
            role: record.role,
            content: record.content,
            author_id: record.author_id,
            created_at: record.created_at,
            active: record.active,
            usage: record.usage,
            provider_id: record.provider_id,
            prompt_id: record.prompt_id,
        }
    }
}

#[derive(Deserialize)]
struct DetailRecord {
    conversation: ConversationRecord,
    turns: Vec<TurnRecord>,
}

#[derive(Deserialize)]
struct SendTurnRecord {
    conversation_id: String,
    #[serde(default)]
    user_turn_id: Option<String>,
    turn: TurnRecord,
}

impl From<SendTurnRecord> for SendTurnResponse {
    fn from(record: SendTurnRecord) -> Self {
        Self {
            conversation_id: record.conversation_id,
            user_turn_id: record.user_turn_id,
            turn: record.turn.into(),
        }
    }
}
