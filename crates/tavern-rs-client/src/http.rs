//! REST implementation of the session gateway, character directory, and
//! logout endpoint.

use crate::error::ClientError;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tavern_rs_config::ApiConfig;
use tavern_rs_core::{CharacterDirectory, GatewayError, LogoutEndpoint, SessionGateway};
use tavern_rs_protocol::{
    Character, CreateSessionRequest, GenerateReplyRequest, Message, Session,
};

/// Source of the bearer token attached to every request.
pub trait BearerToken: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Longest response body echoed back in a status error.
const MAX_ERROR_BODY: usize = 256;

/// Backend REST client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn BearerToken>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn BearerToken>) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        debug!("api client ready (base_url={})", base_url);
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &body))
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|err| GatewayError::Decode(err.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        GatewayError::Transport(format!("connection failed: {err}"))
    } else if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        _ => {
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!("unexpected response (status={})", status.as_u16());
            GatewayError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl CharacterDirectory for ApiClient {
    async fn list(&self) -> Result<Vec<Character>, GatewayError> {
        self.fetch(self.client.get(self.url("characters"))).await
    }
}

#[async_trait]
impl SessionGateway for ApiClient {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<Session, GatewayError> {
        self.fetch(self.client.post(self.url("chat")).json(&request))
            .await
    }

    async fn latest_session(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Session, GatewayError> {
        let request = self
            .client
            .get(self.url("chat/latest"))
            .query(&[("characterId", character_id), ("ownerId", owner_id)]);
        self.fetch(request).await
    }

    async fn list_sessions(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Vec<Session>, GatewayError> {
        let request = self
            .client
            .get(self.url("chat"))
            .query(&[("characterId", character_id), ("ownerId", owner_id)]);
        self.fetch(request).await
    }

    async fn append_and_generate(
        &self,
        request: GenerateReplyRequest,
    ) -> Result<Message, GatewayError> {
        self.fetch(self.client.post(self.url("message")).json(&request))
            .await
    }

    async fn update_message(&self, message: Message) -> Result<Message, GatewayError> {
        let Some(id) = message.id else {
            return Err(GatewayError::NotFound);
        };
        let request = self
            .client
            .put(self.url(&format!("message/{id}")))
            .json(&message);
        self.fetch(request).await
    }
}

#[async_trait]
impl LogoutEndpoint for ApiClient {
    async fn logout(&self) -> Result<(), GatewayError> {
        self.execute(self.client.post(self.url("users/logout")))
            .await
            .map(|_| ())
    }
}
