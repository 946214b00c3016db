//! REST client behaviour against a mock backend.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tavern_rs_client::{ApiClient, BearerToken, ClientError};
use tavern_rs_config::ApiConfig;
use tavern_rs_core::{CharacterDirectory, GatewayError, LogoutEndpoint, SessionGateway};
use tavern_rs_protocol::{CreateSessionRequest, GenerateReplyRequest, Message, Role};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedToken(Option<&'static str>);

impl BearerToken for FixedToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

fn client(server: &MockServer, token: Option<&'static str>) -> ApiClient {
    let config = ApiConfig {
        base_url: format!("{}/api/", server.uri()),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    ApiClient::new(&config, Arc::new(FixedToken(token))).expect("client")
}

#[tokio::test]
async fn lists_characters_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/characters"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c1", "name": "Ada", "shortGreeting": "Hello!" },
            { "id": "c2", "name": "Bo" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let characters = client(&server, Some("secret")).list().await.expect("list");
    assert_eq!(characters.len(), 2);
    assert_eq!(characters[0].short_greeting.as_deref(), Some("Hello!"));
    assert_eq!(characters[1].short_greeting, None);
}

#[tokio::test]
async fn creates_session_with_message_list() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "ownerId": "u1",
            "characterId": "c1",
            "messageList": [{ "role": "assistant", "content": "Hello!" }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": id,
            "ownerId": "u1",
            "characterId": "c1",
            "messageList": [{ "role": "ASSISTANT", "content": "Hello!" }],
            "createdAt": "2025-02-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut greeting = Message::assistant("Hello!");
    greeting.timestamp = None;
    let session = client(&server, None)
        .create_session(CreateSessionRequest {
            owner_id: Some("u1".to_string()),
            character_id: "c1".to_string(),
            message_list: vec![greeting],
        })
        .await
        .expect("create");
    assert_eq!(session.id, Some(id));
    assert_eq!(session.messages[0].role, Role::Assistant);
}

#[tokio::test]
async fn latest_session_sends_query_and_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/latest"))
        .and(query_param("characterId", "c1"))
        .and(query_param("ownerId", "u1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, None)
        .latest_session("c1", "u1")
        .await
        .expect_err("missing");
    assert_eq!(err, GatewayError::NotFound);
}

#[tokio::test]
async fn lists_sessions_for_owner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat"))
        .and(query_param("characterId", "c1"))
        .and(query_param("ownerId", "u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "characterId": "c1", "messageList": [] },
            { "id": Uuid::new_v4(), "characterId": "c1" }
        ])))
        .mount(&server)
        .await;

    let sessions = client(&server, None)
        .list_sessions("c1", "u1")
        .await
        .expect("list");
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|session| session.messages.is_empty()));
}

#[tokio::test]
async fn append_and_generate_returns_reply() {
    let server = MockServer::start().await;
    let chat_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/message"))
        .and(body_json(json!({
            "chatId": chat_id,
            "characterId": "c1",
            "history": [{ "role": "user", "content": "hi" }],
            "userMessage": "hi"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "role": "ASSISTANT", "content": "Hey!" })),
        )
        .mount(&server)
        .await;

    let mut user = Message::user("hi");
    user.timestamp = None;
    let reply = client(&server, None)
        .append_and_generate(GenerateReplyRequest {
            chat_id,
            character_id: "c1".to_string(),
            history: vec![user],
            user_message: "hi".to_string(),
        })
        .await
        .expect("reply");
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "Hey!");
}

#[tokio::test]
async fn update_message_puts_by_id() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("PUT"))
        .and(path(format!("/api/message/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "role": "user",
            "content": "edited"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut message = Message::user("edited");
    message.id = Some(id);
    let stored = client(&server, None)
        .update_message(message)
        .await
        .expect("update");
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.content, "edited");
}

#[tokio::test]
async fn update_without_id_never_hits_network() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, None)
        .update_message(Message::user("x"))
        .await
        .expect_err("no id");
    assert_eq!(err, GatewayError::NotFound);
}

#[tokio::test]
async fn maps_auth_and_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/characters"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let client = client(&server, None);
    assert_eq!(client.list().await.expect_err("401"), GatewayError::Unauthorized);
    assert_eq!(
        client.list_sessions("c1", "u1").await.expect_err("503"),
        GatewayError::Status {
            status: 503,
            message: "busy".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/characters"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server, None).list().await.expect_err("decode");
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn logout_posts_and_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, Some("t")).logout().await.expect("logout");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9/api".to_string(),
        timeout_secs: 2,
        ..ApiConfig::default()
    };
    let client = ApiClient::new(&config, Arc::new(FixedToken(None))).expect("client");
    let err = client.list().await.expect_err("offline");
    assert!(matches!(err, GatewayError::Transport(_)));
}

#[test]
fn rejects_non_http_base_url() {
    let config = ApiConfig {
        base_url: "ftp://example.com".to_string(),
        ..ApiConfig::default()
    };
    let err = ApiClient::new(&config, Arc::new(FixedToken(None)))
        .err()
        .expect("invalid");
    assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
}
