use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tavern_rs_core::{GatewayError, SessionGateway};
use tavern_rs_protocol::{
    CharacterId, CreateSessionRequest, GenerateReplyRequest, Message, Session,
};
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Build a persisted session for `character_id` with the given messages.
pub fn persisted_session(character_id: &str, messages: Vec<Message>) -> Session {
    let mut session = Session::provisional(Some("owner".to_string()), character_id, messages);
    session.id = Some(Uuid::new_v4());
    session.created_at = Some(Utc::now());
    session
}

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    CreateSession(CreateSessionRequest),
    LatestSession {
        character_id: String,
        owner_id: String,
    },
    ListSessions {
        character_id: String,
        owner_id: String,
    },
    AppendAndGenerate(GenerateReplyRequest),
    UpdateMessage(Message),
}

/// Holds gateway responses until released.
#[derive(Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let one held call proceed.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Default)]
struct Script {
    latest: HashMap<CharacterId, Session>,
    past: HashMap<CharacterId, Vec<Session>>,
    replies: VecDeque<Message>,
    failures: HashMap<&'static str, GatewayError>,
    gates: HashMap<&'static str, Gate>,
    calls: Vec<GatewayCall>,
}

/// Scriptable in-memory session gateway.
///
/// Without scripting: `latest_session` answers `NotFound`, `list_sessions`
/// answers an empty list, `create_session` echoes the request with a fresh id,
/// `append_and_generate` echoes the user text, and `update_message` echoes the
/// message.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(&self, session: Session) {
        let character_id = session.character_id.clone().unwrap_or_default();
        self.script.lock().latest.insert(character_id, session);
    }

    pub fn with_past(&self, character_id: &str, sessions: Vec<Session>) {
        self.script
            .lock()
            .past
            .insert(character_id.to_string(), sessions);
    }

    pub fn push_reply(&self, reply: Message) {
        self.script.lock().replies.push_back(reply);
    }

    pub fn fail_create(&self, error: GatewayError) {
        self.fail("create", error);
    }

    pub fn fail_latest(&self, error: GatewayError) {
        self.fail("latest", error);
    }

    pub fn fail_list(&self, error: GatewayError) {
        self.fail("list", error);
    }

    pub fn fail_generate(&self, error: GatewayError) {
        self.fail("generate", error);
    }

    pub fn fail_update(&self, error: GatewayError) {
        self.fail("update", error);
    }

    /// Stop failing every operation.
    pub fn recover(&self) {
        self.script.lock().failures.clear();
    }

    pub fn hold_create(&self) -> Gate {
        self.hold("create")
    }

    pub fn hold_latest(&self) -> Gate {
        self.hold("latest")
    }

    pub fn hold_list(&self) -> Gate {
        self.hold("list")
    }

    pub fn hold_generate(&self) -> Gate {
        self.hold("generate")
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.script.lock().calls.clone()
    }

    pub fn create_requests(&self) -> Vec<CreateSessionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::CreateSession(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn generate_requests(&self) -> Vec<GenerateReplyRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::AppendAndGenerate(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn fail(&self, operation: &'static str, error: GatewayError) {
        self.script.lock().failures.insert(operation, error);
    }

    fn hold(&self, operation: &'static str) -> Gate {
        let gate = Gate::new();
        self.script.lock().gates.insert(operation, gate.clone());
        gate
    }

    /// Record the call, wait on any gate, then report a scripted failure.
    async fn enter(&self, operation: &'static str, call: GatewayCall) -> Result<(), GatewayError> {
        let gate = {
            let mut script = self.script.lock();
            script.calls.push(call);
            script.gates.get(operation).cloned()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
        match self.script.lock().failures.get(operation).cloned() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionGateway for ScriptedGateway {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<Session, GatewayError> {
        self.enter("create", GatewayCall::CreateSession(request.clone()))
            .await?;
        let now = Utc::now();
        Ok(Session {
            id: Some(Uuid::new_v4()),
            owner_id: request.owner_id,
            character_id: Some(request.character_id),
            messages: request.message_list,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn latest_session(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Session, GatewayError> {
        self.enter(
            "latest",
            GatewayCall::LatestSession {
                character_id: character_id.to_string(),
                owner_id: owner_id.to_string(),
            },
        )
        .await?;
        self.script
            .lock()
            .latest
            .get(character_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn list_sessions(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Vec<Session>, GatewayError> {
        self.enter(
            "list",
            GatewayCall::ListSessions {
                character_id: character_id.to_string(),
                owner_id: owner_id.to_string(),
            },
        )
        .await?;
        Ok(self
            .script
            .lock()
            .past
            .get(character_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_and_generate(
        &self,
        request: GenerateReplyRequest,
    ) -> Result<Message, GatewayError> {
        let user_message = request.user_message.clone();
        self.enter("generate", GatewayCall::AppendAndGenerate(request))
            .await?;
        let reply = self.script.lock().replies.pop_front();
        Ok(reply.unwrap_or_else(|| Message::assistant(format!("echo: {user_message}"))))
    }

    async fn update_message(&self, message: Message) -> Result<Message, GatewayError> {
        self.enter("update", GatewayCall::UpdateMessage(message.clone()))
            .await?;
        Ok(message)
    }
}
