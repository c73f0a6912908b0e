//! `hostpilot serve` — HTTP + WebSocket transport.
//!
//! Every WebSocket connection gets its own [`AgentSession`], registered in a
//! [`SessionRegistry`] under a fresh id for the lifetime of the connection.
//! The HTTP endpoints inspect and reconfigure those sessions by id.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use hostpilot_agent::{AgentSession, LogTarget, ProviderInfo};
use hostpilot_core::config::Config;
use hostpilot_core::utils::{expand_home, file_stamp};
use hostpilot_core::{AgentError, ProviderKind};
use hostpilot_providers::registry::provider_statuses;

// ─────────────────────────────────────────────
// Session registry
// ─────────────────────────────────────────────

/// A registered session plus a copy of its provider info.
///
/// The session mutex is held for a whole chat turn. The snapshot lets the
/// HTTP endpoints answer without waiting for that turn to finish.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<AgentSession>>,
    info: Arc<RwLock<ProviderInfo>>,
}

impl SessionHandle {
    fn new(session: AgentSession) -> Self {
        Self {
            info: Arc::new(RwLock::new(session.provider_info())),
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, AgentSession> {
        self.session.lock().await
    }

    pub async fn info(&self) -> ProviderInfo {
        self.info.read().await.clone()
    }
}

/// Live sessions keyed by connection id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, id: Uuid, session: AgentSession) -> SessionHandle {
        let handle = SessionHandle::new(session);
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Look up a session from an id string as sent by clients.
    async fn find(&self, id: &str) -> Option<SessionHandle> {
        let id = Uuid::parse_str(id).ok()?;
        self.get(&id).await
    }
}

// ─────────────────────────────────────────────
// App state
// ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionRegistry::default(),
        }
    }

    /// Build and register the session for a new connection.
    async fn open_session(&self, id: Uuid) -> Result<SessionHandle, AgentError> {
        let transcript = expand_home(&self.config.paths.log_dir)
            .join("web")
            .join(format!("web_session_{id}_{}.log", file_stamp()));
        let session = AgentSession::from_config(&self.config, LogTarget::Transcript(transcript))?;
        Ok(self.sessions.insert(id, session).await)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/providers", get(providers_handler))
        .route("/api/switch-provider", post(switch_provider_handler))
        .route("/api/session-info/{session_id}", get(session_info_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Starting server");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ─────────────────────────────────────────────
// HTTP handlers
// ─────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.sessions.len().await,
    }))
}

async fn providers_handler(State(state): State<AppState>) -> Json<Value> {
    let providers: serde_json::Map<String, Value> = provider_statuses(&state.config)
        .into_iter()
        .map(|(name, status)| (name.to_string(), json!(status)))
        .collect();
    Json(json!({ "providers": providers }))
}

const SESSION_BUSY: &str = "Session is busy processing a message";

#[derive(Debug, Deserialize)]
struct SwitchParams {
    provider: String,
    model: Option<String>,
    session_id: Option<String>,
}

async fn switch_provider_handler(
    State(state): State<AppState>,
    Query(params): Query<SwitchParams>,
) -> Json<Value> {
    let session = match params.session_id.as_deref() {
        Some(id) => state.sessions.find(id).await,
        None => None,
    };
    let Some(session) = session else {
        return Json(json!({ "success": false, "error": "Session not found" }));
    };

    let kind = match params.provider.parse::<ProviderKind>() {
        Ok(kind) => kind,
        Err(e) => return Json(json!({ "success": false, "error": e.to_string() })),
    };
    // A session in the middle of a chat turn is not switched under it.
    let Ok(mut guard) = session.session.try_lock() else {
        return Json(json!({ "success": false, "error": SESSION_BUSY }));
    };

    match guard.switch_provider(kind, params.model) {
        Ok(()) => {
            *session.info.write().await = guard.provider_info();
            let identity = guard.identity();
            Json(json!({
                "success": true,
                "provider": identity.provider,
                "model": identity.model,
                "message": format!("Switched to {}", identity.provider),
            }))
        }
        Err(e) => Json(json!({ "success": false, "error": e.to_string() })),
    }
}

async fn session_info_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    match state.sessions.find(&session_id).await {
        Some(session) => Json(json!({ "success": true, "info": session.info().await })),
        None => Json(json!({ "success": false, "error": "Session not found" })),
    }
}

// ─────────────────────────────────────────────
// WebSocket
// ─────────────────────────────────────────────

/// Server → client frame.
#[derive(Debug, Serialize, PartialEq)]
struct Frame {
    #[serde(rename = "type")]
    kind: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
}

impl Frame {
    fn new(kind: &'static str, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            session_id: None,
        }
    }

    fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    fn for_reply(reply: Result<String, AgentError>) -> Self {
        match reply {
            Ok(text) => Self::new("message", text),
            Err(e) => {
                error!(error = %e, "Agent error");
                Self::new("error", format!("Error: {e}"))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum WsCommand {
    Exit,
    Reset,
    Chat,
}

fn classify(text: &str) -> WsCommand {
    match text.to_lowercase().as_str() {
        "exit" | "quit" => WsCommand::Exit,
        "reset" => WsCommand::Reset,
        _ => WsCommand::Chat,
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> bool {
    let json = serde_json::to_string(frame).unwrap_or_default();
    socket.send(WsMessage::Text(json.into())).await.is_ok()
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    info!(session = %id, "New WebSocket connection");

    let session = match state.open_session(id).await {
        Ok(session) => session,
        Err(e) => {
            error!(session = %id, error = %e, "failed to create agent session");
            send_frame(&mut socket, &Frame::new("error", format!("Error: {e}"))).await;
            return;
        }
    };

    let mut greeting = Frame::system("Connected to AI Agent. How can I help you?");
    greeting.session_id = Some(id);

    if send_frame(&mut socket, &greeting).await {
        while let Some(msg) = socket.recv().await {
            let text = match msg {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            info!(session = %id, message = %text.as_str(), "Message received");

            match classify(text.as_str()) {
                WsCommand::Exit => {
                    send_frame(&mut socket, &Frame::system("Goodbye!")).await;
                    break;
                }
                WsCommand::Reset => {
                    session.lock().await.reset();
                    if !send_frame(&mut socket, &Frame::system("Conversation reset")).await {
                        break;
                    }
                    continue;
                }
                WsCommand::Chat => {}
            }

            if !send_frame(&mut socket, &Frame::new("status", "processing")).await {
                break;
            }
            let reply = session.lock().await.chat(text.as_str()).await;
            if !send_frame(&mut socket, &Frame::for_reply(reply)).await {
                break;
            }
        }
    }

    state.sessions.remove(&id).await;
    info!(session = %id, "Session closed");
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
