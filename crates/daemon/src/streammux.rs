// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StreamMux: the mobile client's single WebSocket connection, multiplexing
//! every session it subscribes to. Grounded on the aggregated mux
//! WebSocket endpoint's split-socket-plus-select-loop shape, adapted for
//! per-session subscribe/unsubscribe instead of one fixed aggregate feed:
//! each subscription gets its own forwarder task draining a
//! [`SessionBroadcaster`] receiver into a shared outbound queue, which the
//! connection's single writer drains in order and stamps with a
//! per-connection `stream_seq`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use warden_core::decision::{DecisionAnswer, PendingDecisionId};
use warden_core::rule::Decision;
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;
use warden_wire::client::{ClientMessage, Frame, ServerMessage, SubscriptionLevel};

use crate::runtime::Daemon;

/// Outbound bytes buffered before a droppable message is discarded rather
/// than blocking the send path, per §4.5's backpressure rule.
const BACKPRESSURE_BYTES: usize = 64 * 1024;

/// One outbound item: the message, its session-ring `seq` if durable, and
/// the serialized frame's byte length for the connection's backpressure
/// accounting.
struct Outbound {
    message: ServerMessage,
    seq: Option<u64>,
    bytes: usize,
}

impl Outbound {
    fn new(message: ServerMessage, seq: Option<u64>) -> Self {
        let bytes = serde_json::to_vec(&message).map(|v| v.len()).unwrap_or(0);
        Self { message, seq, bytes }
    }
}

/// A live session subscription: its teardown token and current level,
/// shared with the forwarder task so a later demotion (a new `full`
/// subscription elsewhere on the connection) is visible without
/// restarting the task.
struct Subscription {
    token: CancellationToken,
    level: Arc<Mutex<SubscriptionLevel>>,
}

pub fn router(daemon: Arc<Daemon>) -> Router {
    Router::new().route("/stream", get(ws_handler)).with_state(daemon)
}

async fn ws_handler(State(daemon): State<Arc<Daemon>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(daemon, socket))
}

async fn handle_connection(daemon: Arc<Daemon>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Outbound>(256);
    let stream_seq = Arc::new(AtomicU64::new(0));
    let mut subscriptions: HashMap<SessionId, Subscription> = HashMap::new();
    let mut full_subscription: Option<SessionId> = None;
    let buffered_bytes = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let session_count = daemon.documents.list_sessions().map(|s| s.len()).unwrap_or(0) as u32;
    send_frame(&mut ws_tx, &stream_seq, ServerMessage::Connected { session_count }, None).await;
    send_frame(&mut ws_tx, &stream_seq, ServerMessage::StreamConnected, None).await;

    loop {
        tokio::select! {
            next = outbound_rx.recv() => {
                let Some(item) = next else { break };
                buffered_bytes.fetch_sub(item.bytes, Ordering::Relaxed);
                if send_frame(&mut ws_tx, &stream_seq, item.message, item.seq).await.is_err() {
                    break;
                }
            }
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(
                            &daemon,
                            &text,
                            &outbound_tx,
                            &buffered_bytes,
                            &mut subscriptions,
                            &mut full_subscription,
                        )
                        .await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(error = %err, "stream mux connection error");
                        break;
                    }
                }
            }
        }
    }

    for (_, subscription) in subscriptions {
        subscription.token.cancel();
    }
}

async fn send_frame(
    ws_tx: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    stream_seq: &AtomicU64,
    message: ServerMessage,
    seq: Option<u64>,
) -> Result<(), axum::Error> {
    let stream_seq = stream_seq.fetch_add(1, Ordering::Relaxed) + 1;
    let mut frame = Frame::new(message).with_stream_seq(stream_seq);
    if let Some(seq) = seq {
        frame = frame.with_seq(seq);
    }
    let json = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
    ws_tx.send(Message::Text(json.into())).await
}

/// Queue a message for the connection's writer, honoring backpressure:
/// droppable messages are discarded once the connection's buffered bytes
/// exceed [`BACKPRESSURE_BYTES`]; everything else always sends, blocking
/// the caller if the channel is full.
async fn enqueue(
    outbound_tx: &mpsc::Sender<Outbound>,
    buffered_bytes: &std::sync::atomic::AtomicUsize,
    message: ServerMessage,
    seq: Option<u64>,
) {
    let item = Outbound::new(message, seq);
    if item.message.is_droppable() && buffered_bytes.load(Ordering::Relaxed) + item.bytes > BACKPRESSURE_BYTES {
        debug!(bytes = item.bytes, "dropping droppable message under backpressure");
        return;
    }
    buffered_bytes.fetch_add(item.bytes, Ordering::Relaxed);
    if outbound_tx.send(item).await.is_err() {
        return;
    }
}

async fn send_error(outbound_tx: &mpsc::Sender<Outbound>, buffered_bytes: &std::sync::atomic::AtomicUsize, error: impl ToString) {
    enqueue(outbound_tx, buffered_bytes, ServerMessage::Error { error: error.to_string(), fatal: false }, None).await;
}

async fn send_rpc_result(
    outbound_tx: &mpsc::Sender<Outbound>,
    buffered_bytes: &std::sync::atomic::AtomicUsize,
    request_id: Option<&str>,
    result: serde_json::Value,
) {
    let Some(request_id) = request_id else { return };
    enqueue(outbound_tx, buffered_bytes, ServerMessage::RpcResult { request_id: request_id.to_string(), result }, None).await;
}

async fn handle_client_message(
    daemon: &Arc<Daemon>,
    text: &str,
    outbound_tx: &mpsc::Sender<Outbound>,
    buffered_bytes: &Arc<std::sync::atomic::AtomicUsize>,
    subscriptions: &mut HashMap<SessionId, Subscription>,
    full_subscription: &mut Option<SessionId>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            send_error(outbound_tx, buffered_bytes, err).await;
            return;
        }
    };
    let request_id = message.request_id().map(str::to_string);

    match message {
        ClientMessage::Subscribe { session_id, level, since_seq, .. } => {
            let session_id = SessionId::from_string(session_id);
            subscribe(
                daemon,
                session_id,
                level,
                since_seq.unwrap_or(0),
                outbound_tx,
                buffered_bytes,
                subscriptions,
                full_subscription,
                request_id.as_deref(),
            )
            .await;
        }
        ClientMessage::Unsubscribe { session_id, .. } => {
            let session_id = SessionId::from_string(session_id);
            if let Some(subscription) = subscriptions.remove(&session_id) {
                subscription.token.cancel();
            }
            if full_subscription.as_ref() == Some(&session_id) {
                *full_subscription = None;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::Prompt { session_id, text, .. } => {
            let session_id = SessionId::from_string(session_id);
            if let Err(err) = daemon.prompt(&session_id, &text).await {
                send_error(outbound_tx, buffered_bytes, err).await;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::Abort { session_id, .. } => {
            let session_id = SessionId::from_string(session_id);
            if let Err(err) = daemon.abort(&session_id).await {
                send_error(outbound_tx, buffered_bytes, err).await;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::PermissionResponse { decision_id, action, scope, expires_in_ms, .. } => {
            let decision_id = PendingDecisionId::from_string(decision_id);
            let answer = decision_answer(action);
            if let Err(err) = daemon.resolve_decision(&decision_id, answer, scope, expires_in_ms).await {
                send_error(outbound_tx, buffered_bytes, err).await;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::CreateSession { workspace_id, model, name, .. } => {
            let workspace_id = WorkspaceId::from_string(workspace_id);
            match daemon.create_session(workspace_id, model, name, CancellationToken::new()).await {
                Ok(session) => {
                    enqueue(
                        outbound_tx,
                        buffered_bytes,
                        ServerMessage::SessionCreated {
                            session_id: session.id.to_string(),
                            workspace_id: session.workspace_id.to_string(),
                            name: session.name.clone(),
                        },
                        None,
                    )
                    .await;
                    subscribe(
                        daemon,
                        session.id,
                        SubscriptionLevel::Full,
                        0,
                        outbound_tx,
                        buffered_bytes,
                        subscriptions,
                        full_subscription,
                        request_id.as_deref(),
                    )
                    .await;
                }
                Err(err) => send_error(outbound_tx, buffered_bytes, err).await,
            }
        }
        ClientMessage::StopSession { session_id, .. } => {
            let session_id = SessionId::from_string(session_id);
            if let Err(err) =
                daemon.stop_session(&session_id, warden_engine::orchestrator::StopSource::User).await
            {
                send_error(outbound_tx, buffered_bytes, err).await;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::RearmGuard { session_id, .. } => {
            let session_id = SessionId::from_string(session_id);
            daemon.rearm_guard(&session_id);
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
        ClientMessage::GetState { session_id, .. } => {
            let session_id = SessionId::from_string(session_id);
            if let Some(session) = daemon.orchestrator.session(&session_id) {
                enqueue(
                    outbound_tx,
                    buffered_bytes,
                    ServerMessage::State { session_id: session.id.to_string(), status: session.status, usage: session.usage },
                    None,
                )
                .await;
            }
            send_rpc_result(outbound_tx, buffered_bytes, request_id.as_deref(), serde_json::json!({})).await;
        }
    }
}

/// Whether a message type passes the `notifications`-level filter (§4.5):
/// everything else is only delivered to a `full` subscriber.
fn passes_notification_filter(message: &ServerMessage) -> bool {
    matches!(
        message,
        ServerMessage::PermissionRequest { .. }
            | ServerMessage::PermissionExpired { .. }
            | ServerMessage::PermissionCancelled { .. }
            | ServerMessage::AgentStart { .. }
            | ServerMessage::AgentEnd { .. }
            | ServerMessage::State { .. }
            | ServerMessage::SessionEnded { .. }
            | ServerMessage::StopRequested { .. }
            | ServerMessage::StopConfirmed { .. }
            | ServerMessage::StopFailed { .. }
            | ServerMessage::Error { .. }
    )
}

/// Subscribe to a session's ring: validate the level (demoting any
/// existing `full` subscription elsewhere on the connection), replay
/// durable events since `since_seq` (or request a full state reload if
/// the cursor fell off the ring), forward any `PendingDecision`s still
/// outstanding for the session as synthetic `permission_request` frames,
/// spawn a forwarder task draining live events into `outbound_tx` until
/// unsubscribed or the connection drops, and answer with `rpc_result`.
#[allow(clippy::too_many_arguments)]
async fn subscribe(
    daemon: &Arc<Daemon>,
    session_id: SessionId,
    level: SubscriptionLevel,
    since_seq: u64,
    outbound_tx: &mpsc::Sender<Outbound>,
    buffered_bytes: &Arc<std::sync::atomic::AtomicUsize>,
    subscriptions: &mut HashMap<SessionId, Subscription>,
    full_subscription: &mut Option<SessionId>,
    request_id: Option<&str>,
) {
    if let Some(previous) = subscriptions.remove(&session_id) {
        previous.token.cancel();
    }

    if level == SubscriptionLevel::Full {
        if let Some(previous_full) = full_subscription.take() {
            if previous_full != session_id {
                if let Some(previous) = subscriptions.get(&previous_full) {
                    *previous.level.lock() = SubscriptionLevel::Notifications;
                }
            }
        }
        *full_subscription = Some(session_id.clone());
    } else if full_subscription.as_ref() == Some(&session_id) {
        *full_subscription = None;
    }

    if let Some(session) = daemon.orchestrator.session(&session_id) {
        enqueue(
            outbound_tx,
            buffered_bytes,
            ServerMessage::State { session_id: session.id.to_string(), status: session.status, usage: session.usage },
            None,
        )
        .await;
    }

    let catch_up = daemon.broadcaster.get_catch_up(&session_id, since_seq);
    if catch_up.catch_up_complete {
        for entry in catch_up.events {
            enqueue(outbound_tx, buffered_bytes, entry.message, Some(entry.seq)).await;
        }
    }

    for pending in daemon.gate.pending_decisions() {
        if pending.session_id != session_id {
            continue;
        }
        enqueue(
            outbound_tx,
            buffered_bytes,
            ServerMessage::PermissionRequest {
                decision_id: pending.id.to_string(),
                session_id: pending.session_id.to_string(),
                tool: pending.tool,
                input: pending.input,
                summary: pending.summary,
            },
            None,
        )
        .await;
    }

    let mut rx = daemon.broadcaster.subscribe(&session_id);
    let token = CancellationToken::new();
    let level = Arc::new(Mutex::new(level));
    subscriptions.insert(session_id.clone(), Subscription { token: token.clone(), level: level.clone() });

    let forwarder_tx = outbound_tx.clone();
    let forwarder_bytes = buffered_bytes.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                message = rx.recv() => {
                    match message {
                        Ok(message) => {
                            if *level.lock() == SubscriptionLevel::Notifications && !passes_notification_filter(&message) {
                                continue;
                            }
                            enqueue(&forwarder_tx, &forwarder_bytes, message, None).await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    send_rpc_result(
        outbound_tx,
        buffered_bytes,
        request_id,
        serde_json::json!({"catch_up_complete": catch_up.catch_up_complete, "current_seq": catch_up.current_seq}),
    )
    .await;
}

fn decision_answer(decision: Decision) -> DecisionAnswer {
    match decision {
        Decision::Allow => DecisionAnswer::Allow,
        Decision::Ask | Decision::Deny => DecisionAnswer::Deny,
    }
}
