use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{authenticate, bearer_token};
use crate::notify::{topic_for, Notification, Notifier};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

/// Open the caller's notification stream.
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also arrive as `?token=`. The header wins when both are present.
pub async fn stream(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<StreamQuery>, AppError>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(query.token)
        .ok_or_else(|| AppError::Unauthenticated("No token, authorization denied".to_string()))?;

    let current = authenticate(&state, &token).await?;
    let topic = topic_for(current.id, current.role).ok_or_else(|| {
        AppError::Forbidden("Only drivers and passengers receive notifications".to_string())
    })?;

    let rx = state.notifier.subscribe(&topic).await;
    tracing::info!(user_id = %current.id, topic = %topic, "Notification stream opened");

    let notifier = state.notifier.clone();
    Ok(ws.on_upgrade(move |socket| forward(socket, notifier, rx, topic)))
}

async fn forward(
    mut socket: WebSocket,
    notifier: Notifier,
    mut rx: broadcast::Receiver<Notification>,
    topic: String,
) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode notification");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %topic, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    notifier.unsubscribe(&topic, rx).await;
    tracing::debug!(topic = %topic, "Notification stream closed");
}
