use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::state::AppState;
use crate::store::UserStore;
use crate::ws::actor;

/// Query parameters for WebSocket connection.
/// Browsers cannot set headers on the upgrade request, so the JWT travels
/// as `?access_token=` (`?token=` is accepted too).
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    #[serde(alias = "token")]
    pub access_token: Option<String>,
}

/// WebSocket close codes:
/// 4001 = token expired
/// 4002 = token missing or invalid, or the account no longer exists
const CLOSE_TOKEN_EXPIRED: u16 = 4001;
const CLOSE_TOKEN_INVALID: u16 = 4002;

/// GET /ws?access_token=JWT
/// WebSocket upgrade endpoint. Authenticates via query parameter.
/// On auth failure, upgrades then immediately closes with the matching close
/// code; the connection is never registered and produces no presence events.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = match params.access_token.as_deref() {
        Some(token) => jwt::validate_access_token(&state.jwt_secret, token)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    (CLOSE_TOKEN_EXPIRED, "Token expired")
                }
                _ => (CLOSE_TOKEN_INVALID, "Token invalid"),
            }),
        None => Err((CLOSE_TOKEN_INVALID, "Token missing")),
    };

    let claims = match claims {
        Ok(claims) => match state.store.exists(&claims.sub).await {
            Ok(true) => Ok(claims),
            Ok(false) => Err((CLOSE_TOKEN_INVALID, "Account not found")),
            Err(e) => {
                tracing::error!(user_id = %claims.sub, error = %e, "Account lookup failed");
                Err((CLOSE_TOKEN_INVALID, "Account lookup failed"))
            }
        },
        Err(err) => Err(err),
    };

    match claims {
        Ok(claims) => {
            tracing::info!(
                user_id = %claims.sub,
                username = %claims.username,
                "WebSocket connection authenticated"
            );
            ws.on_upgrade(move |socket| handle_authenticated(socket, state, claims.sub))
        }
        Err((close_code, reason)) => {
            tracing::warn!(
                close_code = close_code,
                reason = reason,
                "WebSocket auth failed"
            );

            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: close_code,
                    reason: reason.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

async fn handle_authenticated(socket: WebSocket, state: AppState, user_id: String) {
    actor::run_connection(socket, state, user_id).await;
}
