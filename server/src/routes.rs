use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use crate::auth::middleware::{Claims, JwtSecret};
use crate::dm::{conversations, messages};
use crate::state::AppState;
use crate::users::{accounts, avatar, contacts};
use crate::ws::handler as ws_handler;

#[derive(Debug, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub online_user_ids: Vec<String>,
}

/// GET /api/presence: ids of users with a live WebSocket connection.
async fn presence(State(state): State<AppState>, _claims: Claims) -> Json<PresenceResponse> {
    let mut online_user_ids = state.connections.online_user_ids();
    online_user_ids.sort();
    Json(PresenceResponse { online_user_ids })
}

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// CORS for the browser client: listed origins only, with credentials.
/// Entries that are not valid header values are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on register/login: 1 token every 12 seconds per IP,
    // burst from config. Uses PeerIpKeyExtractor, which reads ConnectInfo<SocketAddr>.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12)
            .burst_size(state.auth_rate_limit_burst.max(1))
            .finish()
            .expect("governor config with non-zero period and burst"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route("/api/user/register", post(accounts::register))
        .route("/api/user/login", post(accounts::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    let avatar_limit = state.max_avatar_size_kb * 1024;

    // Static segments (profile, contacts, username/...) win over {id}.
    let user_routes = Router::new()
        .route(
            "/api/user",
            get(accounts::list_users).delete(accounts::delete_account),
        )
        .route(
            "/api/user/profile",
            get(accounts::get_profile).put(accounts::update_profile),
        )
        .route(
            "/api/user/profile-picture",
            put(avatar::upload_profile_picture).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route(
            "/api/user/contacts",
            get(contacts::list_contacts).post(contacts::add_contact),
        )
        .route(
            "/api/user/contacts/{contact_id}",
            delete(contacts::remove_contact),
        )
        .route("/api/user/block", post(contacts::block_user))
        .route("/api/user/unblock", post(contacts::unblock_user))
        .route(
            "/api/user/username/{username}",
            get(accounts::get_user_by_username),
        )
        .route("/api/user/{id}", get(accounts::get_user));

    let message_routes = Router::new()
        .route("/api/message", post(messages::send_message))
        .route("/api/message/unread", get(messages::get_unread))
        .route("/api/message/unread/count", get(messages::get_unread_count))
        .route(
            "/api/message/conversations",
            get(conversations::list_conversations),
        )
        .route(
            "/api/message/conversation/{peer_id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/api/message/read/all/{peer_id}",
            post(conversations::mark_all_as_read),
        )
        .route(
            "/api/message/{id}",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route("/api/message/{id}/read", put(messages::mark_as_read));

    // Public so <img> tags can load avatars without a bearer token
    let upload_routes = Router::new().route(
        "/uploads/profile_pictures/{file}",
        get(avatar::get_profile_picture),
    );

    let presence_routes = Router::new().route("/api/presence", get(presence));

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(message_routes)
        .merge(upload_routes)
        .merge(presence_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .layer(cors_layer(&state.cors_allowed_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
