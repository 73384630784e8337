//! Axum server setup and configuration.
//!
//! Router wiring, permissive CORS for the demo frontend, request
//! tracing, and graceful shutdown on SIGINT/SIGTERM.

use crate::api::handlers::{
    deposit, get_wallet, health_check, list_events, login, place_bet, register, settle,
};
use crate::api::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Enable permissive CORS for the demo frontend
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            enable_cors: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("BETBOOK_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            host: std::env::var("BETBOOK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            enable_cors: std::env::var("BETBOOK_CORS")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(true),
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<AppState>,
    config: ApiConfig,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            config: ApiConfig::default(),
        }
    }

    pub fn with_config(state: Arc<AppState>, config: ApiConfig) -> Self {
        Self { state, config }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let cors = if self.config.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        } else {
            CorsLayer::new()
        };

        Router::new()
            .route("/api/register", post(register))
            .route("/api/login", post(login))
            .route("/api/events", get(list_events))
            .route("/api/wallet/:user_id", get(get_wallet))
            .route("/api/deposit", post(deposit))
            .route("/api/place-bet", post(place_bet))
            .route("/api/settle", post(settle))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until shutdown is requested
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API listening at http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server shut down");
        Ok(())
    }
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.insert_event("Team A vs Team B", Utc::now()).unwrap();
        let server = ApiServer::new(Arc::new(AppState::new(db)));
        server.build_router()
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_cors);
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router();
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_full_betting_flow() {
        let router = test_router();

        let (status, body) = send(
            &router,
            "POST",
            "/api/register",
            Some(json!({"email": "a@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["user"]["id"].as_i64().unwrap();
        assert_eq!(body["user"]["balance"], 0.0);

        let (status, body) = send(
            &router,
            "POST",
            "/api/deposit",
            Some(json!({"userId": user_id, "amount": 100.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wallet"]["balance"], 100.0);

        let (status, body) = send(&router, "GET", "/api/events", None).await;
        assert_eq!(status, StatusCode::OK);
        let event_id = body["events"][0]["id"].as_i64().unwrap();
        assert_eq!(body["events"][0]["markets"][0]["price"], 1.8);

        let (status, body) = send(
            &router,
            "POST",
            "/api/place-bet",
            Some(json!({
                "userId": user_id,
                "eventId": event_id,
                "outcome": "A",
                "stake": 50.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["potentialWin"], 90.0);

        let (status, body) = send(
            &router,
            "POST",
            "/api/settle",
            Some(json!({"eventId": event_id, "winningOutcome": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settled"], true);
        assert_eq!(body["won"], 1);

        let (status, body) = send(
            &router,
            "GET",
            &format!("/api/wallet/{}", user_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wallet"]["balance"], 140.0);
    }

    #[tokio::test]
    async fn test_error_shapes() {
        let router = test_router();

        // Missing fields
        let (status, body) = send(
            &router,
            "POST",
            "/api/register",
            Some(json!({"email": "a@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_argument");

        // Invalid credentials
        let (status, body) = send(
            &router,
            "POST",
            "/api/login",
            Some(json!({"email": "ghost@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "invalid_credentials");

        // Unknown wallet
        let (status, body) = send(&router, "GET", "/api/wallet/424242", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let router = test_router();
        let body = json!({"email": "dup@example.com", "password": "pw"});

        let (status, _) = send(&router, "POST", "/api/register", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, response) = send(&router, "POST", "/api/register", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["kind"], "conflict");
    }
}
