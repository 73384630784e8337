//! JSON request/response handlers.
//!
//! Bodies use camelCase request fields (`userId`, `eventId`) and
//! snake_case `start_time` in event payloads, matching the frontend.
//! Missing fields are rejected explicitly with InvalidArgument so every
//! failure carries the same error shape.

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::markets::EventWithMarkets;
use crate::money::Amount;
use crate::store::UserRow;
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// SHARED BODIES
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub id: i64,
    pub email: String,
    pub balance: f64,
}

impl From<UserRow> for UserBody {
    fn from(user: UserRow) -> Self {
        UserBody {
            id: user.id,
            email: user.email,
            balance: user.balance.as_dollars(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserBody,
}

fn require<T>(field: Option<T>, name: &str) -> ServiceResult<T> {
    field.ok_or_else(|| ServiceError::InvalidArgument(format!("{} required", name)))
}

fn parse_amount(dollars: f64, name: &str) -> ServiceResult<Amount> {
    Amount::from_dollars(dollars)
        .map_err(|err| ServiceError::InvalidArgument(format!("{}: {}", name, err)))
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> ServiceResult<Json<UserResponse>> {
    let email = require(req.email, "email")?;
    let password = require(req.password, "password")?;

    let user = state.auth.register(&email, &password)?;
    Ok(Json(UserResponse { user: user.into() }))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> ServiceResult<Json<UserResponse>> {
    let email = require(req.email, "email")?;
    let password = require(req.password, "password")?;

    let user = state.auth.login(&email, &password)?;
    Ok(Json(UserResponse { user: user.into() }))
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MarketBody {
    pub outcome: &'static str,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct EventBody {
    pub id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub markets: Vec<MarketBody>,
}

impl From<EventWithMarkets> for EventBody {
    fn from(entry: EventWithMarkets) -> Self {
        EventBody {
            id: entry.event.id,
            title: entry.event.title,
            start_time: entry.event.start_time,
            markets: entry
                .markets
                .into_iter()
                .map(|quote| MarketBody {
                    outcome: quote.outcome.as_str(),
                    price: quote.price.decimal(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventBody>,
}

/// GET /api/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> ServiceResult<Json<EventsResponse>> {
    let events = state.catalog.open_events()?;
    Ok(Json(EventsResponse {
        events: events.into_iter().map(EventBody::from).collect(),
    }))
}

// ============================================================================
// WALLET
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WalletBody {
    pub balance: f64,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub wallet: WalletBody,
}

/// GET /api/wallet/:user_id
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ServiceResult<Json<WalletResponse>> {
    let balance = state.wallet.balance(user_id)?;
    Ok(Json(WalletResponse {
        wallet: WalletBody {
            balance: balance.as_dollars(),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: Option<i64>,
    pub amount: Option<f64>,
}

/// POST /api/deposit
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositRequest>,
) -> ServiceResult<Json<WalletResponse>> {
    let user_id = require(req.user_id, "userId")?;
    let amount = parse_amount(require(req.amount, "amount")?, "amount")?;

    let balance = state.wallet.deposit(user_id, amount)?;
    Ok(Json(WalletResponse {
        wallet: WalletBody {
            balance: balance.as_dollars(),
        },
    }))
}

// ============================================================================
// BETS
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub user_id: Option<i64>,
    pub event_id: Option<i64>,
    pub outcome: Option<String>,
    pub stake: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetResponse {
    pub bet_id: i64,
    pub potential_win: f64,
}

/// POST /api/place-bet
pub async fn place_bet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceBetRequest>,
) -> ServiceResult<Json<PlaceBetResponse>> {
    let user_id = require(req.user_id, "userId")?;
    let event_id = require(req.event_id, "eventId")?;
    let outcome = require(req.outcome, "outcome")?;
    let stake = parse_amount(require(req.stake, "stake")?, "stake")?;

    let placed = state.bets.place_bet(user_id, event_id, &outcome, stake)?;
    Ok(Json(PlaceBetResponse {
        bet_id: placed.bet_id,
        potential_win: placed.potential_win.as_dollars(),
    }))
}

// ============================================================================
// SETTLEMENT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub event_id: Option<i64>,
    pub winning_outcome: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub settled: bool,
    pub won: usize,
    pub lost: usize,
}

/// POST /api/settle
pub async fn settle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettleRequest>,
) -> ServiceResult<Json<SettleResponse>> {
    let event_id = require(req.event_id, "eventId")?;
    let winning = require(req.winning_outcome, "winningOutcome")?;

    let report = state.settlement.settle(event_id, &winning)?;
    Ok(Json(SettleResponse {
        settled: true,
        won: report.won,
        lost: report.lost,
    }))
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

pub async fn health_check() -> Json<HealthResponse> {
    let start = START_TIME.get_or_init(std::time::Instant::now);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: start.elapsed().as_secs(),
    })
}
