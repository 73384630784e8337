//! HTTP/JSON API surface.
//!
//! Thin layer over the services: handlers decode requests, call into
//! the engines, and encode responses. No business rules live here.

pub mod handlers;
pub mod server;

pub use server::{ApiConfig, ApiServer};

use crate::auth::AuthService;
use crate::bets::BetEngine;
use crate::markets::MarketCatalog;
use crate::settlement::SettlementEngine;
use crate::store::Database;
use crate::wallet::WalletService;

/// Shared state for all handlers: one service of each kind over a
/// common store handle.
pub struct AppState {
    pub auth: AuthService,
    pub wallet: WalletService,
    pub catalog: MarketCatalog,
    pub bets: BetEngine,
    pub settlement: SettlementEngine,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let wallet = WalletService::new(db.clone());
        Self {
            auth: AuthService::new(db.clone()),
            catalog: MarketCatalog::new(db.clone()),
            bets: BetEngine::new(db.clone()),
            settlement: SettlementEngine::new(db, wallet.clone()),
            wallet,
        }
    }
}
