//! Settlement engine: closes an event and resolves its open bets.
//!
//! Each bet settles in its own guarded transaction, so one failing
//! payout neither blocks the rest nor allows a retry to pay twice.

use crate::error::{ServiceError, ServiceResult};
use crate::markets::parse_outcome;
use crate::store::Database;
use crate::wallet::WalletService;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome counts from a settlement pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SettlementReport {
    pub settled: usize,
    pub won: usize,
    pub lost: usize,
}

#[derive(Clone)]
pub struct SettlementEngine {
    db: Database,
    wallet: WalletService,
}

impl SettlementEngine {
    pub fn new(db: Database, wallet: WalletService) -> Self {
        Self { db, wallet }
    }

    /// Close the event and resolve every still-open bet on it.
    ///
    /// Winners are credited their frozen payout through the wallet;
    /// losers are marked lost. Only bets with status open are touched,
    /// so settling the same event again is a no-op for balances.
    pub fn settle(&self, event_id: i64, winning_label: &str) -> ServiceResult<SettlementReport> {
        let winning = parse_outcome(winning_label)?;

        self.db
            .get_event(event_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("event {}", event_id)))?;

        // open -> closed exactly once; a repeated call is a no-op
        let closed_now = self.db.close_event(event_id)?;
        if !closed_now {
            info!(event_id, "event already closed, settling remaining open bets");
        }

        let bets = self.db.open_bets_for_event(event_id)?;
        let mut report = SettlementReport::default();
        let mut first_failure: Option<ServiceError> = None;

        for bet in &bets {
            let result = if bet.outcome == winning {
                self.wallet
                    .pay_out_bet(bet.id, bet.user_id, bet.potential_win)
                    .map(|applied| (applied, true))
            } else {
                self.db
                    .settle_bet_lost(bet.id)
                    .map(|applied| (applied, false))
                    .map_err(ServiceError::from)
            };

            match result {
                Ok((true, won)) => {
                    report.settled += 1;
                    if won {
                        report.won += 1;
                    } else {
                        report.lost += 1;
                    }
                }
                Ok((false, _)) => {
                    // Lost a race with another settle call; nothing to do
                }
                Err(err) => {
                    // Other bets settle independently; surface the first
                    // failure once the pass completes.
                    warn!(bet_id = bet.id, event_id, "failed to settle bet: {err}");
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err);
        }

        info!(
            event_id,
            %winning,
            settled = report.settled,
            won = report.won,
            lost = report.lost,
            "event settled"
        );
        Ok(report)
    }
}
