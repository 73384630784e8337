//! Bet engine: validated, atomic bet placement.
//!
//! A placed bet is a debit plus a bet row in a single store transaction.
//! The payout is priced and frozen here; nothing downstream recomputes
//! it.

use crate::error::{ServiceError, ServiceResult};
use crate::markets::parse_outcome;
use crate::money::Amount;
use crate::store::{Database, EventStatus};
use serde::Serialize;
use tracing::info;

/// Result of a successful placement
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlacedBet {
    pub bet_id: i64,
    pub potential_win: Amount,
}

#[derive(Clone)]
pub struct BetEngine {
    db: Database,
}

impl BetEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Place a stake-backed bet on an open event.
    ///
    /// Validation order: stake, outcome label, event existence and
    /// status — all before any mutation. The debit and the bet insert
    /// then apply as one transaction; every failure path leaves the
    /// balance unchanged.
    pub fn place_bet(
        &self,
        user_id: i64,
        event_id: i64,
        outcome_label: &str,
        stake: Amount,
    ) -> ServiceResult<PlacedBet> {
        if !stake.is_positive() {
            return Err(ServiceError::InvalidArgument(
                "stake must be positive".to_string(),
            ));
        }
        let outcome = parse_outcome(outcome_label)?;

        let event = self
            .db
            .get_event(event_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("event {}", event_id)))?;
        if event.status == EventStatus::Closed {
            return Err(ServiceError::EventClosed(event_id));
        }

        let potential_win = outcome.price().payout(stake);
        let bet_id = self
            .db
            .place_bet(user_id, event_id, outcome, stake, potential_win)?;

        info!(
            bet_id,
            user_id,
            event_id,
            %outcome,
            %stake,
            %potential_win,
            "bet placed"
        );
        Ok(PlacedBet {
            bet_id,
            potential_win,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BetStatus;
    use chrono::Utc;
    use std::sync::{Arc, Barrier};

    fn setup() -> (Database, BetEngine, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let user = db.insert_user("punter@example.com", "salt$digest").unwrap();
        let event_id = db.insert_event("Team A vs Team B", Utc::now()).unwrap();
        let engine = BetEngine::new(db.clone());
        (db, engine, user.id, event_id)
    }

    #[test]
    fn test_place_bet_freezes_payout() {
        let (db, engine, uid, event_id) = setup();
        db.credit_balance(uid, Amount::from_cents(10_000)).unwrap();

        let placed = engine
            .place_bet(uid, event_id, "A", Amount::from_cents(5_000))
            .unwrap();
        assert_eq!(placed.potential_win.cents(), 9_000); // 50.00 x 1.8

        assert_eq!(db.get_user(uid).unwrap().unwrap().balance.cents(), 5_000);
        let bet = db.get_bet(placed.bet_id).unwrap().unwrap();
        assert_eq!(bet.stake.cents(), 5_000);
        assert_eq!(bet.potential_win.cents(), 9_000);
        assert_eq!(bet.status, BetStatus::Open);
    }

    #[test]
    fn test_place_bet_validation_order() {
        let (db, engine, uid, event_id) = setup();
        db.credit_balance(uid, Amount::from_cents(1_000)).unwrap();

        let err = engine
            .place_bet(uid, event_id, "A", Amount::ZERO)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");

        let err = engine
            .place_bet(uid, event_id, "C", Amount::from_cents(100))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");

        let err = engine
            .place_bet(uid, 9999, "A", Amount::from_cents(100))
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let err = engine
            .place_bet(9999, event_id, "A", Amount::from_cents(100))
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");

        // No mutation happened along the way
        assert_eq!(db.get_user(uid).unwrap().unwrap().balance.cents(), 1_000);
    }

    #[test]
    fn test_place_bet_on_closed_event() {
        let (db, engine, uid, event_id) = setup();
        db.credit_balance(uid, Amount::from_cents(1_000)).unwrap();
        db.close_event(event_id).unwrap();

        let err = engine
            .place_bet(uid, event_id, "A", Amount::from_cents(100))
            .unwrap_err();
        assert_eq!(err.kind(), "event_closed");
        assert_eq!(db.get_user(uid).unwrap().unwrap().balance.cents(), 1_000);
    }

    #[test]
    fn test_insufficient_funds_leaves_balance() {
        let (db, engine, uid, event_id) = setup();
        db.credit_balance(uid, Amount::from_cents(4_000)).unwrap();

        let err = engine
            .place_bet(uid, event_id, "B", Amount::from_cents(4_001))
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");
        assert_eq!(db.get_user(uid).unwrap().unwrap().balance.cents(), 4_000);
        assert!(db.open_bets_for_event(event_id).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_full_balance_bets_one_wins() {
        let (db, engine, uid, event_id) = setup();
        db.credit_balance(uid, Amount::from_cents(10_000)).unwrap();

        // Two threads race to stake the entire balance. Exactly one may
        // pass the sufficient-funds check.
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.place_bet(uid, event_id, "A", Amount::from_cents(10_000))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == "insufficient_funds"));

        assert_eq!(db.get_user(uid).unwrap().unwrap().balance.cents(), 0);
        assert_eq!(db.open_bets_for_event(event_id).unwrap().len(), 1);
    }
}
