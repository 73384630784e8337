//! Wallet service: the only component that mutates user balances.
//!
//! Deposits and credits add funds; debits are atomic check-and-apply
//! through the store, so a balance can never go negative.

use crate::error::{ServiceError, ServiceResult};
use crate::money::Amount;
use crate::store::Database;
use tracing::info;

#[derive(Clone)]
pub struct WalletService {
    db: Database,
}

impl WalletService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current balance, NotFound if the user does not exist.
    pub fn balance(&self, user_id: i64) -> ServiceResult<Amount> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;
        Ok(user.balance)
    }

    /// Add funds and return the new balance. The amount must be
    /// strictly positive; no upper bound is enforced.
    pub fn deposit(&self, user_id: i64, amount: Amount) -> ServiceResult<Amount> {
        if !amount.is_positive() {
            return Err(ServiceError::InvalidArgument(
                "deposit amount must be positive".to_string(),
            ));
        }

        let balance = self.db.credit_balance(user_id, amount)?;
        info!(user_id, %amount, %balance, "deposit applied");
        Ok(balance)
    }

    /// Remove funds, failing with InsufficientFunds if the balance does
    /// not cover the amount. Check and subtraction are indivisible.
    pub fn debit(&self, user_id: i64, amount: Amount) -> ServiceResult<Amount> {
        if !amount.is_positive() {
            return Err(ServiceError::InvalidArgument(
                "debit amount must be positive".to_string(),
            ));
        }

        let balance = self.db.debit_balance(user_id, amount)?;
        Ok(balance)
    }

    /// Add a payout. Unlike deposit, zero is allowed (a losing bet
    /// credits nothing).
    pub fn credit(&self, user_id: i64, amount: Amount) -> ServiceResult<Amount> {
        if amount.is_negative() {
            return Err(ServiceError::InvalidArgument(
                "credit amount must not be negative".to_string(),
            ));
        }
        if amount == Amount::ZERO {
            return self.balance(user_id);
        }

        let balance = self.db.credit_balance(user_id, amount)?;
        Ok(balance)
    }

    /// Credit a winning bet's frozen payout, atomically with the bet's
    /// open -> won transition. Returns false without touching the
    /// balance if the bet was already settled.
    pub fn pay_out_bet(&self, bet_id: i64, user_id: i64, payout: Amount) -> ServiceResult<bool> {
        if payout.is_negative() {
            return Err(ServiceError::InvalidArgument(
                "payout must not be negative".to_string(),
            ));
        }
        Ok(self.db.settle_bet_won(bet_id, user_id, payout)?)
    }
}
