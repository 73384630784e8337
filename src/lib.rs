//! Demo fixed-odds betting platform.
//!
//! Users register, deposit into a wallet, and place stake-backed bets on
//! open events; an operator settles each event and winners are paid their
//! frozen payout. The core is the ledger: every balance mutation is
//! atomic and cents-precise, so money is never lost or duplicated under
//! concurrent or partial-failure conditions.

pub mod api;
pub mod auth;
pub mod bets;
pub mod error;
pub mod markets;
pub mod money;
pub mod settlement;
pub mod store;
pub mod wallet;
