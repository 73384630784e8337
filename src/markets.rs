//! Market catalog: fixed-odds outcomes for open events.
//!
//! This demo uses the same three-way market for every event. Prices are
//! hard-coded; a real book would persist per-event markets and move the
//! prices.

use crate::error::{ServiceError, ServiceResult};
use crate::money::Price;
use crate::store::{Database, EventRow};

/// A bettable outcome of an event. Parsing is exhaustive: an
/// unrecognized label is rejected rather than defaulting to any price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    A,
    B,
    Draw,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::A, Outcome::B, Outcome::Draw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::A => "A",
            Outcome::B => "B",
            Outcome::Draw => "Draw",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Outcome::A),
            "B" => Some(Outcome::B),
            "Draw" => Some(Outcome::Draw),
            _ => None,
        }
    }

    /// Fixed payout multiplier for this outcome.
    pub fn price(&self) -> Price {
        match self {
            Outcome::A => Price::from_hundredths(180),
            Outcome::B => Price::from_hundredths(200),
            Outcome::Draw => Price::from_hundredths(350),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an outcome label from a request, failing loudly on anything
/// outside {A, B, Draw}.
pub fn parse_outcome(label: &str) -> ServiceResult<Outcome> {
    Outcome::from_str(label).ok_or_else(|| {
        ServiceError::InvalidArgument(format!(
            "unknown outcome '{}', expected one of A, B, Draw",
            label
        ))
    })
}

/// One quoted outcome of an event's market set
#[derive(Debug, Clone, Copy)]
pub struct MarketQuote {
    pub outcome: Outcome,
    pub price: Price,
}

/// An open event joined with its quoted markets
#[derive(Debug, Clone)]
pub struct EventWithMarkets {
    pub event: EventRow,
    pub markets: Vec<MarketQuote>,
}

/// Supplies the list of open events and their fixed-odds outcomes
#[derive(Clone)]
pub struct MarketCatalog {
    db: Database,
}

impl MarketCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open events in insertion order, each with the full market set.
    pub fn open_events(&self) -> ServiceResult<Vec<EventWithMarkets>> {
        let events = self.db.open_events()?;
        Ok(events
            .into_iter()
            .map(|event| EventWithMarkets {
                event,
                markets: Self::quotes(),
            })
            .collect())
    }

    fn quotes() -> Vec<MarketQuote> {
        Outcome::ALL
            .iter()
            .map(|&outcome| MarketQuote {
                outcome,
                price: outcome.price(),
            })
            .collect()
    }
}
