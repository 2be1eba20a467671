//! Event taxonomy: the data contract between feed, strategy, portfolio and execution.
//!
//! Every event is created by exactly one component and consumed by exactly one other:
//!
//! | Event    | Producer            | Consumer            |
//! |----------|---------------------|---------------------|
//! | `Market` | bar feed            | strategy, portfolio |
//! | `Signal` | strategy            | portfolio           |
//! | `Order`  | portfolio           | execution simulator |
//! | `Fill`   | execution simulator | portfolio           |
//!
//! Events are immutable value objects. The queue owns them while in flight.

use super::ids::PairId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Directional intent carried by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    Long,
    Short,
    /// Flatten whatever position is held in the symbol.
    Exit,
}

impl SignalDirection {
    pub fn is_exit(self) -> bool {
        matches!(self, Self::Exit)
    }
}

/// Which side of a pair a signal leg belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    /// Dependent leg (`y` in `y = α + β·x`).
    Y,
    /// Explanatory leg.
    X,
}

/// Links a signal to the pair that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegGroup {
    pub pair: PairId,
    pub leg: Leg,
}

/// One time step of the shared clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: SignalDirection,
    /// Conviction in [0, 1].
    pub strength: f64,
    /// Volatility estimate used by the risk-parity sizer (spread std in price units).
    pub est_volatility: f64,
    /// Pair membership, when the signal is one leg of a paired trade.
    pub group: Option<LegGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill at the current bar's close, degraded by slippage.
    Market,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub order_type: OrderType,
    /// Always positive; direction lives in `side`.
    pub quantity: u64,
    pub side: OrderSide,
    /// Pair whose leg this order opens or closes.
    #[serde(default)]
    pub pair: Option<PairId>,
}

impl OrderEvent {
    pub fn market(symbol: impl Into<String>, quantity: u64, side: OrderSide) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Market,
            quantity,
            side,
            pair: None,
        }
    }

    pub fn for_pair(mut self, pair: PairId) -> Self {
        self.pair = Some(pair);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub exchange: String,
    pub quantity: u64,
    pub side: OrderSide,
    pub fill_price: f64,
    pub commission: f64,
    /// Copied from the order; lets the book attribute the shares to a pair.
    #[serde(default)]
    pub pair: Option<PairId>,
}

impl FillEvent {
    /// Signed share delta this fill applies to the position.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity as i64
    }

    /// Cash leaving the account: `price * qty * sign + commission`.
    pub fn cash_outflow(&self) -> f64 {
        self.fill_price * self.quantity as f64 * self.side.sign() as f64 + self.commission
    }
}

/// Tagged union of everything that travels through the event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    /// Symbol referenced by the event, if any. Market events reference none.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Market(_) => None,
            Self::Signal(s) => Some(&s.symbol),
            Self::Order(o) => Some(&o.symbol),
            Self::Fill(f) => Some(&f.symbol),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Market(_) => "market",
            Self::Signal(_) => "signal",
            Self::Order(_) => "order",
            Self::Fill(_) => "fill",
        }
    }
}
