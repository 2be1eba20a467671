//! Domain types for PairLab

pub mod bar;
pub mod event;
pub mod ids;

pub use bar::{Bar, PricePoint};
pub use event::{
    Event, FillEvent, Leg, LegGroup, MarketEvent, OrderEvent, OrderSide, OrderType,
    SignalDirection, SignalEvent,
};
pub use ids::PairId;
