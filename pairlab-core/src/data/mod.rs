//! Price data: the source interface, forward-fill alignment, and the bar feed.

pub mod align;
pub mod feed;
pub mod source;
pub mod synthetic;

pub use align::{forward_fill_align, AlignedSeries};
pub use feed::{BarFeed, FeedError, FeedOptions, PriceView, DEFAULT_HISTORY_CAPACITY};
pub use source::{InMemorySource, PriceSource, SourceError};
