use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a traded pair, built from its two legs (`"Y_X"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId(pub String);

impl PairId {
    pub fn new(leg_y: &str, leg_x: &str) -> Self {
        Self(format!("{leg_y}_{leg_x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
