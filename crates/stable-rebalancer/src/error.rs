//! Error Types for the Stablecoin Rebalancer

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RebalanceError>;

#[derive(Error, Debug)]
pub enum RebalanceError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid risk for {symbol}: {value} (must be finite and within [0, 1])")]
    InvalidRisk { symbol: String, value: f64 },

    #[error("Invalid balance for {symbol}: {amount} (must be >= 0)")]
    InvalidBalance { symbol: String, amount: Decimal },

    #[error("Asset not in universe: {0}")]
    UnknownAsset(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Price feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RebalanceError {
    /// True when the caller supplied bad data, as opposed to an environment failure
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPolicy(_)
                | Self::InvalidRisk { .. }
                | Self::InvalidBalance { .. }
                | Self::UnknownAsset(_)
                | Self::InvalidInput(_)
        )
    }
}
