//! Price Feeds
//!
//! Sources of stablecoin spot prices for peg monitoring.

mod mock;

pub use mock::StaticPriceFeed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Symbol;

/// One observed USD price
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: Symbol,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Price feed trait (Strategy pattern)
///
/// Implement this per source: an aggregator API, a CEX order book, an on-chain oracle.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current USD price for a symbol
    async fn spot_price(&self, symbol: &Symbol) -> Result<PriceQuote>;

    /// Prices for several symbols; unavailable symbols are skipped
    async fn spot_prices(&self, symbols: &[Symbol]) -> Result<Vec<PriceQuote>> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.spot_price(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    tracing::warn!(feed = self.name(), %symbol, error = %e, "Price unavailable");
                }
            }
        }
        Ok(quotes)
    }

    /// Check if the source is reachable
    async fn health_check(&self) -> bool;

    /// Feed name
    fn name(&self) -> &str;
}
