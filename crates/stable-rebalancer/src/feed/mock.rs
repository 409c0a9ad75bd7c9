//! Static Price Feed
//!
//! In-memory prices for tests and demos. Prices can be moved at runtime
//! to simulate a depeg.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{PriceFeed, PriceQuote};
use crate::error::{RebalanceError, Result};
use crate::model::{Symbol, Universe};

pub struct StaticPriceFeed {
    prices: RwLock<BTreeMap<Symbol, f64>>,
}

impl Default for StaticPriceFeed {
    fn default() -> Self {
        Self::pegged(&Universe::stablecoins())
    }
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self { prices: RwLock::new(BTreeMap::new()) }
    }

    /// Every asset of the universe quoted at exactly $1
    pub fn pegged(universe: &Universe) -> Self {
        let prices = universe.symbols().iter().map(|s| (s.clone(), 1.0)).collect();
        Self { prices: RwLock::new(prices) }
    }

    #[must_use]
    pub fn with_price(self, symbol: impl Into<Symbol>, price: f64) -> Self {
        let mut prices = self.prices.into_inner();
        prices.insert(symbol.into(), price);
        Self { prices: RwLock::new(prices) }
    }

    pub async fn set_price(&self, symbol: impl Into<Symbol>, price: f64) {
        self.prices.write().await.insert(symbol.into(), price);
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn spot_price(&self, symbol: &Symbol) -> Result<PriceQuote> {
        let price = self
            .prices
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| RebalanceError::PriceUnavailable(symbol.to_string()))?;

        Ok(PriceQuote {
            symbol: symbol.clone(),
            price,
            observed_at: Utc::now(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "StaticPriceFeed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_feed_quotes() {
        let feed = StaticPriceFeed::default().with_price("USDD", 0.97);

        let usdc = feed.spot_price(&Symbol::from("USDC")).await.unwrap();
        assert!((usdc.price - 1.0).abs() < f64::EPSILON);

        let usdd = feed.spot_price(&Symbol::from("usdd")).await.unwrap();
        assert!((usdd.price - 0.97).abs() < f64::EPSILON);
        assert!(feed.health_check().await);
    }

    #[tokio::test]
    async fn test_unknown_symbol_unavailable() {
        let feed = StaticPriceFeed::new();
        let err = feed.spot_price(&Symbol::from("NOTREAL")).await.unwrap_err();
        assert!(matches!(err, RebalanceError::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_spot_prices_skips_missing() {
        let feed = StaticPriceFeed::new().with_price("USDC", 1.0);
        feed.set_price("DAI", 0.999).await;

        let symbols = [Symbol::from("USDC"), Symbol::from("DAI"), Symbol::from("GUSD")];
        let quotes = feed.spot_prices(&symbols).await.unwrap();
        assert_eq!(quotes.len(), 2);
    }
}
