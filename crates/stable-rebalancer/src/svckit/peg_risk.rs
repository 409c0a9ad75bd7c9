//! Peg Risk Tool
//!
//! Polls a price feed, keeps a rolling window per asset and scores peg risk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::RwLock;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::feed::PriceFeed;
use crate::model::{Policy, Regime, RiskScores, Symbol, Universe};
use crate::signal::{DEFAULT_WINDOW, PegStats, PegWindow};
use crate::strategy::detect_regime;

const NAME: &str = "peg_risk";

#[derive(Debug, Default, Deserialize)]
struct PegRiskArgs {
    /// Defaults to the whole universe
    #[serde(default)]
    symbols: Option<Vec<Symbol>>,
}

/// Latest peg scan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PegRiskReport {
    pub risks: RiskScores,
    pub stats: BTreeMap<Symbol, PegStats>,
    pub worst_risk: f64,
    pub regime: Regime,
}

/// Tool for scoring peg stability
pub struct PegRiskTool {
    feed: Arc<dyn PriceFeed>,
    universe: Universe,
    policy: Policy,
    window_size: usize,
    windows: RwLock<HashMap<Symbol, PegWindow>>,
}

impl PegRiskTool {
    pub fn new(feed: Arc<dyn PriceFeed>, universe: Universe, policy: Policy) -> Self {
        Self {
            feed,
            universe,
            policy,
            window_size: DEFAULT_WINDOW,
            windows: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(1);
        self
    }

    /// Poll the feed once and score every requested asset
    pub async fn scan(&self, symbols: &[Symbol]) -> PegRiskReport {
        let quotes = match self.feed.spot_prices(symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(feed = self.feed.name(), error = %e, "Peg scan failed");
                Vec::new()
            }
        };

        let mut windows = self.windows.write().await;
        for quote in quotes {
            let window = windows
                .entry(quote.symbol.clone())
                .or_insert_with(|| PegWindow::new(self.window_size));
            if let Err(e) = window.push(quote.price) {
                tracing::warn!(symbol = %quote.symbol, error = %e, "Dropped price sample");
            }
        }

        let stats: BTreeMap<Symbol, PegStats> = symbols
            .iter()
            .filter_map(|s| {
                windows
                    .get(s)
                    .filter(|w| !w.is_empty())
                    .map(|w| (s.clone(), w.stats()))
            })
            .collect();
        drop(windows);

        let risks: RiskScores = stats.iter().map(|(s, st)| (s.clone(), st.risk())).collect();
        let worst_risk = risks.values().copied().fold(0.0_f64, f64::max);
        let regime = detect_regime(&risks, &self.policy);

        tracing::info!(assets = risks.len(), worst_risk, %regime, "Peg scan");

        PegRiskReport {
            risks,
            stats,
            worst_risk,
            regime,
        }
    }
}

#[async_trait]
impl Tool for PegRiskTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Sample stablecoin prices and score peg risk (0..1) from spot deviation, TWAP deviation and persistence over a rolling window.".into(),
            parameters: vec![ParameterSchema::optional(
                "symbols",
                "array",
                "Symbols to scan (default: whole universe)",
                None,
            )],
            category: Some("risk".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let args: PegRiskArgs = call.parse_arguments()?;
        let symbols = args.symbols.unwrap_or_else(|| self.universe.symbols().to_vec());
        if let Some(unknown) = symbols.iter().find(|s| !self.universe.contains(s.as_str())) {
            return Ok(ToolResult::failure(NAME, format!("Asset not in universe: {unknown}")));
        }

        let report = self.scan(&symbols).await;

        let mut output = format!(
            "Peg scan: regime {} (worst risk {:.3})\n",
            report.regime, report.worst_risk
        );
        for (symbol, st) in &report.stats {
            let _ = writeln!(
                output,
                "  {symbol}: risk {:.3} | spot {:.1} bps | twap {:.1} bps | persist {:.2}",
                st.risk(),
                st.spot_dev * 10_000.0,
                st.twap_dev * 10_000.0,
                st.persist
            );
        }
        let missing: Vec<&str> = symbols
            .iter()
            .filter(|s| !report.stats.contains_key(*s))
            .map(Symbol::as_str)
            .collect();
        if !missing.is_empty() {
            let _ = write!(output, "Unavailable: {}", missing.join(", "));
        }

        ToolResult::with_payload(NAME, output.trim_end(), &report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StaticPriceFeed;
    use serde_json::json;

    fn tool(feed: Arc<StaticPriceFeed>) -> PegRiskTool {
        PegRiskTool::new(feed, Universe::stablecoins(), Policy::default())
    }

    #[tokio::test]
    async fn test_pegged_universe_is_green() {
        let tool = tool(Arc::new(StaticPriceFeed::default()));
        let result = tool.execute(&ToolCall::new(NAME, json!({}))).await.unwrap();

        assert!(result.success);
        let report: PegRiskReport = serde_json::from_value(result.data.unwrap()).unwrap();
        assert_eq!(report.regime, Regime::Green);
        assert_eq!(report.risks.len(), 10);
    }

    #[tokio::test]
    async fn test_depeg_accumulates_across_scans() {
        let feed = Arc::new(StaticPriceFeed::default());
        let tool = tool(Arc::clone(&feed));
        let usdd = [Symbol::from("USDD")];

        feed.set_price("USDD", 0.97).await;
        let first = tool.scan(&usdd).await;
        let second = tool.scan(&usdd).await;

        // 0.5 * saturated deviation + 0.3 * full persistence
        assert!((first.risks["USDD"] - 0.8).abs() < 1e-9);
        assert_eq!(second.regime, Regime::Red);

        feed.set_price("USDD", 1.0).await;
        let recovering = tool.scan(&usdd).await;
        assert!(recovering.risks["USDD"] < second.risks["USDD"]);
    }

    #[tokio::test]
    async fn test_unknown_symbol_fails() {
        let tool = tool(Arc::new(StaticPriceFeed::default()));
        let call = ToolCall::new(NAME, json!({"symbols": ["DOGE"]}));
        let result = tool.execute(&call).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_missing_price_reported() {
        let feed = Arc::new(StaticPriceFeed::new().with_price("USDC", 1.0));
        let tool = tool(feed);
        let call = ToolCall::new(NAME, json!({"symbols": ["USDC", "DAI"]}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("Unavailable: DAI"));
    }
}
