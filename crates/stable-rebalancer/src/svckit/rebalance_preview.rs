//! Rebalance Preview Tool
//!
//! Full pipeline in one call: balances and risks to weights, deltas and plan.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::model::{Balances, RiskScores, Symbol};
use crate::notify::fallback_summary;
use crate::signal::blend_risks;
use crate::strategy::{RebalanceSettings, TargetWeightEngine, preview_rebalance};

const NAME: &str = "rebalance_preview";

#[derive(Debug, Deserialize)]
struct PreviewArgs {
    balances: Balances,
    #[serde(default)]
    risks: RiskScores,
    #[serde(default)]
    sentiment: Option<BTreeMap<Symbol, f64>>,
    #[serde(default)]
    liquidity_quote: Option<f64>,
    #[serde(default)]
    wallet_base_available: Option<Decimal>,
}

/// Tool for previewing a complete rebalance
pub struct RebalancePreviewTool {
    engine: Arc<TargetWeightEngine>,
    settings: RebalanceSettings,
}

impl RebalancePreviewTool {
    pub const fn new(engine: Arc<TargetWeightEngine>, settings: RebalanceSettings) -> Self {
        Self { engine, settings }
    }
}

#[async_trait]
impl Tool for RebalancePreviewTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Preview a stablecoin rebalance: current vs suggested allocation, trade deltas, swap plan, regime and rationale.".into(),
            parameters: vec![
                ParameterSchema::required(
                    "balances",
                    "object",
                    "Map of symbol to current holding in dollars",
                ),
                ParameterSchema::optional(
                    "risks",
                    "object",
                    "Map of symbol to risk in [0, 1]",
                    None,
                ),
                ParameterSchema::optional(
                    "sentiment",
                    "object",
                    "Map of symbol to sentiment in [-1, 1]",
                    None,
                ),
                ParameterSchema::optional(
                    "liquidity_quote",
                    "number",
                    "Observed reference swap rate (1.0 = par)",
                    None,
                ),
                ParameterSchema::optional(
                    "wallet_base_available",
                    "number",
                    "Extra base liquidity outside balances",
                    None,
                ),
            ],
            category: Some("allocation".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let args: PreviewArgs = call.parse_arguments()?;

        let risks = match &args.sentiment {
            Some(sentiment) => match blend_risks(&args.risks, sentiment, self.engine.policy()) {
                Ok(blended) => blended,
                Err(e) => return Ok(ToolResult::failure(NAME, e.to_string())),
            },
            None => args.risks,
        };

        let mut settings = self.settings.clone();
        if let Some(wallet) = args.wallet_base_available {
            settings.wallet_base_available = wallet;
        }

        let preview = preview_rebalance(
            &self.engine,
            &args.balances,
            &risks,
            args.liquidity_quote,
            &settings,
        );
        match preview {
            Ok(preview) => ToolResult::with_payload(NAME, fallback_summary(&preview), &preview),
            Err(e) => Ok(ToolResult::failure(NAME, e.to_string())),
        }
    }
}
