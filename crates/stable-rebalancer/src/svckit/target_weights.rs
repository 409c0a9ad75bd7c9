//! Target Weights Tool
//!
//! Risk scores (optionally blended with sentiment) to target weights and regime.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::model::{RiskScores, Symbol};
use crate::signal::blend_risks;
use crate::strategy::TargetWeightEngine;

const NAME: &str = "target_weights";

#[derive(Debug, Deserialize)]
struct TargetWeightsArgs {
    risks: RiskScores,

    /// Sentiment scores in [-1, 1], blended into `risks` when present
    #[serde(default)]
    sentiment: Option<BTreeMap<Symbol, f64>>,

    #[serde(default)]
    liquidity_quote: Option<f64>,
}

/// Tool for deriving risk-weighted target allocations
pub struct TargetWeightsTool {
    engine: Arc<TargetWeightEngine>,
}

impl TargetWeightsTool {
    pub const fn new(engine: Arc<TargetWeightEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for TargetWeightsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Derive target portfolio weights (inverse-risk, clamped, liquidity-gated) and the risk regime from per-asset risk scores.".into(),
            parameters: vec![
                ParameterSchema::required("risks", "object", "Map of symbol to risk in [0, 1]"),
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
            ],
            category: Some("allocation".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let args: TargetWeightsArgs = call.parse_arguments()?;

        let risks = match &args.sentiment {
            Some(sentiment) => match blend_risks(&args.risks, sentiment, self.engine.policy()) {
                Ok(blended) => blended,
                Err(e) => return Ok(ToolResult::failure(NAME, e.to_string())),
            },
            None => args.risks,
        };

        let derivation = match self.engine.derive_weights(&risks, args.liquidity_quote) {
            Ok(d) => d,
            Err(e) => return Ok(ToolResult::failure(NAME, e.to_string())),
        };

        let mut output = format!(
            "Regime: {} | liquidity gate {}\nTarget weights:\n",
            derivation.regime,
            if derivation.liquidity_gated { "applied" } else { "not applied" }
        );
        for (symbol, w) in &derivation.weights {
            let _ = writeln!(output, "  {symbol}: {:.2}%", w * 100.0);
        }

        ToolResult::with_payload(NAME, output.trim_end(), &derivation)
    }
}
