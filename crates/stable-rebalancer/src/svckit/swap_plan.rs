//! Swap Plan Tool
//!
//! Balances and trade deltas to a base-routed swap plan.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::model::{Balances, Symbol, TradeDeltas};
use crate::notify::format_rebalance_alert;
use crate::strategy::{RebalanceSettings, apply_slippage, build_swap_plan};

const NAME: &str = "swap_plan";

#[derive(Debug, Deserialize)]
struct SwapPlanArgs {
    balances: Balances,
    deltas: TradeDeltas,
    #[serde(default)]
    base: Option<Symbol>,
    #[serde(default)]
    wallet_base_available: Option<Decimal>,
    #[serde(default)]
    tolerance: Option<Decimal>,
    #[serde(default)]
    slippage_bps: Option<u32>,
}

/// Tool for turning deltas into executable swap legs
pub struct SwapPlanTool {
    defaults: RebalanceSettings,
}

impl SwapPlanTool {
    pub const fn new(defaults: RebalanceSettings) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl Tool for SwapPlanTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Build an ordered sell/buy plan routed through one base asset from balances and signed dollar deltas, reporting shortfalls and clamps.".into(),
            parameters: vec![
                ParameterSchema::required(
                    "balances",
                    "object",
                    "Map of symbol to current holding in dollars",
                ),
                ParameterSchema::required(
                    "deltas",
                    "object",
                    "Map of symbol to signed dollar change (+ buy, - sell)",
                ),
                ParameterSchema::optional(
                    "base",
                    "string",
                    "Routing asset",
                    Some(self.defaults.base.as_str().into()),
                ),
                ParameterSchema::optional(
                    "wallet_base_available",
                    "number",
                    "Extra base liquidity outside balances",
                    Some(0.into()),
                ),
                ParameterSchema::optional(
                    "tolerance",
                    "number",
                    "Allowed |sum(deltas)| before warning",
                    Some(1.into()),
                ),
                ParameterSchema::optional(
                    "slippage_bps",
                    "number",
                    "Slippage allowance for min_receive",
                    Some(self.defaults.slippage_bps.into()),
                ),
            ],
            category: Some("execution".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let args: SwapPlanArgs = call.parse_arguments()?;
        let base = args.base.unwrap_or_else(|| self.defaults.base.clone());

        let plan = build_swap_plan(
            &args.balances,
            &args.deltas,
            &base,
            args.wallet_base_available.unwrap_or(self.defaults.wallet_base_available),
            args.tolerance.unwrap_or(self.defaults.tolerance),
        )
        .and_then(|mut plan| {
            apply_slippage(&mut plan, args.slippage_bps.unwrap_or(self.defaults.slippage_bps))?;
            Ok(plan)
        });

        match plan {
            Ok(plan) => ToolResult::with_payload(NAME, format_rebalance_alert(&plan, None), &plan),
            Err(e) => Ok(ToolResult::failure(NAME, e.to_string())),
        }
    }
}
