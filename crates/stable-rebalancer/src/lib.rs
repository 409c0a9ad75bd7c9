//! # stable-rebalancer
//!
//! Risk-weighted rebalancing for a basket of USD stablecoins.
//!
//! ## Pipeline
//!
//! ```text
//! peg / sentiment ──▶ risk scores ──▶ Target-Weight Engine ──▶ weights + regime
//!                                                                   │
//! balances ─────────────────────────────────────────────────────────┤
//!                                                                   ▼
//!                                            delta = (target − current) × value
//!                                                                   │
//!                                                                   ▼
//!                                  Swap-Plan Builder ──▶ sells → base → buys
//! ```
//!
//! ## Example: $2500 across three coins, USDC as base
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sells (to USDC)          │  Buys (from USDC)               │
//! ├───────────────────────────┼─────────────────────────────────┤
//! │  DAI   136.40             │  BUSD  113.60    PYUSD 263.60   │
//! │  USDT  254.80             │  FDUSD  63.60    TUSD  213.60   │
//! │                           │  GUSD  263.60    USDD  145.20   │
//! │                           │  USDP  163.60                   │
//! ├───────────────────────────┴─────────────────────────────────┤
//! │  pool start 1591.20  │  buys 1226.80  │  shortfall 0.00     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine and the builder are pure: no I/O, no clocks, no shared state.
//! Degraded conditions (oversell, shortfall, unabsorbed base release) come
//! back as data in `SwapPlan::warnings` and `SwapPlan::shortfall`.

pub mod error;
pub mod feed;
pub mod model;
pub mod notify;
pub mod signal;
pub mod strategy;
pub mod svckit;

pub use error::{RebalanceError, Result};
pub use model::{
    Balances, Policy, Regime, RiskScores, SwapIntent, SwapLeg, SwapPlan, Symbol, TargetWeights,
    TradeDeltas, Universe,
};
pub use strategy::{
    RebalancePreview, RebalanceSettings, TargetWeightEngine, WeightDerivation, build_swap_plan,
    compute_trade_deltas, preview_rebalance,
};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{PegRiskTool, RebalancePreviewTool, SwapPlanTool, TargetWeightsTool};
}

/// System prompt for an agent driving the rebalancer tools
pub const REBALANCER_PROMPT: &str = r"You help users keep a basket of USD stablecoins balanced by risk.

## Approach

1. Use `peg_risk` to sample prices and score how far each coin trades from $1
2. Use `target_weights` to turn risk scores into target weights and a regime
3. Use `rebalance_preview` with the user's balances to get trade deltas and a swap plan
4. Use `swap_plan` when the user supplies their own deltas

## Communicating

- Lead with the regime: GREEN (healthy), YELLOW (watch), RED (act)
- Explain that safer coins get more weight and no coin exceeds the weight cap
- Call out any shortfall or warning in the plan
- Every plan is a proposal; nothing is executed

Never quote numbers that did not come from a tool result.";
