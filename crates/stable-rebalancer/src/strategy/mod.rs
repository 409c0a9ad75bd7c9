//! Rebalancing Strategies
//!
//! Target weights from risk, trade deltas from weights, swap legs from deltas.

mod rebalance;
mod swap_plan;
mod weights;

pub use rebalance::{
    RebalancePreview, RebalanceSettings, compute_trade_deltas, current_weights, delta_imbalance,
    portfolio_value, preview_rebalance,
};
pub use swap_plan::{DEFAULT_TOLERANCE, MAX_AMOUNT, apply_slippage, build_swap_plan, round2};
pub use weights::{TargetWeightEngine, WeightDerivation, detect_regime};
