//! Service Kit - Agent Tools
//!
//! Domain tools implementing `agent_core::Tool` for the rebalancer.

mod peg_risk;
mod rebalance_preview;
mod swap_plan;
mod target_weights;

pub use peg_risk::{PegRiskReport, PegRiskTool};
pub use rebalance_preview::RebalancePreviewTool;
pub use swap_plan::SwapPlanTool;
pub use target_weights::TargetWeightsTool;
