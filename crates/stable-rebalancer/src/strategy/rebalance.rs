//! Rebalance Pipeline
//!
//! Balances and target weights in, dollar deltas and a swap plan out.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::swap_plan::{DEFAULT_TOLERANCE, apply_slippage, build_swap_plan, check_amount, round2};
use super::weights::TargetWeightEngine;
use crate::error::{RebalanceError, Result};
use crate::model::{Balances, Regime, RiskScores, SwapPlan, Symbol, TargetWeights, TradeDeltas};

/// Execution settings for a rebalance preview
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceSettings {
    /// Routing asset for every swap
    pub base: Symbol,

    /// Base liquidity held outside the tracked balances
    pub wallet_base_available: Decimal,

    /// Allowed |sum(deltas)| before the plan warns
    pub tolerance: Decimal,

    /// Deltas not above this share of portfolio value are dropped
    pub min_trade_fraction: f64,

    pub slippage_bps: u32,
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self {
            base: Symbol::from("USDC"),
            wallet_base_available: Decimal::ZERO,
            tolerance: DEFAULT_TOLERANCE,
            min_trade_fraction: 0.0,
            slippage_bps: 30,
        }
    }
}

/// Everything a user needs to review a proposed rebalance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebalancePreview {
    pub portfolio_value: Decimal,
    pub current_allocation: TargetWeights,
    pub suggested_allocation: TargetWeights,
    pub trade_deltas: TradeDeltas,
    pub swap_plan: SwapPlan,
    pub regime: Regime,
    pub liquidity_gated: bool,
    pub rationale: String,
}

/// Share of portfolio value held in each asset
pub fn current_weights(balances: &Balances) -> TargetWeights {
    let total = saturating_sum(balances.values());
    if total <= Decimal::ZERO {
        return TargetWeights::new();
    }
    balances
        .iter()
        .map(|(s, b)| (s.clone(), (b / total).to_f64().unwrap_or(0.0)))
        .collect()
}

/// Dollar deltas that move `balances` onto `target_weights`.
///
/// Covers every held or targeted asset. Deltas whose magnitude is not
/// above `min_trade_fraction` of the portfolio are dropped.
pub fn compute_trade_deltas(
    balances: &Balances,
    target_weights: &TargetWeights,
    min_trade_fraction: f64,
) -> Result<TradeDeltas> {
    if let Some((symbol, amount)) = balances.iter().find(|(_, a)| **a < Decimal::ZERO) {
        return Err(RebalanceError::InvalidBalance {
            symbol: symbol.to_string(),
            amount: *amount,
        });
    }
    for (symbol, amount) in balances {
        check_amount("balance", symbol.as_str(), *amount)?;
    }
    if let Some((symbol, w)) = target_weights
        .iter()
        .find(|(_, w)| !w.is_finite() || !(0.0..=1.0).contains(*w))
    {
        return Err(RebalanceError::InvalidInput(format!("invalid target weight {w} for {symbol}")));
    }
    if !min_trade_fraction.is_finite() || !(0.0..=1.0).contains(&min_trade_fraction) {
        return Err(RebalanceError::InvalidInput(format!(
            "min_trade_fraction must be within [0, 1], got {min_trade_fraction}"
        )));
    }

    let total: Decimal = balances.values().sum();
    if total <= Decimal::ZERO {
        return Err(RebalanceError::InvalidInput("portfolio value is zero".into()));
    }
    let threshold = total * to_decimal(min_trade_fraction);

    let mut symbols: Vec<&Symbol> = balances.keys().chain(target_weights.keys()).collect();
    symbols.sort();
    symbols.dedup();

    let deltas: TradeDeltas = symbols
        .into_iter()
        .filter_map(|symbol| {
            let held = balances.get(symbol).copied().unwrap_or(Decimal::ZERO);
            let target = to_decimal(target_weights.get(symbol).copied().unwrap_or(0.0));
            let delta = round2(target * total - held);
            (!delta.is_zero() && delta.abs() > threshold).then(|| (symbol.clone(), delta))
        })
        .collect();

    tracing::debug!(
        total = %total,
        trades = deltas.len(),
        imbalance = %delta_imbalance(&deltas),
        "Computed trade deltas"
    );
    Ok(deltas)
}

/// Signed sum of deltas; ≈ 0 for a dollar-neutral rebalance
pub fn delta_imbalance(deltas: &TradeDeltas) -> Decimal {
    saturating_sum(deltas.values())
}

/// Run the whole pipeline: weights, deltas, plan, slippage hints
pub fn preview_rebalance(
    engine: &TargetWeightEngine,
    balances: &Balances,
    risks: &RiskScores,
    liquidity_quote: Option<f64>,
    settings: &RebalanceSettings,
) -> Result<RebalancePreview> {
    if let Some(symbol) = balances.keys().find(|s| !engine.universe().contains(s.as_str())) {
        return Err(RebalanceError::UnknownAsset(symbol.to_string()));
    }

    let derivation = engine.derive_weights(risks, liquidity_quote)?;
    let trade_deltas =
        compute_trade_deltas(balances, &derivation.weights, settings.min_trade_fraction)?;

    let mut swap_plan = build_swap_plan(
        balances,
        &trade_deltas,
        &settings.base,
        settings.wallet_base_available,
        settings.tolerance,
    )?;
    apply_slippage(&mut swap_plan, settings.slippage_bps)?;

    let rationale = format!(
        "Regime={}, liquidity gate {} (threshold {:.2}%)",
        derivation.regime,
        if derivation.liquidity_gated { "applied" } else { "not applied" },
        engine.policy().liq_gate_threshold * 100.0,
    );

    tracing::info!(
        regime = %derivation.regime,
        trades = trade_deltas.len(),
        shortfall = %swap_plan.shortfall,
        "Prepared rebalance preview"
    );

    Ok(RebalancePreview {
        portfolio_value: portfolio_value(balances),
        current_allocation: current_weights(balances),
        suggested_allocation: derivation.weights,
        trade_deltas,
        swap_plan,
        regime: derivation.regime,
        liquidity_gated: derivation.liquidity_gated,
        rationale,
    })
}

fn to_decimal(x: f64) -> Decimal {
    Decimal::from_f64_retain(x).unwrap_or(Decimal::ZERO).round_dp(10)
}

/// Portfolio value in dollars
pub fn portfolio_value(balances: &Balances) -> Decimal {
    saturating_sum(balances.values().filter(|b| **b > Decimal::ZERO))
}

fn saturating_sum<'a>(values: impl Iterator<Item = &'a Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v))
}
