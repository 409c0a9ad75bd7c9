//! Swap-Plan Builder
//!
//! Turns signed dollar deltas into base-routed legs: every non-base asset
//! is first sold into the base asset, then bought back out of it.
//!
//! ```text
//!   USDT ─┐                ┌─▶ FDUSD
//!   DAI  ─┼─▶  base pool ──┼─▶ BUSD
//!         │   (USDC)       └─▶ TUSD
//!  wallet ┘
//! ```
//!
//! Infeasible requests never fail. Oversells are clamped, buys are scaled
//! down on shortfall, and every degradation lands in `SwapPlan::warnings`.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::{RebalanceError, Result};
use crate::model::{Balances, BaseFunding, SwapLeg, SwapPlan, Symbol, TradeDeltas};

/// Default tolerance on `sum(deltas)` before warning, in dollars
pub const DEFAULT_TOLERANCE: Decimal = dec!(1);

/// Largest magnitude accepted for a balance, delta or wallet amount (1e18 dollars)
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000000);

/// Round to cents
pub fn round2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn floor2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Build an ordered, base-routed swap plan.
///
/// Legs are ordered by symbol. `wallet_base_available` is base liquidity
/// held outside `balances[base]`.
pub fn build_swap_plan(
    balances: &Balances,
    deltas: &TradeDeltas,
    base: &Symbol,
    wallet_base_available: Decimal,
    tolerance: Decimal,
) -> Result<SwapPlan> {
    validate(balances, deltas, wallet_base_available, tolerance)?;

    let mut warnings = Vec::new();

    let total_delta: Decimal = deltas.values().sum();
    if total_delta.abs() > tolerance {
        warn(
            &mut warnings,
            format!(
                "Sum of deltas = {:.2} exceeds tolerance {tolerance}; plan proceeds with deltas as given",
                round2(total_delta)
            ),
        );
    }

    // Partition non-base assets
    let mut sells_to_base = Vec::new();
    let mut buy_requests: Vec<(&Symbol, Decimal)> = Vec::new();
    for (symbol, &delta) in deltas {
        if symbol == base {
            continue;
        }
        let amount = round2(delta.abs());
        if amount.is_zero() {
            continue;
        }
        if delta.is_sign_positive() {
            buy_requests.push((symbol, amount));
            continue;
        }

        let available = balances.get(symbol).copied().unwrap_or(Decimal::ZERO);
        let amount = if amount > available {
            warn(
                &mut warnings,
                format!(
                    "Requested SELL of {amount:.2} {symbol} exceeds balance {available:.2}; selling available balance"
                ),
            );
            floor2(available)
        } else {
            amount
        };
        if amount > Decimal::ZERO {
            sells_to_base.push(SwapLeg::sell(symbol.clone(), base.clone(), amount));
        }
    }

    // Pool accounting
    let base_balance_start = balances.get(base).copied().unwrap_or(Decimal::ZERO);
    let from_sells: Decimal = sells_to_base.iter().map(|l| l.amount).sum();
    let base_pool_start = round2(base_balance_start + wallet_base_available + from_sells);

    let base_needed_for_buys: Decimal = buy_requests.iter().map(|(_, a)| *a).sum();
    let base_delta_target = round2(deltas.get(base).copied().unwrap_or(Decimal::ZERO));
    let reserve = base_delta_target.max(Decimal::ZERO);

    let shortfall = round2((base_needed_for_buys + reserve - base_pool_start).max(Decimal::ZERO));
    let scale = if shortfall > Decimal::ZERO {
        warn(
            &mut warnings,
            format!("Base shortfall of {shortfall:.2} {base} to execute all buys plus base target"),
        );
        let spendable = (base_pool_start - reserve).max(Decimal::ZERO);
        if base_needed_for_buys.is_zero() {
            Decimal::ZERO
        } else {
            (spendable / base_needed_for_buys).min(Decimal::ONE)
        }
    } else {
        Decimal::ONE
    };

    // Buys share the pool proportionally; truncation keeps the plan from overspending
    let mut buys_from_base: Vec<SwapLeg> = buy_requests
        .into_iter()
        .map(|(symbol, amount)| {
            let amount = if scale == Decimal::ONE { amount } else { floor2(amount * scale) };
            SwapLeg::buy(base.clone(), symbol.clone(), amount)
        })
        .filter(|leg| leg.amount > Decimal::ZERO)
        .collect();

    let total_buys: Decimal = buys_from_base.iter().map(|l| l.amount).sum();
    let mut base_pool_end = base_pool_start - total_buys;

    if base_delta_target > Decimal::ZERO {
        if base_delta_target > base_pool_end {
            warn(
                &mut warnings,
                format!(
                    "Reserving base target {base_delta_target:.2} {base} exceeds remaining pool {base_pool_end:.2}"
                ),
            );
        }
        base_pool_end -= base_delta_target.min(base_pool_end.max(Decimal::ZERO));
    } else if base_delta_target < Decimal::ZERO {
        // Buys funded beyond sell proceeds already draw base down
        let release = base_delta_target.abs();
        let drawn = (total_buys - from_sells).max(Decimal::ZERO);
        let extra = round2(
            (release - drawn)
                .max(Decimal::ZERO)
                .min(base_pool_end.max(Decimal::ZERO)),
        );

        if extra > Decimal::ZERO {
            if buys_from_base.is_empty() || total_buys.is_zero() {
                warn(
                    &mut warnings,
                    format!(
                        "Base is to be reduced by {extra:.2} {base} but no BUY legs exist; leftover base left unspent"
                    ),
                );
            } else {
                let mut added = Decimal::ZERO;
                for leg in &mut buys_from_base {
                    let share = extra
                        .checked_mul(leg.amount)
                        .map_or_else(|| extra * (leg.amount / total_buys), |p| p / total_buys);
                    let add = floor2(share);
                    leg.amount += add;
                    added += add;
                }
                // Cents lost to truncation go to the largest leg
                let remainder = extra - added;
                if let Some(largest) = buys_from_base.iter_mut().max_by_key(|l| l.amount) {
                    largest.amount += remainder;
                }
                base_pool_end -= extra;
            }
        }
    }

    let plan = SwapPlan {
        base: base.clone(),
        sells_to_base,
        buys_from_base,
        base_funding: BaseFunding {
            base_balance_start: round2(base_balance_start),
            wallet_base_available: round2(wallet_base_available),
            from_sells: round2(from_sells),
            base_release: (-base_delta_target).max(Decimal::ZERO),
        },
        base_pool_start,
        base_needed_for_buys: round2(base_needed_for_buys),
        base_delta_target,
        base_pool_end: round2(base_pool_end),
        shortfall,
        warnings,
    };

    tracing::debug!(
        base = %plan.base,
        sells = plan.sells_to_base.len(),
        buys = plan.buys_from_base.len(),
        pool_start = %plan.base_pool_start,
        pool_end = %plan.base_pool_end,
        shortfall = %plan.shortfall,
        "Built swap plan"
    );

    Ok(plan)
}

/// Fill `min_receive` on every leg from a slippage allowance in basis points
pub fn apply_slippage(plan: &mut SwapPlan, slippage_bps: u32) -> Result<()> {
    if slippage_bps > 10_000 {
        return Err(RebalanceError::InvalidInput(format!(
            "slippage must be at most 10000 bps, got {slippage_bps}"
        )));
    }
    let keep = Decimal::ONE - Decimal::from(slippage_bps) / dec!(10000);
    for leg in plan.sells_to_base.iter_mut().chain(plan.buys_from_base.iter_mut()) {
        leg.min_receive = Some(round2(leg.amount * keep));
    }
    Ok(())
}

fn validate(
    balances: &Balances,
    deltas: &TradeDeltas,
    wallet_base_available: Decimal,
    tolerance: Decimal,
) -> Result<()> {
    if let Some((symbol, amount)) = balances.iter().find(|(_, a)| **a < Decimal::ZERO) {
        return Err(RebalanceError::InvalidBalance {
            symbol: symbol.to_string(),
            amount: *amount,
        });
    }
    for (symbol, amount) in balances {
        check_amount("balance", symbol.as_str(), *amount)?;
    }
    for (symbol, delta) in deltas {
        check_amount("delta", symbol.as_str(), *delta)?;
    }
    if wallet_base_available < Decimal::ZERO {
        return Err(RebalanceError::InvalidInput(format!(
            "wallet_base_available must be >= 0, got {wallet_base_available}"
        )));
    }
    check_amount("wallet_base_available", "base", wallet_base_available)?;
    if tolerance < Decimal::ZERO {
        return Err(RebalanceError::InvalidInput(format!(
            "tolerance must be >= 0, got {tolerance}"
        )));
    }
    Ok(())
}

/// Reject amounts whose sums and products could overflow `Decimal`
pub(crate) fn check_amount(field: &str, symbol: &str, amount: Decimal) -> Result<()> {
    if amount.abs() > MAX_AMOUNT {
        return Err(RebalanceError::InvalidInput(format!(
            "{field} for {symbol} exceeds {MAX_AMOUNT}, got {amount}"
        )));
    }
    Ok(())
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}
