//! Notifications
//!
//! Renders plans and allocations as chat-ready HTML text. Delivery is
//! left to the caller.

mod summary;

pub use summary::{SUMMARY_PROMPT, Summarizer, fallback_summary};

use std::fmt::Write;

use crate::model::{Regime, SwapLeg, SwapPlan, TargetWeights};

/// Alert when the regime reaches the user's threshold
pub fn should_alert(regime: Regime, threshold: Regime) -> bool {
    regime >= threshold
}

fn legs(out: &mut String, legs: &[SwapLeg]) {
    if legs.is_empty() {
        out.push_str("• (none)\n");
        return;
    }
    for leg in legs {
        let _ = writeln!(out, "• {} → {}: {}", leg.src, leg.dst, leg.amount);
    }
}

/// Rebalance alert listing every leg of the plan
pub fn format_rebalance_alert(plan: &SwapPlan, rationale: Option<&str>) -> String {
    let mut s = String::new();
    s.push_str("🚨 <b>Rebalance Alert</b>\n");
    let _ = writeln!(s, "<b>Routing base:</b> {}", plan.base);

    s.push_str("\n<b>Sells (to base):</b>\n");
    legs(&mut s, &plan.sells_to_base);
    s.push_str("\n<b>Buys (from base):</b>\n");
    legs(&mut s, &plan.buys_from_base);

    let _ = writeln!(s, "\n<b>Base pool end:</b> {}", plan.base_pool_end);
    let _ = write!(s, "<b>Shortfall:</b> {}", plan.shortfall);

    if let Some(rationale) = rationale.filter(|r| !r.is_empty()) {
        let _ = write!(s, "\n\n<b>Rationale:</b> {rationale}");
    }
    s
}

/// Side-by-side view of current and suggested allocation
pub fn format_daily_summary(current: &TargetWeights, suggested: &TargetWeights) -> String {
    let mut s = String::from("📊 <b>Daily Summary</b>\n\n<b>Current Allocation</b>\n");
    for (symbol, w) in current {
        let _ = writeln!(s, "• {symbol}: {:.2}%", w * 100.0);
    }
    s.push_str("\n<b>Suggested Allocation</b>");
    for (symbol, w) in suggested {
        let _ = write!(s, "\n• {symbol}: {:.2}%", w * 100.0);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseFunding, Symbol};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn plan(sells: Vec<SwapLeg>, buys: Vec<SwapLeg>) -> SwapPlan {
        SwapPlan {
            base: Symbol::from("USDC"),
            sells_to_base: sells,
            buys_from_base: buys,
            base_funding: BaseFunding::default(),
            base_pool_start: dec!(100),
            base_needed_for_buys: dec!(25),
            base_delta_target: Decimal::ZERO,
            base_pool_end: dec!(75),
            shortfall: Decimal::ZERO,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_should_alert_threshold() {
        assert!(should_alert(Regime::Red, Regime::Red));
        assert!(should_alert(Regime::Red, Regime::Yellow));
        assert!(!should_alert(Regime::Yellow, Regime::Red));
        assert!(should_alert(Regime::Green, Regime::Green));
    }

    #[test]
    fn test_rebalance_alert_lists_legs() {
        let usdc = Symbol::from("USDC");
        let buy = SwapLeg::buy(usdc, Symbol::from("DAI"), dec!(25));
        let text = format_rebalance_alert(&plan(vec![], vec![buy]), Some("Regime=RED"));

        assert!(text.starts_with("🚨 <b>Rebalance Alert</b>"));
        assert!(text.contains("<b>Sells (to base):</b>\n• (none)"));
        assert!(text.contains("• USDC → DAI: 25"));
        assert!(text.contains("<b>Base pool end:</b> 75"));
        assert!(text.ends_with("<b>Rationale:</b> Regime=RED"));
    }

    #[test]
    fn test_alert_without_rationale() {
        let text = format_rebalance_alert(&plan(vec![], vec![]), None);
        assert!(text.ends_with("<b>Shortfall:</b> 0"));
    }

    #[test]
    fn test_daily_summary_percentages() {
        let current: TargetWeights =
            [(Symbol::from("USDC"), 0.75), (Symbol::from("DAI"), 0.25)].into();
        let suggested: TargetWeights =
            [(Symbol::from("USDC"), 0.5), (Symbol::from("DAI"), 0.5)].into();
        let text = format_daily_summary(&current, &suggested);

        assert!(text.contains("<b>Current Allocation</b>\n• DAI: 25.00%\n• USDC: 75.00%"));
        assert!(text.ends_with("• DAI: 50.00%\n• USDC: 50.00%"));
    }
}
