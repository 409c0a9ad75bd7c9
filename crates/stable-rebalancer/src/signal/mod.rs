//! Risk Signals
//!
//! Turns raw observations (peg deviation, sentiment) into the per-asset
//! risk scores the weight engine consumes.

mod peg;

pub use peg::{DEFAULT_WINDOW, PegStats, PegWindow, peg_risk};

use std::collections::BTreeMap;

use crate::error::{RebalanceError, Result};
use crate::model::{Policy, RiskScores, Symbol};

/// Sentiment in [-1, 1] to risk in [0, 1]; strong views either way count as risk
pub fn sentiment_risk(score: f64) -> f64 {
    if score.is_finite() { score.abs().clamp(0.0, 1.0) } else { 0.0 }
}

/// Blend peg risk with sentiment risk using `policy.sentiment_weight`.
///
/// Assets without a peg risk are omitted; missing sentiment counts as neutral.
pub fn blend_risks(
    peg: &RiskScores,
    sentiment: &BTreeMap<Symbol, f64>,
    policy: &Policy,
) -> Result<RiskScores> {
    let w = policy.sentiment_weight;
    if !w.is_finite() || !(0.0..=1.0).contains(&w) {
        return Err(RebalanceError::InvalidPolicy(format!(
            "sentiment_weight must be within [0, 1], got {w}"
        )));
    }

    peg.iter()
        .map(|(symbol, &p)| {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(RebalanceError::InvalidRisk {
                    symbol: symbol.to_string(),
                    value: p,
                });
            }
            let s = sentiment.get(symbol).copied().map_or(0.0, sentiment_risk);
            let blended = (1.0 - w).mul_add(p, w * s);
            Ok((symbol.clone(), blended.clamp(0.0, 1.0)))
        })
        .collect()
}
