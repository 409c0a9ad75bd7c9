//! Target-Weight Engine
//!
//! Converts per-asset risk into portfolio weights: inverse-risk tilt,
//! optional liquidity gate toward uniform, then clamp and renormalize.
//!
//! ```text
//! risks ─▶ fill missing ─▶ 1/max(r, ε) ─▶ normalize ─▶ [gate] ─▶ clamp ─▶ renormalize
//!                 │
//!                 └──────▶ max ─▶ regime
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, Result};
use crate::model::{Policy, Regime, RiskScores, TargetWeights, Universe};

/// Floor applied to risk before inverting
const RISK_EPSILON: f64 = 1e-6;

/// Output of one weight derivation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightDerivation {
    /// Final weights, summing to 1
    pub weights: TargetWeights,

    pub regime: Regime,

    /// Whether the liquidity gate pulled weights toward uniform
    pub liquidity_gated: bool,

    /// Clamped weights before the final renormalization
    #[serde(skip)]
    pub clamped: TargetWeights,
}

/// Risk-weighted allocator over a fixed universe
#[derive(Clone, Debug)]
pub struct TargetWeightEngine {
    policy: Policy,
    universe: Universe,
}

impl TargetWeightEngine {
    pub fn new(policy: Policy, universe: Universe) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy, universe })
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    pub const fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Derive target weights and regime from per-asset risk.
    ///
    /// Assets of the universe without a score get `policy.default_risk`.
    /// Empty `risks` yields uniform weights and `Regime::Green`.
    pub fn derive_weights(
        &self,
        risks: &RiskScores,
        liquidity_quote: Option<f64>,
    ) -> Result<WeightDerivation> {
        self.validate_inputs(risks, liquidity_quote)?;

        let n = self.universe.len();
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / n as f64;

        let filled: RiskScores = if risks.is_empty() {
            self.universe.symbols().iter().map(|s| (s.clone(), 0.0)).collect()
        } else {
            self.universe
                .symbols()
                .iter()
                .map(|s| (s.clone(), risks.get(s).copied().unwrap_or(self.policy.default_risk)))
                .collect()
        };

        let inverse: Vec<f64> = filled.values().map(|r| 1.0 / r.max(RISK_EPSILON)).collect();
        let inverse_total: f64 = inverse.iter().sum();
        let mut base: Vec<f64> = inverse.iter().map(|v| v / inverse_total).collect();

        let liquidity_gated = liquidity_quote
            .is_some_and(|q| (1.0 - q).abs() > self.policy.liq_gate_threshold);
        if liquidity_gated {
            for w in &mut base {
                *w = 0.5f64.mul_add(*w, 0.5 * uniform);
            }
        }

        let clamped: Vec<f64> = base
            .iter()
            .map(|w| w.clamp(self.policy.weight_min, self.policy.weight_max))
            .collect();
        let clamped_total: f64 = clamped.iter().sum();

        let symbols = filled.keys();
        let weights: TargetWeights = symbols
            .clone()
            .zip(&clamped)
            .map(|(s, w)| (s.clone(), w / clamped_total))
            .collect();
        let clamped: TargetWeights = symbols.cloned().zip(clamped).collect();

        let regime = detect_regime(&filled, &self.policy);

        tracing::debug!(
            assets = n,
            %regime,
            liquidity_gated,
            "Derived target weights"
        );

        Ok(WeightDerivation {
            weights,
            regime,
            liquidity_gated,
            clamped,
        })
    }

    fn validate_inputs(&self, risks: &RiskScores, liquidity_quote: Option<f64>) -> Result<()> {
        for (symbol, &value) in risks {
            if !self.universe.contains(symbol.as_str()) {
                return Err(RebalanceError::UnknownAsset(symbol.to_string()));
            }
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RebalanceError::InvalidRisk {
                    symbol: symbol.to_string(),
                    value,
                });
            }
        }
        if let Some(q) = liquidity_quote {
            if !q.is_finite() {
                return Err(RebalanceError::InvalidInput(format!(
                    "liquidity quote must be finite, got {q}"
                )));
            }
        }
        Ok(())
    }
}

/// Regime of the single worst asset
pub fn detect_regime(risks: &RiskScores, policy: &Policy) -> Regime {
    let worst = risks.values().copied().fold(0.0_f64, f64::max);
    if worst >= policy.thr_red {
        Regime::Red
    } else if worst >= policy.thr_yellow {
        Regime::Yellow
    } else {
        Regime::Green
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Symbol;

    fn engine(symbols: &[&str]) -> TargetWeightEngine {
        TargetWeightEngine::new(Policy::default(), Universe::new(symbols.iter().copied()).unwrap())
            .unwrap()
    }

    fn risks(pairs: &[(&str, f64)]) -> RiskScores {
        pairs.iter().map(|(s, r)| (Symbol::from(*s), *r)).collect()
    }

    fn sum(weights: &TargetWeights) -> f64 {
        weights.values().sum()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let engine = TargetWeightEngine::new(Policy::default(), Universe::stablecoins()).unwrap();
        let cases = [
            risks(&[("USDC", 0.01), ("USDT", 0.9), ("DAI", 0.3)]),
            risks(&[("USDC", 0.0), ("USDT", 0.0)]),
            risks(&[("GUSD", 1.0)]),
            RiskScores::new(),
        ];
        for case in &cases {
            for quote in [None, Some(1.0), Some(0.98)] {
                let out = engine.derive_weights(case, quote).unwrap();
                assert!((sum(&out.weights) - 1.0).abs() < 1e-6);
                assert_eq!(out.weights.len(), 10);
            }
        }
    }

    #[test]
    fn test_clamped_weights_within_bounds() {
        let engine = engine(&["A", "B", "C", "D"]);
        let out = engine
            .derive_weights(&risks(&[("A", 0.001), ("B", 0.5), ("C", 0.9), ("D", 0.95)]), None)
            .unwrap();
        for w in out.clamped.values() {
            assert!((0.05..=0.50).contains(w), "clamped weight {w} out of bounds");
        }
        assert!((sum(&out.weights) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_risk_gives_uniform_weights() {
        let engine = engine(&["A", "B", "C", "D", "E"]);
        let out = engine
            .derive_weights(
                &risks(&[("A", 0.4), ("B", 0.4), ("C", 0.4), ("D", 0.4), ("E", 0.4)]),
                None,
            )
            .unwrap();
        for w in out.weights.values() {
            assert!((w - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_all_zero_risk_is_uniform() {
        let engine = engine(&["A", "B", "C", "D"]);
        let out = engine
            .derive_weights(&risks(&[("A", 0.0), ("B", 0.0), ("C", 0.0), ("D", 0.0)]), None)
            .unwrap();
        for w in out.weights.values() {
            assert!((w - 0.25).abs() < 1e-9);
        }
        assert_eq!(out.regime, Regime::Green);
    }

    #[test]
    fn test_empty_risks_uniform_and_green() {
        let engine = TargetWeightEngine::new(Policy::default(), Universe::stablecoins()).unwrap();
        let out = engine.derive_weights(&RiskScores::new(), None).unwrap();
        assert_eq!(out.regime, Regime::Green);
        for w in out.weights.values() {
            assert!((w - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_regime_follows_worst_asset() {
        let engine = engine(&["A", "B"]);
        let regime = |a: f64| {
            engine
                .derive_weights(&risks(&[("A", a), ("B", 0.10)]), None)
                .unwrap()
                .regime
        };
        assert_eq!(regime(0.70), Regime::Red);
        assert_eq!(regime(0.40), Regime::Yellow);
        assert_eq!(regime(0.20), Regime::Green);
        assert_eq!(regime(0.60), Regime::Red);
        assert_eq!(regime(0.35), Regime::Yellow);
    }

    #[test]
    fn test_missing_risk_uses_default() {
        let engine = engine(&["A", "B"]);
        let partial = engine.derive_weights(&risks(&[("A", 0.1)]), None).unwrap();
        let explicit = engine.derive_weights(&risks(&[("A", 0.1), ("B", 0.4)]), None).unwrap();
        assert_eq!(partial.weights, explicit.weights);
        assert_eq!(partial.regime, Regime::Yellow);
    }

    #[test]
    fn test_liquidity_gate_pulls_toward_uniform() {
        let engine = engine(&["A", "B", "C", "D"]);
        let skewed = risks(&[("A", 0.05), ("B", 0.2), ("C", 0.3), ("D", 0.6)]);
        let ungated = engine.derive_weights(&skewed, None).unwrap();
        let gated = engine.derive_weights(&skewed, Some(1.01)).unwrap();

        assert!(!ungated.liquidity_gated);
        assert!(gated.liquidity_gated);
        for (symbol, w) in &gated.weights {
            let before = (ungated.weights[symbol] - 0.25).abs();
            let after = (w - 0.25).abs();
            assert!(after < before, "{symbol}: {after} not closer than {before}");
        }
    }

    #[test]
    fn test_quote_within_threshold_does_not_gate() {
        let engine = engine(&["A", "B"]);
        let r = risks(&[("A", 0.1), ("B", 0.3)]);
        let plain = engine.derive_weights(&r, None).unwrap();
        let quoted = engine.derive_weights(&r, Some(0.998)).unwrap();
        assert!(!quoted.liquidity_gated);
        assert_eq!(plain.weights, quoted.weights);
    }

    #[test]
    fn test_safer_asset_gets_more_weight() {
        let engine = engine(&["A", "B", "C"]);
        let out = engine
            .derive_weights(&risks(&[("A", 0.1), ("B", 0.2), ("C", 0.3)]), None)
            .unwrap();
        assert!(out.weights["A"] > out.weights["B"]);
        assert!(out.weights["B"] > out.weights["C"]);
    }

    #[test]
    fn test_deterministic() {
        let engine = TargetWeightEngine::new(Policy::default(), Universe::stablecoins()).unwrap();
        let r = risks(&[("USDC", 0.12), ("DAI", 0.33), ("USDD", 0.71)]);
        let a = engine.derive_weights(&r, Some(1.004)).unwrap();
        let b = engine.derive_weights(&r, Some(1.004)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let engine = engine(&["A", "B"]);
        assert!(matches!(
            engine.derive_weights(&risks(&[("A", 1.2)]), None),
            Err(RebalanceError::InvalidRisk { .. })
        ));
        assert!(matches!(
            engine.derive_weights(&risks(&[("A", f64::NAN)]), None),
            Err(RebalanceError::InvalidRisk { .. })
        ));
        assert!(matches!(
            engine.derive_weights(&risks(&[("Z", 0.1)]), None),
            Err(RebalanceError::UnknownAsset(_))
        ));
        assert!(engine.derive_weights(&risks(&[("A", 0.1)]), Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_invalid_policy_rejected_at_construction() {
        let policy = Policy { weight_min: 0.9, weight_max: 0.1, ..Policy::default() };
        assert!(TargetWeightEngine::new(policy, Universe::stablecoins()).is_err());
    }
}
