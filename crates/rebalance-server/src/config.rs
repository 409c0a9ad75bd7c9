//! Server Configuration
//!
//! Read from the environment (after `.env`). Unparseable values fall back
//! to defaults with a warning; an invalid policy aborts start-up.

use rust_decimal::Decimal;
use std::str::FromStr;

use stable_rebalancer::{Policy, RebalanceSettings, Symbol, Universe};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub universe: Universe,
    pub policy: Policy,
    pub settings: RebalanceSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            universe: Universe::stablecoins(),
            policy: Policy::default(),
            settings: RebalanceSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let universe = match get("REBALANCE_COINS") {
            Some(list) => Universe::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Invalid REBALANCE_COINS, using default basket");
                    defaults.universe.clone()
                }),
            None => defaults.universe.clone(),
        };

        let d = &defaults.policy;
        let policy = Policy {
            weight_min: parse_or(&get, "WEIGHT_MIN", d.weight_min),
            weight_max: parse_or(&get, "WEIGHT_MAX", d.weight_max),
            liq_gate_threshold: parse_or(&get, "LIQ_GATE_THRESHOLD", d.liq_gate_threshold),
            thr_yellow: parse_or(&get, "THR_YELLOW", d.thr_yellow),
            thr_red: parse_or(&get, "THR_RED", d.thr_red),
            sentiment_weight: parse_or(&get, "SENTIMENT_WEIGHT", d.sentiment_weight),
            default_risk: parse_or(&get, "DEFAULT_RISK", d.default_risk),
        };
        policy
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid rebalancing policy: {e}"))?;

        let s = &defaults.settings;
        let settings = RebalanceSettings {
            base: get("BASE_ASSET").map_or_else(|| s.base.clone(), Symbol::from),
            wallet_base_available: Decimal::ZERO,
            tolerance: parse_or(&get, "DELTA_TOLERANCE", s.tolerance),
            min_trade_fraction: parse_or(&get, "MIN_TRADE_FRACTION", s.min_trade_fraction),
            slippage_bps: parse_or(&get, "SLIPPAGE_BPS", s.slippage_bps),
        };
        if !universe.contains(settings.base.as_str()) {
            anyhow::bail!("base asset {} is not in the rebalancing universe", settings.base);
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            universe,
            policy,
            settings,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Unparseable setting, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.universe.len(), 10);
        assert_eq!(cfg.policy, Policy::default());
        assert_eq!(cfg.settings.base.as_str(), "USDC");
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("REBALANCE_COINS", "usdc, dai ,usdt"),
            ("BASE_ASSET", "dai"),
            ("WEIGHT_MAX", "0.6"),
            ("DELTA_TOLERANCE", "2.5"),
            ("SLIPPAGE_BPS", "50"),
        ])
        .unwrap();
        assert_eq!(cfg.universe.len(), 3);
        assert_eq!(cfg.settings.base.as_str(), "DAI");
        assert!((cfg.policy.weight_max - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.settings.tolerance, dec!(2.5));
        assert_eq!(cfg.settings.slippage_bps, 50);
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        let cfg = config(&[("THR_RED", "very"), ("SLIPPAGE_BPS", "-3")]).unwrap();
        assert!((cfg.policy.thr_red - 0.60).abs() < f64::EPSILON);
        assert_eq!(cfg.settings.slippage_bps, 30);
    }

    #[test]
    fn test_invalid_policy_aborts() {
        assert!(config(&[("WEIGHT_MIN", "0.7"), ("WEIGHT_MAX", "0.2")]).is_err());
    }

    #[test]
    fn test_base_outside_universe_aborts() {
        assert!(config(&[("REBALANCE_COINS", "DAI,USDT")]).is_err());
    }
}
