//! Domain Models
//!
//! Typed records passed into and out of the rebalancing pipeline.
//! Dollar amounts use `rust_decimal`; risk scores and weights are
//! dimensionless `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{RebalanceError, Result};

/// Asset ticker, always upper-case (e.g. "USDC")
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-asset risk in [0, 1]; 0 = no risk
pub type RiskScores = BTreeMap<Symbol, f64>;

/// Per-asset portfolio weight; values sum to 1
pub type TargetWeights = BTreeMap<Symbol, f64>;

/// Per-asset holdings in dollars (stablecoins, ≈ $1 per unit)
pub type Balances = BTreeMap<Symbol, Decimal>;

/// Per-asset signed dollar change; positive = buy, negative = sell
pub type TradeDeltas = BTreeMap<Symbol, Decimal>;

/// The fixed set of assets a computation covers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct Universe(Vec<Symbol>);

/// Ten-stablecoin basket of the reference deployment
pub const STABLECOINS: [&str; 10] = [
    "USDC", "USDT", "DAI", "FDUSD", "BUSD", "TUSD", "USDP", "PYUSD", "USDD", "GUSD",
];

impl Universe {
    /// Build a universe; duplicates are dropped, order is preserved
    pub fn new<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let mut out: Vec<Symbol> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.into();
            if symbol.as_str().is_empty() {
                return Err(RebalanceError::Config("empty asset symbol".into()));
            }
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        if out.is_empty() {
            return Err(RebalanceError::Config("asset universe is empty".into()));
        }
        Ok(Self(out))
    }

    pub fn stablecoins() -> Self {
        Self(STABLECOINS.iter().copied().map(Symbol::from).collect())
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.iter().any(|s| s.as_str() == symbol)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::stablecoins()
    }
}

impl TryFrom<Vec<Symbol>> for Universe {
    type Error = RebalanceError;

    fn try_from(symbols: Vec<Symbol>) -> Result<Self> {
        Self::new(symbols)
    }
}

impl From<Universe> for Vec<Symbol> {
    fn from(u: Universe) -> Self {
        u.0
    }
}

/// Static policy knobs for one computation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Lower clamp for any single weight
    pub weight_min: f64,

    /// Upper clamp for any single weight
    pub weight_max: f64,

    /// Fractional deviation of the liquidity quote from par that triggers dampening
    pub liq_gate_threshold: f64,

    /// Worst-risk level at which the regime turns YELLOW
    pub thr_yellow: f64,

    /// Worst-risk level at which the regime turns RED
    pub thr_red: f64,

    /// Share of sentiment risk when blending with peg risk
    pub sentiment_weight: f64,

    /// Risk assumed for assets with no score
    pub default_risk: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            weight_min: 0.05,
            weight_max: 0.50,
            liq_gate_threshold: 0.003,
            thr_yellow: 0.35,
            thr_red: 0.60,
            sentiment_weight: 0.30,
            default_risk: 0.40,
        }
    }
}

impl Policy {
    /// Check the policy invariants
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("weight_min", self.weight_min),
            ("weight_max", self.weight_max),
            ("liq_gate_threshold", self.liq_gate_threshold),
            ("thr_yellow", self.thr_yellow),
            ("thr_red", self.thr_red),
            ("sentiment_weight", self.sentiment_weight),
            ("default_risk", self.default_risk),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RebalanceError::InvalidPolicy(format!("{name} must be finite")));
        }

        if !(0.0..=1.0).contains(&self.weight_min)
            || !(0.0..=1.0).contains(&self.weight_max)
            || self.weight_min > self.weight_max
        {
            return Err(RebalanceError::InvalidPolicy(format!(
                "need 0 <= weight_min ({}) <= weight_max ({}) <= 1",
                self.weight_min, self.weight_max
            )));
        }
        if self.weight_max <= 0.0 {
            return Err(RebalanceError::InvalidPolicy("weight_max must be positive".into()));
        }
        if self.thr_yellow > self.thr_red {
            return Err(RebalanceError::InvalidPolicy(format!(
                "thr_yellow ({}) exceeds thr_red ({})",
                self.thr_yellow, self.thr_red
            )));
        }
        if self.liq_gate_threshold < 0.0 {
            return Err(RebalanceError::InvalidPolicy("liq_gate_threshold must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.sentiment_weight) {
            return Err(RebalanceError::InvalidPolicy(
                "sentiment_weight must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.default_risk) {
            return Err(RebalanceError::InvalidPolicy("default_risk must be within [0, 1]".into()));
        }
        Ok(())
    }
}

/// Coarse alert level; ordered GREEN < YELLOW < RED
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Green,
    Yellow,
    Red,
}

impl Regime {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GREEN" => Ok(Self::Green),
            "YELLOW" => Ok(Self::Yellow),
            "RED" => Ok(Self::Red),
            other => Err(RebalanceError::InvalidInput(format!(
                "regime must be RED|YELLOW|GREEN, got '{other}'"
            ))),
        }
    }
}

/// Direction of a swap leg relative to the base asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwapIntent {
    Sell,
    Buy,
}

/// One base-routed swap instruction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapLeg {
    pub src: Symbol,
    pub dst: Symbol,
    pub amount: Decimal,
    pub intent: SwapIntent,

    /// Minimum acceptable output after slippage, filled by `apply_slippage`
    #[serde(default)]
    pub min_receive: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SwapLeg {
    pub fn sell(src: Symbol, base: Symbol, amount: Decimal) -> Self {
        Self {
            src,
            dst: base,
            amount,
            intent: SwapIntent::Sell,
            min_receive: None,
            note: Some("fund base".into()),
        }
    }

    pub fn buy(base: Symbol, dst: Symbol, amount: Decimal) -> Self {
        Self {
            src: base,
            dst,
            amount,
            intent: SwapIntent::Buy,
            min_receive: None,
            note: None,
        }
    }
}

/// Where the base pool's liquidity comes from
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFunding {
    pub base_balance_start: Decimal,
    pub wallet_base_available: Decimal,
    pub from_sells: Decimal,

    /// Base holdings the plan intends to release (negative base delta)
    pub base_release: Decimal,
}

/// Ordered, base-routed rebalancing instructions plus pool accounting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub base: Symbol,
    pub sells_to_base: Vec<SwapLeg>,
    pub buys_from_base: Vec<SwapLeg>,
    pub base_funding: BaseFunding,
    pub base_pool_start: Decimal,
    pub base_needed_for_buys: Decimal,
    pub base_delta_target: Decimal,
    pub base_pool_end: Decimal,

    /// > 0 when the pool cannot fund all buys plus the base target
    pub shortfall: Decimal,
    pub warnings: Vec<String>,
}

impl SwapPlan {
    pub fn total_sold(&self) -> Decimal {
        self.sells_to_base.iter().map(|l| l.amount).sum()
    }

    pub fn total_bought(&self) -> Decimal {
        self.buys_from_base.iter().map(|l| l.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sells_to_base.is_empty() && self.buys_from_base.is_empty()
    }
}
