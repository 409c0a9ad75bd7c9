//! Peg Deviation Window
//!
//! Rolling price series per asset, scored against the $1 peg.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{RebalanceError, Result};

/// Samples kept per asset
pub const DEFAULT_WINDOW: usize = 8;

/// Spot deviation cap (200 bps)
const MAX_SPOT_DEV: f64 = 0.02;

/// Samples deviating more than 3 bps count toward persistence
const PERSIST_THRESHOLD: f64 = 0.0003;

/// Blended deviation that saturates the deviation term (100 bps)
const DEV_NORM: f64 = 0.01;

const W_DEVIATION: f64 = 0.5;
const W_PERSIST: f64 = 0.3;

/// Summary statistics of a window
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PegStats {
    /// |last − 1|, capped at 200 bps
    pub spot_dev: f64,

    /// |mean − 1|
    pub twap_dev: f64,

    /// Share of samples off peg by more than 3 bps
    pub persist: f64,
}

impl PegStats {
    pub fn risk(&self) -> f64 {
        peg_risk(self)
    }
}

/// Fixed-capacity rolling price series
#[derive(Clone, Debug)]
pub struct PegWindow {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl Default for PegWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl PegWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a price, evicting the oldest sample when full
    pub fn push(&mut self, price: f64) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(RebalanceError::InvalidInput(format!("invalid price sample {price}")));
        }
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> PegStats {
        let Some(&last) = self.prices.back() else {
            return PegStats::default();
        };
        let n = self.prices.len() as f64;
        let mean = self.prices.iter().sum::<f64>() / n;
        let off_peg = self.prices.iter().filter(|p| (*p - 1.0).abs() > PERSIST_THRESHOLD).count();

        PegStats {
            spot_dev: (last - 1.0).abs().min(MAX_SPOT_DEV),
            twap_dev: (mean - 1.0).abs(),
            persist: off_peg as f64 / n,
        }
    }

    pub fn risk(&self) -> f64 {
        self.stats().risk()
    }
}

/// Peg risk in [0, 0.8]: blended deviation term plus persistence term
pub fn peg_risk(stats: &PegStats) -> f64 {
    let blended = 0.5f64.mul_add(stats.spot_dev, 0.5 * stats.twap_dev);
    let deviation = (blended / DEV_NORM).clamp(0.0, 1.0);
    W_DEVIATION.mul_add(deviation, W_PERSIST * stats.persist.clamp(0.0, 1.0))
}
