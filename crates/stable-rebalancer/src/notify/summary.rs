//! Rebalance Summaries
//!
//! Short natural-language explanation of a preview. An `LlmProvider` writes
//! it when one is configured and answers in time; otherwise a local
//! formatter does.

use agent_core::{GenerationOptions, LlmProvider, Message};
use rust_decimal::Decimal;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::strategy::RebalancePreview;

/// System prompt for the summary writer
pub const SUMMARY_PROMPT: &str = r"You explain stablecoin rebalancing proposals to non-expert users.

You receive a JSON object with the current and suggested allocation, the
trade deltas, the swap plan routed through a base asset, the risk regime
(GREEN, YELLOW or RED) and a rationale.

Write at most four sentences:
- state the regime and what drives it
- name the largest sells and buys
- mention any shortfall or warning
Do not invent numbers that are not in the input. Do not give financial advice.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes summaries, preferring the text-generation provider when present
pub struct Summarizer {
    provider: Option<Arc<dyn LlmProvider>>,
    options: GenerationOptions,
    timeout: Duration,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::local()
    }
}

impl Summarizer {
    /// Deterministic summaries only
    pub fn local() -> Self {
        Self {
            provider: None,
            options: GenerationOptions::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::local()
        }
    }

    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Summarize a preview; never fails
    pub async fn summarize(&self, preview: &RebalancePreview) -> String {
        let Some(provider) = &self.provider else {
            return fallback_summary(preview);
        };

        let context = match serde_json::to_string(preview) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize preview for summary");
                return fallback_summary(preview);
            }
        };
        let messages = [Message::system(SUMMARY_PROMPT), Message::user(context)];

        let reply = tokio::time::timeout(self.timeout, provider.complete(&messages, &self.options));
        match reply.await {
            Ok(Ok(completion)) if !completion.content.trim().is_empty() => {
                completion.content.trim().to_string()
            }
            Ok(Ok(_)) => {
                tracing::warn!(provider = provider.name(), "Empty summary, using local formatter");
                fallback_summary(preview)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    "Summary failed, using local formatter"
                );
                fallback_summary(preview)
            }
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    timeout_ms = self.timeout.as_millis(),
                    "Summary timed out, using local formatter"
                );
                fallback_summary(preview)
            }
        }
    }
}

/// Deterministic plain-text summary
pub fn fallback_summary(preview: &RebalancePreview) -> String {
    let plan = &preview.swap_plan;
    let mut s = format!(
        "{}. Portfolio value {}.",
        preview.rationale, preview.portfolio_value
    );

    if plan.is_empty() {
        s.push_str(" Portfolio is on target; no swaps needed.");
        return s;
    }

    let _ = write!(
        s,
        " Sell {} into {} across {} leg(s), buy {} across {} leg(s).",
        plan.total_sold(),
        plan.base,
        plan.sells_to_base.len(),
        plan.total_bought(),
        plan.buys_from_base.len(),
    );

    let sells = plan.sells_to_base.iter().max_by_key(|l| l.amount);
    let buys = plan.buys_from_base.iter().max_by_key(|l| l.amount);
    if let (Some(sell), Some(buy)) = (sells, buys) {
        let _ = write!(
            s,
            " Largest moves: {} out of {}, {} into {}.",
            sell.amount, sell.src, buy.amount, buy.dst
        );
    }

    if plan.shortfall > Decimal::ZERO {
        let _ = write!(s, " Shortfall of {} {}.", plan.shortfall, plan.base);
    }
    if !plan.warnings.is_empty() {
        let _ = write!(s, " {} warning(s) raised.", plan.warnings.len());
    }
    s
}
