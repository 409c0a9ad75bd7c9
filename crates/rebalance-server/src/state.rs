//! Application State

use std::sync::Arc;

use agent_core::ToolRegistry;
use stable_rebalancer::{
    RebalanceSettings, Result as RebalanceResult, TargetWeightEngine,
    feed::{PriceFeed, StaticPriceFeed},
    notify::Summarizer,
    tools::{PegRiskTool, RebalancePreviewTool, SwapPlanTool, TargetWeightsTool},
};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Weight engine bound to the configured policy and universe
    pub engine: Arc<TargetWeightEngine>,

    /// Defaults for swap routing and slippage
    pub settings: Arc<RebalanceSettings>,

    /// Tool registry with all rebalancer tools
    pub tools: Arc<ToolRegistry>,

    /// Price source for peg scans
    pub feed: Arc<dyn PriceFeed>,

    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    /// Build state around the in-memory price feed
    pub fn new(config: &ServerConfig) -> RebalanceResult<Self> {
        let feed: Arc<dyn PriceFeed> = Arc::new(StaticPriceFeed::pegged(&config.universe));
        Self::with_feed(config, feed, Summarizer::local())
    }

    pub fn with_feed(
        config: &ServerConfig,
        feed: Arc<dyn PriceFeed>,
        summarizer: Summarizer,
    ) -> RebalanceResult<Self> {
        let engine = Arc::new(TargetWeightEngine::new(
            config.policy.clone(),
            config.universe.clone(),
        )?);

        let mut tools = ToolRegistry::new();
        tools.register(PegRiskTool::new(
            Arc::clone(&feed),
            config.universe.clone(),
            config.policy.clone(),
        ));
        tools.register(TargetWeightsTool::new(Arc::clone(&engine)));
        tools.register(SwapPlanTool::new(config.settings.clone()));
        tools.register(RebalancePreviewTool::new(
            Arc::clone(&engine),
            config.settings.clone(),
        ));

        Ok(Self {
            engine,
            settings: Arc::new(config.settings.clone()),
            tools: Arc::new(tools),
            feed,
            summarizer: Arc::new(summarizer),
        })
    }
}
