//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use agent_core::{AgentError, ToolCall, ToolResult, ToolSchema};
use stable_rebalancer::{
    Balances, REBALANCER_PROMPT, RebalanceError, RebalancePreview, Regime, RiskScores, SwapPlan,
    Symbol, TradeDeltas, WeightDerivation, build_swap_plan,
    notify::{format_daily_summary, format_rebalance_alert, should_alert},
    preview_rebalance,
    signal::blend_risks,
    strategy::apply_slippage,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub assets: usize,
    pub base: String,
    pub feed: String,
    pub feed_healthy: bool,
    pub tools: usize,
    pub summarizer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Default, Deserialize)]
pub struct WeightsRequest {
    #[serde(default)]
    pub risks: RiskScores,
    #[serde(default)]
    pub sentiment: Option<BTreeMap<Symbol, f64>>,
    #[serde(default)]
    pub liquidity_quote: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SwapPlanRequest {
    pub balances: Balances,
    pub deltas: TradeDeltas,
    #[serde(default)]
    pub base: Option<Symbol>,
    #[serde(default)]
    pub wallet_base_available: Option<Decimal>,
    #[serde(default)]
    pub tolerance: Option<Decimal>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub balances: Balances,
    #[serde(default)]
    pub risks: RiskScores,
    #[serde(default)]
    pub sentiment: Option<BTreeMap<Symbol, f64>>,
    #[serde(default)]
    pub liquidity_quote: Option<f64>,
    #[serde(default)]
    pub wallet_base_available: Option<Decimal>,

    /// Lowest regime that should produce an alert
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: Regime,
}

const fn default_alert_threshold() -> Regime {
    Regime::Red
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub preview: RebalancePreview,
    pub summary: String,
    pub allocation_report: String,
    pub alert: Option<String>,
}

#[derive(Serialize)]
pub struct ToolsResponse {
    pub prompt: &'static str,
    pub tools: Vec<ToolSchema>,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn rebalance_error(e: &RebalanceError) -> ApiError {
    let (status, code) = match e {
        RebalanceError::InvalidPolicy(_) => (StatusCode::BAD_REQUEST, "INVALID_POLICY"),
        RebalanceError::InvalidRisk { .. } => (StatusCode::BAD_REQUEST, "INVALID_RISK"),
        RebalanceError::InvalidBalance { .. } => (StatusCode::BAD_REQUEST, "INVALID_BALANCE"),
        RebalanceError::UnknownAsset(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ASSET"),
        RebalanceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        RebalanceError::PriceUnavailable(_) | RebalanceError::Feed(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "FEED_ERROR")
        }
        RebalanceError::Config(_) | RebalanceError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "Request failed");
    } else {
        tracing::debug!(error = %e, "Rejected request");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: code.into(),
        }),
    )
}

fn agent_error(e: &AgentError) -> ApiError {
    let (status, code) = match e {
        AgentError::ToolNotFound(_) => (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND"),
        AgentError::ToolValidation(_) | AgentError::Json(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_ARGUMENTS")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "TOOL_ERROR"),
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "Tool execution error");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
            code: code.into(),
        }),
    )
}

fn blended(
    state: &AppState,
    risks: RiskScores,
    sentiment: Option<&BTreeMap<Symbol, f64>>,
) -> Result<RiskScores, ApiError> {
    match sentiment {
        Some(sentiment) => {
            blend_risks(&risks, sentiment, state.engine.policy()).map_err(|e| rebalance_error(&e))
        }
        None => Ok(risks),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        assets: state.engine.universe().len(),
        base: state.settings.base.to_string(),
        feed: state.feed.name().to_string(),
        feed_healthy: state.feed.health_check().await,
        tools: state.tools.len(),
        summarizer: state.summarizer.provider_name().map(str::to_string),
    })
}

/// Target weights and regime from risk scores
pub async fn derive_weights(
    State(state): State<AppState>,
    Json(payload): Json<WeightsRequest>,
) -> Result<Json<WeightDerivation>, ApiError> {
    let risks = blended(&state, payload.risks, payload.sentiment.as_ref())?;
    let derivation = state
        .engine
        .derive_weights(&risks, payload.liquidity_quote)
        .map_err(|e| rebalance_error(&e))?;
    Ok(Json(derivation))
}

/// Swap plan from balances and explicit deltas
pub async fn swap_plan(
    State(state): State<AppState>,
    Json(payload): Json<SwapPlanRequest>,
) -> Result<Json<SwapPlan>, ApiError> {
    let defaults = &state.settings;
    let base = payload.base.unwrap_or_else(|| defaults.base.clone());

    let mut plan = build_swap_plan(
        &payload.balances,
        &payload.deltas,
        &base,
        payload.wallet_base_available.unwrap_or(defaults.wallet_base_available),
        payload.tolerance.unwrap_or(defaults.tolerance),
    )
    .map_err(|e| rebalance_error(&e))?;
    apply_slippage(&mut plan, payload.slippage_bps.unwrap_or(defaults.slippage_bps))
        .map_err(|e| rebalance_error(&e))?;

    Ok(Json(plan))
}

/// Full rebalance preview with summary and alert text
pub async fn rebalance_preview(
    State(state): State<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let risks = blended(&state, payload.risks, payload.sentiment.as_ref())?;

    let mut settings = (*state.settings).clone();
    if let Some(wallet) = payload.wallet_base_available {
        settings.wallet_base_available = wallet;
    }

    let preview = preview_rebalance(
        &state.engine,
        &payload.balances,
        &risks,
        payload.liquidity_quote,
        &settings,
    )
    .map_err(|e| rebalance_error(&e))?;

    let summary = state.summarizer.summarize(&preview).await;
    let allocation_report =
        format_daily_summary(&preview.current_allocation, &preview.suggested_allocation);
    let alert = should_alert(preview.regime, payload.alert_threshold)
        .then(|| format_rebalance_alert(&preview.swap_plan, Some(&preview.rationale)));

    Ok(Json(PreviewResponse {
        preview,
        summary,
        allocation_report,
        alert,
    }))
}

/// List tool schemas
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        prompt: REBALANCER_PROMPT,
        tools: state.tools.schemas(),
    })
}

/// Execute a tool call
pub async fn execute_tool(
    State(state): State<AppState>,
    Json(mut call): Json<ToolCall>,
) -> Result<Json<ToolResult>, ApiError> {
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    let result = state.tools.execute(&call).await.map_err(|e| agent_error(&e))?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn app() -> axum::Router {
        crate::router(AppState::new(&ServerConfig::default()).unwrap())
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["assets"], 10);
        assert_eq!(body["tools"], 4);
        assert_eq!(body["feed_healthy"], true);
    }

    #[tokio::test]
    async fn test_weights_endpoint() {
        let (status, body) = call(
            "POST",
            "/api/weights",
            Some(json!({"risks": {"USDC": 0.1, "USDT": 0.7}, "liquidity_quote": 1.01})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["regime"], "RED");
        assert_eq!(body["liquidity_gated"], true);
        let total: f64 = body["weights"]
            .as_object()
            .unwrap()
            .values()
            .filter_map(Value::as_f64)
            .sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_weights_rejects_unknown_asset() {
        let (status, body) =
            call("POST", "/api/weights", Some(json!({"risks": {"DOGE": 0.1}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_ASSET");
    }

    #[tokio::test]
    async fn test_swap_plan_endpoint() {
        let (status, body) = call(
            "POST",
            "/api/swap-plan",
            Some(json!({
                "balances": {"USDC": 1200, "USDT": 800, "DAI": 500},
                "deltas": {"USDC": -836.4, "USDT": -254.8, "DAI": -136.4, "FDUSD": 63.6,
                           "BUSD": 113.6, "USDP": 163.6, "TUSD": 213.6, "PYUSD": 263.6,
                           "GUSD": 263.6, "USDD": 145.2}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let plan: SwapPlan = serde_json::from_value(body).unwrap();
        assert_eq!(plan.base_pool_start, dec!(1591.2));
        assert_eq!(plan.shortfall, Decimal::ZERO);
        assert_eq!(plan.sells_to_base.len(), 2);
        assert_eq!(plan.buys_from_base.len(), 7);
    }

    #[tokio::test]
    async fn test_swap_plan_rejects_negative_balance() {
        let (status, body) = call(
            "POST",
            "/api/swap-plan",
            Some(json!({"balances": {"DAI": -1}, "deltas": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_BALANCE");
    }

    #[tokio::test]
    async fn test_swap_plan_rejects_oversized_amounts() {
        let huge = "60000000000000000000000000000";
        let (status, body) = call(
            "POST",
            "/api/swap-plan",
            Some(json!({
                "balances": {"USDC": huge, "DAI": huge},
                "deltas": {"DAI": format!("-{huge}"), "USDT": huge}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_preview_endpoint_alerts_on_red() {
        let (status, body) = call(
            "POST",
            "/api/rebalance/preview",
            Some(json!({
                "balances": {"USDC": 1200, "USDT": 800, "DAI": 500},
                "risks": {"USDC": 0.05, "USDT": 0.2, "DAI": 0.65}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["regime"], "RED");
        assert!(body["summary"].as_str().unwrap().starts_with("Regime=RED"));
        assert!(body["alert"].as_str().unwrap().contains("Rebalance Alert"));
        assert!(body["allocation_report"].as_str().unwrap().contains("Suggested Allocation"));
        assert!(body["swap_plan"]["sells_to_base"].is_array());
    }

    #[tokio::test]
    async fn test_preview_below_threshold_has_no_alert() {
        let (status, body) = call(
            "POST",
            "/api/rebalance/preview",
            Some(json!({
                "balances": {"USDC": 500, "DAI": 500},
                "risks": {"USDC": 0.1, "DAI": 0.1, "USDT": 0.1, "FDUSD": 0.1, "BUSD": 0.1,
                          "TUSD": 0.1, "USDP": 0.1, "PYUSD": 0.1, "USDD": 0.1, "GUSD": 0.1}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["regime"], "GREEN");
        assert!(body["alert"].is_null());
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (status, body) = call("GET", "/api/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["peg_risk", "rebalance_preview", "swap_plan", "target_weights"]);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let (status, body) = call(
            "POST",
            "/api/tools/execute",
            Some(json!({"name": "target_weights", "arguments": {"risks": {"DAI": 0.2}}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let (status, body) = call(
            "POST",
            "/api/tools/execute",
            Some(json!({"name": "launch_rocket", "arguments": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "TOOL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_execute_missing_argument() {
        let (status, body) = call(
            "POST",
            "/api/tools/execute",
            Some(json!({"name": "swap_plan", "arguments": {"balances": {}}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ARGUMENTS");
    }
}
