//! Process API Handler
//!
//! Runs the order status pipeline for one caller-supplied date and country.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use relay_core::domain::run::RunResult;
use relay_core::dto::process::ProcessRequest;
use relay_core::{CallContext, Deadline};
use relay_pipeline::RunRequest;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::validation;

/// Header set by the load balancer, `TRACE_ID/SPAN_ID;o=1`
pub const TRACE_HEADER: &str = "X-Cloud-Trace-Context";

/// POST /process
pub async fn process_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<RunResult>> {
    let Json(req) = payload.map_err(|e| {
        warn!("Invalid JSON: {}", e);
        ApiError::BadRequest("Invalid JSON".to_string())
    })?;

    validation::validate_request(&req).inspect_err(|e| {
        warn!(
            country = %req.dropi_country_suffix,
            webhook_suffix = %req.webhook_suffix,
            "Request validation failed: {}",
            e
        );
    })?;

    let ctx = CallContext::new(trace_id(&headers))
        .with_workspace(req.id_workspace.clone())
        .with_flow_ns(req.flow_ns.clone())
        .with_deadline(Deadline::after(state.run_timeout));

    info!(
        trace_id = %ctx.trace_id,
        date = %req.date,
        country = %req.dropi_country_suffix,
        webhook_suffix = %req.webhook_suffix,
        "Processing request"
    );

    let run = RunRequest {
        api_key: req.api_key,
        date: req.date,
        country_suffix: req.dropi_country_suffix,
        webhook_suffix: req.webhook_suffix,
        until: req.date_util.filter(|d| !d.is_empty()),
    };

    let result = state.pipeline.run(&ctx, &run).await?;

    info!(
        trace_id = %ctx.trace_id,
        orders = result.total_orders,
        changes = result.changes_detected,
        webhooks_queued = result.webhooks_queued,
        partial_timeout = result.partial_timeout,
        "Process completed successfully"
    );

    Ok(Json(result))
}

/// Trace id from the load balancer header, or a fresh one
pub fn trace_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split('/').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
