//! Boundary validation for plans returned by the model.
//!
//! The response schema is only a request; the provider can still hand back
//! prose, truncated JSON or out-of-range metrics. Everything is checked here
//! before a plan reaches application state, and a plan is either accepted
//! whole or rejected whole.

use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};
use crate::types::{DailyPlan, PlanMetrics};

pub fn parse_plan(text: Option<&str>) -> FlowResult<DailyPlan> {
    let Some(raw) = text.map(str::trim).filter(|raw| !raw.is_empty()) else {
        warn!("plan response carried no text");
        return Err(FlowError::EmptyResponse);
    };

    let body = strip_code_fence(raw);
    let mut plan: DailyPlan = serde_json::from_str(body).map_err(|err| {
        warn!(error = %err, "plan response is not a valid DailyPlan");
        FlowError::MalformedPlan(err.to_string())
    })?;

    check_metrics(&plan.metrics)?;

    for (index, block) in plan.schedule.iter_mut().enumerate() {
        if block.id.trim().is_empty() {
            block.id = format!("block-{index}");
        }
    }

    debug!(
        blocks = plan.schedule.len(),
        deferred = plan.deferred_tasks.len(),
        "parsed plan response"
    );
    Ok(plan)
}

fn check_metrics(metrics: &PlanMetrics) -> FlowResult<()> {
    let fields = [
        ("totalFocusHours", metrics.total_focus_hours, None),
        ("confidenceScore", metrics.confidence_score, Some(100.0)),
        ("utilizationRate", metrics.utilization_rate, Some(100.0)),
    ];
    for (name, value, max) in fields {
        let in_range = value.is_finite() && value >= 0.0 && max.map_or(true, |max| value <= max);
        if !in_range {
            return Err(FlowError::MalformedPlan(format!("{name} out of range: {value}")));
        }
    }
    Ok(())
}

// Some models wrap JSON in a Markdown fence even when asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // The info string runs to the first newline unless the JSON opens on
    // the fence line itself.
    let body = match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body,
        _ => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}
