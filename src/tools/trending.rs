//! Top-performance (trending) tools
//!
//! Rank applications, services, endpoints, and websites by one of the
//! golden signals (latency, traffic, error_rate) over a time window.

use super::{default_window_ms, handler, now_ms};
use crate::client::InstanaApi;
use crate::error::ServerError;
use crate::registry::{schema_integer, schema_object, schema_string, ToolDescriptor, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const TOP_APPLICATIONS: &str = "list_top_applications_by_performance";
const TOP_SERVICES: &str = "list_top_services_by_performance";
const TOP_ENDPOINTS: &str = "list_top_endpoints_by_performance";
const TOP_WEBSITES: &str = "list_top_websites_by_performance";

/// Common parameters of the top-performance tools
#[derive(Debug, Deserialize)]
pub struct TopPerformanceParams {
    /// Golden signal to rank by: "latency", "traffic", or "error_rate"
    #[serde(default = "default_metric")]
    pub metric: String,
    /// End timestamp in epoch milliseconds; defaults to now at call time
    #[serde(default)]
    pub to_time_ms: Option<i64>,
    /// Window size in milliseconds; defaults to the last hour
    #[serde(default = "default_window_ms")]
    pub duration_ms: i64,
    /// Number of entries to return
    #[serde(default = "default_top_n")]
    pub top_n: u32,
    /// Aggregation method: "MEAN", "P95", "P99"
    #[serde(default = "default_aggregation")]
    pub aggregation: String,
    /// Sort direction, "asc" or "desc"
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_metric() -> String {
    "latency".to_string()
}

fn default_top_n() -> u32 {
    10
}

fn default_aggregation() -> String {
    "MEAN".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

/// Metrics payload shared by the application-perspective endpoints.
/// The v2 metrics API ranks server-side, so top_n and order are forwarded
/// rather than applied to the response.
fn application_metrics_payload(params: &TopPerformanceParams) -> Value {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);
    json!({
        "includeInternal": true,
        "includeSynthetic": true,
        "metrics": [{ "aggregation": params.aggregation, "metric": params.metric }],
        "order": { "by": params.metric, "direction": params.order },
        "pagination": { "retrievalSize": params.top_n },
        "timeFrame": { "to": to_time, "windowSize": params.duration_ms }
    })
}

fn website_metrics_payload(params: &TopPerformanceParams) -> Value {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);
    json!({
        "type": "PAGELOAD",
        "metrics": [{ "aggregation": params.aggregation, "metric": params.metric }],
        "order": { "by": params.metric, "direction": params.order },
        "pagination": { "retrievalSize": params.top_n },
        "timeFrame": { "to": to_time, "windowSize": params.duration_ms }
    })
}

async fn top_applications(
    api: Arc<dyn InstanaApi>,
    params: TopPerformanceParams,
) -> Result<Value, ServerError> {
    api.get_application_data_metrics_v2(application_metrics_payload(&params))
        .await
        .map_err(|source| ServerError::Tool {
            tool: TOP_APPLICATIONS,
            operation: "get_application_data_metrics_v2",
            source,
        })
}

async fn top_services(
    api: Arc<dyn InstanaApi>,
    params: TopPerformanceParams,
) -> Result<Value, ServerError> {
    api.get_application_service_data_metrics(application_metrics_payload(&params))
        .await
        .map_err(|source| ServerError::Tool {
            tool: TOP_SERVICES,
            operation: "get_application_service_data_metrics",
            source,
        })
}

async fn top_endpoints(
    api: Arc<dyn InstanaApi>,
    params: TopPerformanceParams,
) -> Result<Value, ServerError> {
    api.get_application_endpoint_data_metrics(application_metrics_payload(&params))
        .await
        .map_err(|source| ServerError::Tool {
            tool: TOP_ENDPOINTS,
            operation: "get_application_endpoint_data_metrics",
            source,
        })
}

async fn top_websites(
    api: Arc<dyn InstanaApi>,
    params: TopPerformanceParams,
) -> Result<Value, ServerError> {
    api.get_website_beacon_metrics_v2(website_metrics_payload(&params))
        .await
        .map_err(|source| ServerError::Tool {
            tool: TOP_WEBSITES,
            operation: "get_website_beacon_metrics_v2",
            source,
        })
}

fn top_performance_schema() -> Value {
    schema_object(json!({
        "metric": schema_string("Golden signal to rank by: latency, traffic, or error_rate"),
        "to_time_ms": schema_integer("End timestamp in milliseconds, defaults to now"),
        "duration_ms": schema_integer("Window size in milliseconds, defaults to one hour (3600000)"),
        "top_n": schema_integer("Number of entries to return, defaults to 10"),
        "aggregation": schema_string("Aggregation method: MEAN, P95, P99"),
        "order": schema_string("Sort direction: asc or desc, defaults to desc"),
    }))
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        name: TOP_APPLICATIONS,
        description:
            "List top n applications measured by specific metric performance: latency, traffic, or error_rate.",
        tags: &["trending", "tool"],
        input_schema: top_performance_schema(),
        handler: handler(TOP_APPLICATIONS, top_applications),
    });

    registry.register(ToolDescriptor {
        name: TOP_SERVICES,
        description:
            "List top n services measured by specific metric performance: latency, traffic, or error_rate.",
        tags: &["trending", "tool"],
        input_schema: top_performance_schema(),
        handler: handler(TOP_SERVICES, top_services),
    });

    registry.register(ToolDescriptor {
        name: TOP_ENDPOINTS,
        description:
            "List top n endpoints measured by specific metric performance: latency, traffic, or error_rate.",
        tags: &["trending", "tool"],
        input_schema: top_performance_schema(),
        handler: handler(TOP_ENDPOINTS, top_endpoints),
    });

    registry.register(ToolDescriptor {
        name: TOP_WEBSITES,
        description:
            "List top n websites measured by page-load performance: latency, traffic, or error_rate.",
        tags: &["trending", "website", "tool"],
        input_schema: top_performance_schema(),
        handler: handler(TOP_WEBSITES, top_websites),
    });
}
