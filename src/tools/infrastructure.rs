//! Infrastructure monitoring tools

use super::{default_window_ms, handler, now_ms};
use crate::client::InstanaApi;
use crate::error::ServerError;
use crate::registry::{schema_integer, schema_object, schema_string, ToolDescriptor, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const GET_INFRASTRUCTURE_METRICS: &str = "get_infrastructure_metrics";
const GET_AGENT_SNAPSHOTS: &str = "get_agent_snapshots";

#[derive(Debug, Deserialize)]
pub struct InfrastructureMetricsParams {
    /// Instana plugin identifying the entity type, e.g. "host"
    #[serde(default = "default_plugin")]
    pub plugin: String,
    /// Metric identifiers to retrieve
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    /// Dynamic focus query narrowing the entities, e.g. "entity.zone:prod"
    #[serde(default)]
    pub query: Option<String>,
    /// Rollup granularity in seconds
    #[serde(default = "default_rollup")]
    pub rollup: u32,
    /// End timestamp in epoch milliseconds; defaults to now at call time
    #[serde(default)]
    pub to_time_ms: Option<i64>,
    /// Window size in milliseconds; defaults to the last hour
    #[serde(default = "default_window_ms")]
    pub window_size_ms: i64,
}

fn default_plugin() -> String {
    "host".to_string()
}

fn default_metrics() -> Vec<String> {
    vec!["cpu.used".to_string(), "memory.used".to_string()]
}

fn default_rollup() -> u32 {
    60
}

#[derive(Debug, Deserialize)]
pub struct AgentSnapshotsParams {
    /// Instana plugin identifying the entity type, e.g. "host"
    #[serde(default = "default_plugin")]
    pub plugin: String,
    /// Dynamic focus query narrowing the entities
    #[serde(default)]
    pub query: Option<String>,
    /// End timestamp in epoch milliseconds; defaults to now at call time
    #[serde(default)]
    pub to_time_ms: Option<i64>,
    /// Window size in milliseconds; defaults to the last hour
    #[serde(default = "default_window_ms")]
    pub window_size_ms: i64,
    /// Maximum snapshots to return
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    100
}

async fn get_infrastructure_metrics(
    api: Arc<dyn InstanaApi>,
    params: InfrastructureMetricsParams,
) -> Result<Value, ServerError> {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);

    let payload = json!({
        "plugin": params.plugin,
        "metrics": params.metrics,
        "query": params.query,
        "rollup": params.rollup,
        "timeFrame": { "to": to_time, "windowSize": params.window_size_ms }
    });

    api.get_infrastructure_metrics(payload)
        .await
        .map_err(|source| ServerError::Tool {
            tool: GET_INFRASTRUCTURE_METRICS,
            operation: "get_infrastructure_metrics",
            source,
        })
}

async fn get_agent_snapshots(
    api: Arc<dyn InstanaApi>,
    params: AgentSnapshotsParams,
) -> Result<Value, ServerError> {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);

    let mut query = vec![
        ("plugin", params.plugin.clone()),
        ("to", to_time.to_string()),
        ("windowSize", params.window_size_ms.to_string()),
        ("size", params.size.to_string()),
    ];
    if let Some(focus) = &params.query {
        query.push(("query", focus.clone()));
    }

    api.get_agent_snapshots(query)
        .await
        .map_err(|source| ServerError::Tool {
            tool: GET_AGENT_SNAPSHOTS,
            operation: "get_agent_snapshots",
            source,
        })
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        name: GET_INFRASTRUCTURE_METRICS,
        description:
            "Retrieve infrastructure metrics for monitored entities of a plugin (e.g. host CPU and memory usage).",
        tags: &["infra", "tool"],
        input_schema: schema_object(json!({
            "plugin": schema_string("Entity plugin, defaults to host"),
            "metrics": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Metric identifiers, defaults to cpu.used and memory.used"
            },
            "query": schema_string("Dynamic focus query narrowing the entities"),
            "rollup": schema_integer("Rollup granularity in seconds, defaults to 60"),
            "to_time_ms": schema_integer("End timestamp in milliseconds, defaults to now"),
            "window_size_ms": schema_integer("Window size in milliseconds, defaults to one hour (3600000)"),
        })),
        handler: handler(GET_INFRASTRUCTURE_METRICS, get_infrastructure_metrics),
    });

    registry.register(ToolDescriptor {
        name: GET_AGENT_SNAPSHOTS,
        description:
            "List snapshots of monitored entities reported by Instana agents within a time window.",
        tags: &["infra", "tool"],
        input_schema: schema_object(json!({
            "plugin": schema_string("Entity plugin, defaults to host"),
            "query": schema_string("Dynamic focus query narrowing the entities"),
            "to_time_ms": schema_integer("End timestamp in milliseconds, defaults to now"),
            "window_size_ms": schema_integer("Window size in milliseconds, defaults to one hour (3600000)"),
            "size": schema_integer("Maximum snapshots to return, defaults to 100"),
        })),
        handler: handler(GET_AGENT_SNAPSHOTS, get_agent_snapshots),
    });
}
