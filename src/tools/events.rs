//! Event tools

use super::{default_window_ms, handler, now_ms};
use crate::client::InstanaApi;
use crate::error::ServerError;
use crate::registry::{schema_integer, schema_object, ToolDescriptor, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const GET_EVENTS: &str = "get_events";

#[derive(Debug, Deserialize)]
pub struct GetEventsParams {
    /// End timestamp in epoch milliseconds; defaults to now at call time
    #[serde(default)]
    pub to_time_ms: Option<i64>,
    /// Window size in milliseconds; defaults to the last hour
    #[serde(default = "default_window_ms")]
    pub window_size_ms: i64,
    /// Drop intermediate updates of the same event
    #[serde(default = "default_filter_event_updates")]
    pub filter_event_updates: bool,
    /// Event types to include, e.g. "incident", "issue", "change";
    /// empty means all types
    #[serde(default)]
    pub event_type_filters: Vec<String>,
}

fn default_filter_event_updates() -> bool {
    true
}

async fn get_events(
    api: Arc<dyn InstanaApi>,
    params: GetEventsParams,
) -> Result<Value, ServerError> {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);

    let mut query = vec![
        ("to", to_time.to_string()),
        ("windowSize", params.window_size_ms.to_string()),
        (
            "filterEventUpdates",
            params.filter_event_updates.to_string(),
        ),
    ];
    for event_type in &params.event_type_filters {
        query.push(("eventTypeFilters", event_type.clone()));
    }

    api.get_events(query)
        .await
        .map_err(|source| ServerError::Tool {
            tool: GET_EVENTS,
            operation: "get_events",
            source,
        })
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        name: GET_EVENTS,
        description:
            "List Instana events (incidents, issues, changes) within a time window.",
        tags: &["events", "tool"],
        input_schema: schema_object(json!({
            "to_time_ms": schema_integer("End timestamp in milliseconds, defaults to now"),
            "window_size_ms": schema_integer("Window size in milliseconds, defaults to one hour (3600000)"),
            "filter_event_updates": {
                "type": "boolean",
                "description": "Drop intermediate updates of the same event, defaults to true"
            },
            "event_type_filters": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Event types to include (incident, issue, change); empty means all"
            },
        })),
        handler: handler(GET_EVENTS, get_events),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::tools::test_support::{query_value, MockApi};

    #[tokio::test]
    async fn test_defaults() {
        let api = MockApi::ok(json!({"events": []}));

        let params: GetEventsParams = serde_json::from_value(json!({})).unwrap();
        let result = get_events(api.clone(), params).await.unwrap();

        assert_eq!(result, json!({"events": []}));
        let recorded = api.last_payload();
        assert_eq!(query_value(&recorded, "windowSize").unwrap(), "3600000");
        assert_eq!(
            query_value(&recorded, "filterEventUpdates").unwrap(),
            "true"
        );
        assert!(query_value(&recorded, "eventTypeFilters").is_none());
    }

    #[tokio::test]
    async fn test_event_type_filters_are_repeated_query_params() {
        let api = MockApi::ok(json!({}));

        let params: GetEventsParams = serde_json::from_value(json!({
            "event_type_filters": ["incident", "issue"]
        }))
        .unwrap();
        get_events(api.clone(), params).await.unwrap();

        let recorded = api.last_payload();
        let filters: Vec<_> = recorded
            .as_array()
            .unwrap()
            .iter()
            .filter(|pair| pair["key"] == "eventTypeFilters")
            .map(|pair| pair["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(filters, vec!["incident", "issue"]);
    }

    #[tokio::test]
    async fn test_timeout_is_classified_transient() {
        let api = MockApi::failing(|| ApiError::Timeout("deadline exceeded".to_string()));

        let params: GetEventsParams = serde_json::from_value(json!({})).unwrap();
        let err = get_events(api, params).await.unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("get_events"));
    }
}
