//! Application perspective tools

use super::{default_window_ms, handler, now_ms};
use crate::client::InstanaApi;
use crate::error::ServerError;
use crate::registry::{schema_integer, schema_object, schema_string, ToolDescriptor, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const GET_APPLICATIONS: &str = "get_applications";

#[derive(Debug, Deserialize)]
pub struct GetApplicationsParams {
    /// Case-insensitive application name filter
    #[serde(default)]
    pub name_filter: Option<String>,
    /// End timestamp in epoch milliseconds; defaults to now at call time
    #[serde(default)]
    pub to_time_ms: Option<i64>,
    /// Window size in milliseconds; defaults to the last hour
    #[serde(default = "default_window_ms")]
    pub window_size_ms: i64,
    /// Result page, 1-based
    #[serde(default = "default_page")]
    pub page: u32,
    /// Applications per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

async fn get_applications(
    api: Arc<dyn InstanaApi>,
    params: GetApplicationsParams,
) -> Result<Value, ServerError> {
    let to_time = params.to_time_ms.unwrap_or_else(now_ms);

    let mut query = vec![
        ("to", to_time.to_string()),
        ("windowSize", params.window_size_ms.to_string()),
        ("page", params.page.to_string()),
        ("pageSize", params.page_size.to_string()),
    ];
    if let Some(name_filter) = &params.name_filter {
        query.push(("nameFilter", name_filter.clone()));
    }

    api.get_applications(query)
        .await
        .map_err(|source| ServerError::Tool {
            tool: GET_APPLICATIONS,
            operation: "get_applications",
            source,
        })
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        name: GET_APPLICATIONS,
        description:
            "List application perspectives known to Instana, optionally filtered by name, with pagination.",
        tags: &["app", "tool"],
        input_schema: schema_object(json!({
            "name_filter": schema_string("Case-insensitive name filter"),
            "to_time_ms": schema_integer("End timestamp in milliseconds, defaults to now"),
            "window_size_ms": schema_integer("Window size in milliseconds, defaults to one hour (3600000)"),
            "page": schema_integer("Result page (1-based), defaults to 1"),
            "page_size": schema_integer("Applications per page, defaults to 20"),
        })),
        handler: handler(GET_APPLICATIONS, get_applications),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{query_value, MockApi};

    #[tokio::test]
    async fn test_defaults_and_optional_filter() {
        let api = MockApi::ok(json!({"items": []}));

        let params: GetApplicationsParams = serde_json::from_value(json!({})).unwrap();
        let result = get_applications(api.clone(), params).await.unwrap();

        assert_eq!(result, json!({"items": []}));
        assert_eq!(api.call_count(), 1);

        let recorded = api.last_payload();
        assert_eq!(
            query_value(&recorded, "windowSize").unwrap(),
            "3600000"
        );
        assert_eq!(query_value(&recorded, "page").unwrap(), "1");
        assert_eq!(query_value(&recorded, "pageSize").unwrap(), "20");
        assert!(query_value(&recorded, "nameFilter").is_none());
    }

    #[tokio::test]
    async fn test_name_filter_is_forwarded() {
        let api = MockApi::ok(json!({}));

        let params: GetApplicationsParams =
            serde_json::from_value(json!({"name_filter": "checkout"})).unwrap();
        get_applications(api.clone(), params).await.unwrap();

        let recorded = api.last_payload();
        assert_eq!(query_value(&recorded, "nameFilter").unwrap(), "checkout");
    }
}
