//! Instana MCP tools
//!
//! Every tool follows the same contract: optional parameters with
//! documented defaults, one scoped Instana API call, and the raw JSON
//! response body as the result. Failures from the API are classified as
//! tool errors carrying the tool name and the failing operation.
//!
//! Registration is explicit: `build_registry` walks the fixed tool list
//! instead of relying on registration macros.

mod application;
mod events;
mod infrastructure;
mod trending;

use crate::client::InstanaApi;
use crate::error::ServerError;
use crate::registry::{ToolHandler, ToolRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Populate the tool registry. Order here is the order hosts see tools in.
pub fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    trending::register(&mut registry);
    application::register(&mut registry);
    events::register(&mut registry);
    infrastructure::register(&mut registry);

    registry
}

/// Current wall-clock time in epoch milliseconds, the default "to time"
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One hour in milliseconds, the default query window
pub(crate) fn default_window_ms() -> i64 {
    60 * 60 * 1000
}

/// Adapt a typed async tool function into a registry handler: deserialize
/// arguments (missing fields take their serde defaults), then run the
/// tool body against the scoped API client.
pub(crate) fn handler<P, Fut>(
    tool: &'static str,
    func: fn(Arc<dyn InstanaApi>, P) -> Fut,
) -> ToolHandler
where
    P: DeserializeOwned + Send + 'static,
    Fut: Future<Output = Result<Value, ServerError>> + Send + 'static,
{
    Arc::new(move |api, args| {
        Box::pin(async move {
            let params: P = serde_json::from_value(args)
                .map_err(|err| ServerError::InvalidParams(format!("{}: {}", tool, err)))?;
            func(api, params).await
        })
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::client::QueryParams;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type MockResult = Box<dyn Fn() -> Result<Value, ApiError> + Send + Sync>;

    /// Records every Instana API call a tool makes and replays a canned
    /// response.
    pub struct MockApi {
        calls: AtomicUsize,
        last_operation: Mutex<Option<&'static str>>,
        last_payload: Mutex<Option<Value>>,
        result: MockResult,
    }

    impl MockApi {
        pub fn ok(response: Value) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_operation: Mutex::new(None),
                last_payload: Mutex::new(None),
                result: Box::new(move || Ok(response.clone())),
            })
        }

        pub fn failing(error: fn() -> ApiError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_operation: Mutex::new(None),
                last_payload: Mutex::new(None),
                result: Box::new(move || Err(error())),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_operation(&self) -> Option<&'static str> {
            *self.last_operation.lock().unwrap()
        }

        pub fn last_payload(&self) -> Value {
            self.last_payload.lock().unwrap().clone().unwrap_or(Value::Null)
        }

        fn record(&self, operation: &'static str, payload: Value) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_operation.lock().unwrap() = Some(operation);
            *self.last_payload.lock().unwrap() = Some(payload);
            (self.result)()
        }

        fn record_query(
            &self,
            operation: &'static str,
            query: QueryParams,
        ) -> Result<Value, ApiError> {
            let pairs: Vec<Value> = query
                .iter()
                .map(|(k, v)| json!({ "key": k, "value": v }))
                .collect();
            self.record(operation, Value::Array(pairs))
        }
    }

    #[async_trait]
    impl InstanaApi for MockApi {
        async fn get_application_data_metrics_v2(&self, body: Value) -> Result<Value, ApiError> {
            self.record("get_application_data_metrics_v2", body)
        }

        async fn get_application_service_data_metrics(
            &self,
            body: Value,
        ) -> Result<Value, ApiError> {
            self.record("get_application_service_data_metrics", body)
        }

        async fn get_application_endpoint_data_metrics(
            &self,
            body: Value,
        ) -> Result<Value, ApiError> {
            self.record("get_application_endpoint_data_metrics", body)
        }

        async fn get_website_beacon_metrics_v2(&self, body: Value) -> Result<Value, ApiError> {
            self.record("get_website_beacon_metrics_v2", body)
        }

        async fn get_applications(&self, query: QueryParams) -> Result<Value, ApiError> {
            self.record_query("get_applications", query)
        }

        async fn get_events(&self, query: QueryParams) -> Result<Value, ApiError> {
            self.record_query("get_events", query)
        }

        async fn get_infrastructure_metrics(&self, body: Value) -> Result<Value, ApiError> {
            self.record("get_infrastructure_metrics", body)
        }

        async fn get_agent_snapshots(&self, query: QueryParams) -> Result<Value, ApiError> {
            self.record_query("get_agent_snapshots", query)
        }
    }

    /// Look up a query pair recorded by `record_query`
    pub fn query_value(recorded: &Value, key: &str) -> Option<String> {
        recorded.as_array()?.iter().find_map(|pair| {
            if pair["key"] == key {
                pair["value"].as_str().map(String::from)
            } else {
                None
            }
        })
    }
}
