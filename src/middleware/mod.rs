//! Middleware pipeline wrapped around every protocol operation
//!
//! An ordered chain of request interceptors runs for each MCP operation in
//! fixed registration order: logging -> category filter -> rate limiter ->
//! retry -> operation endpoint. Outcomes flow back up through the chain so
//! interceptors can observe (or, for the tool filter, rewrite) them.

mod category_filter;
mod logging;
mod rate_limit;
mod retry;

pub use category_filter::CategoryFilterMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use retry::RetryMiddleware;

use crate::error::ServerError;
use crate::registry::{PromptDescriptor, ToolInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// MCP method names the chain dispatches
pub mod methods {
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";
}

/// Per-request context owned by the request being processed and discarded
/// when it completes
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// Protocol method, e.g. `tools/call`
    pub method: String,
    /// Caller identity (client name reported at initialize, or "unknown")
    pub source: String,
    /// In-flight payload (tool arguments), if any
    pub payload: Option<Value>,
}

impl MiddlewareContext {
    pub fn new(method: &str, source: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            method: method.to_string(),
            source: source.into(),
            payload,
        }
    }
}

/// Result of a protocol operation, as seen by the chain
pub enum Outcome {
    /// Tool listing (pre-conversion, so the filter can see tags)
    Tools(Vec<ToolInfo>),
    /// Prompt listing
    Prompts(Vec<PromptDescriptor>),
    /// Rendered prompt text
    PromptText(String),
    /// Tool response body: a mapping from string keys to values
    Body(Value),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Tools(tools) => f.debug_tuple("Tools").field(tools).finish(),
            Outcome::Prompts(prompts) => f
                .debug_tuple("Prompts")
                .field(&prompts.iter().map(|p| p.name).collect::<Vec<_>>())
                .finish(),
            Outcome::PromptText(text) => f.debug_tuple("PromptText").field(text).finish(),
            Outcome::Body(body) => f.debug_tuple("Body").field(body).finish(),
        }
    }
}

/// A request interceptor. Implementations delegate to `next.run(cx)` and
/// may short-circuit (rate limiter), re-invoke (retrier), or rewrite the
/// outcome (category filter).
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, cx: &MiddlewareContext, next: Next<'_>) -> Result<Outcome, ServerError>;
}

/// The innermost link of the chain: the operation itself
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, cx: &MiddlewareContext) -> Result<Outcome, ServerError>;
}

/// Adapter so operation endpoints can be written as closures. The closure
/// is re-invocable, which is what lets the retry middleware re-run it.
pub struct FnEndpoint<F>(pub F);

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, ServerError>> + Send,
{
    async fn call(&self, _cx: &MiddlewareContext) -> Result<Outcome, ServerError> {
        (self.0)().await
    }
}

/// Remainder of the chain from the current interceptor onwards
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl Next<'_> {
    pub async fn run(&self, cx: &MiddlewareContext) -> Result<Outcome, ServerError> {
        match self.rest.split_first() {
            Some((head, rest)) => {
                head.handle(
                    cx,
                    Next {
                        rest,
                        endpoint: self.endpoint,
                    },
                )
                .await
            }
            None => self.endpoint.call(cx).await,
        }
    }
}

/// Ordered interceptor chain shared by all requests
#[derive(Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; execution follows registration order.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub async fn dispatch(
        &self,
        cx: &MiddlewareContext,
        endpoint: &dyn Endpoint,
    ) -> Result<Outcome, ServerError> {
        Next {
            rest: &self.layers,
            endpoint,
        }
        .run(cx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the order interceptors ran in
    struct Tracer {
        label: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Tracer {
        async fn handle(
            &self,
            cx: &MiddlewareContext,
            next: Next<'_>,
        ) -> Result<Outcome, ServerError> {
            self.order.lock().unwrap().push(self.label);
            next.run(cx).await
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        for label in ["first", "second", "third"] {
            chain.add(Arc::new(Tracer {
                label,
                order: order.clone(),
            }));
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let endpoint = FnEndpoint(move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Body(json!({"ok": true})))
            }
        });

        let cx = MiddlewareContext::new(methods::TOOLS_CALL, "test-client", None);
        let outcome = chain.dispatch(&cx, &endpoint).await.unwrap();

        assert!(matches!(outcome, Outcome::Body(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_chain_reaches_endpoint() {
        let chain = MiddlewareChain::new();
        let endpoint = FnEndpoint(|| async { Ok(Outcome::Body(json!({"direct": true}))) });
        let cx = MiddlewareContext::new(methods::TOOLS_LIST, "test-client", None);

        let outcome = chain.dispatch(&cx, &endpoint).await.unwrap();
        match outcome {
            Outcome::Body(body) => assert_eq!(body, json!({"direct": true})),
            _ => panic!("expected body outcome"),
        }
    }
}
