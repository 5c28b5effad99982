//! Logging middleware: purely observational, logs every protocol
//! operation before and after delegation. Errors are logged here and
//! propagate unchanged.

use super::{Middleware, MiddlewareContext, Next, Outcome};
use crate::error::ServerError;
use async_trait::async_trait;

pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, cx: &MiddlewareContext, next: Next<'_>) -> Result<Outcome, ServerError> {
        tracing::info!("Processing {} from {}", cx.method, cx.source);
        if let Some(payload) = &cx.payload {
            tracing::debug!("{} payload: {}", cx.method, payload);
        }

        let result = next.run(cx).await;

        match &result {
            Ok(_) => tracing::info!("Completed {}", cx.method),
            Err(err) => tracing::info!("Completed {} with error: {}", cx.method, err),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{methods, FnEndpoint, MiddlewareChain};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let mut chain = MiddlewareChain::new();
        chain.add(Arc::new(LoggingMiddleware));

        let endpoint = FnEndpoint(|| async { Err(ServerError::UnknownTool("nope".to_string())) });
        let cx = MiddlewareContext::new(methods::TOOLS_CALL, "test-client", Some(json!({})));

        let err = chain.dispatch(&cx, &endpoint).await.unwrap_err();
        assert!(matches!(err, ServerError::UnknownTool(name) if name == "nope"));
    }
}
