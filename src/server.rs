//! MCP server: protocol handler and transport bootstrap
//!
//! `InstanaServer` implements rmcp's `ServerHandler` against the explicit
//! tool/prompt registries; every protocol operation is dispatched through
//! the middleware chain (logging -> category filter -> rate limit ->
//! retry) before reaching its endpoint. The bootstrap serves either stdio
//! or streamable HTTP, per the startup configuration.

use crate::client::InstanaApi;
use crate::config::{ServerConfig, TransportMode};
use crate::error::ServerError;
use crate::middleware::{
    methods, CategoryFilterMiddleware, FnEndpoint, LoggingMiddleware, MiddlewareChain,
    MiddlewareContext, Outcome, RateLimitMiddleware, RetryMiddleware,
};
use crate::registry::{PromptDescriptor, PromptRegistry, ToolInfo, ToolRegistry};
use crate::{prompts, tools};

use anyhow::Result;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, GetPromptRequestParam,
    GetPromptResult, ListPromptsResult, ListToolsResult, PaginatedRequestParam, Prompt,
    PromptArgument, PromptMessage, PromptMessageContent, PromptMessageRole, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// MCP server for IBM Instana
#[derive(Clone)]
pub struct InstanaServer {
    tools: Arc<ToolRegistry>,
    prompts: Arc<PromptRegistry>,
    chain: Arc<MiddlewareChain>,
    api: Arc<dyn InstanaApi>,
}

impl InstanaServer {
    /// Wire the middleware chain (fixed order) and populate the
    /// registries.
    pub fn new(config: &ServerConfig, api: Arc<dyn InstanaApi>) -> Self {
        let mut chain = MiddlewareChain::new();

        tracing::info!("Adding LoggingMiddleware");
        chain.add(Arc::new(LoggingMiddleware));

        tracing::info!("Adding CategoryFilterMiddleware");
        chain.add(Arc::new(CategoryFilterMiddleware::new(
            config.categories.clone(),
        )));

        tracing::info!("Adding RateLimitMiddleware");
        chain.add(Arc::new(RateLimitMiddleware::new(config.rate_limit)));

        tracing::info!("Adding RetryMiddleware");
        chain.add(Arc::new(RetryMiddleware::new(config.retry)));

        let tools = Arc::new(tools::build_registry());
        tracing::info!("Registered {} tools", tools.len());

        Self {
            tools,
            prompts: Arc::new(prompts::build_registry()),
            chain: Arc::new(chain),
            api,
        }
    }

    async fn dispatch_list_tools(&self, source: String) -> Result<Vec<ToolInfo>, ServerError> {
        let cx = MiddlewareContext::new(methods::TOOLS_LIST, source, None);
        let registry = self.tools.clone();
        let endpoint = FnEndpoint(move || {
            let registry = registry.clone();
            async move { Ok(Outcome::Tools(registry.listings())) }
        });

        match self.chain.dispatch(&cx, &endpoint).await? {
            Outcome::Tools(tools) => Ok(tools),
            _ => Ok(Vec::new()),
        }
    }

    async fn dispatch_call_tool(
        &self,
        source: String,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ServerError> {
        let descriptor = self
            .tools
            .get(name)
            .ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;

        let cx = MiddlewareContext::new(methods::TOOLS_CALL, source, Some(arguments.clone()));
        let handler = descriptor.handler.clone();
        let api = self.api.clone();
        let endpoint = FnEndpoint(move || {
            let handler = handler.clone();
            let api = api.clone();
            let arguments = arguments.clone();
            async move { handler(api, arguments).await.map(Outcome::Body) }
        });

        match self.chain.dispatch(&cx, &endpoint).await? {
            Outcome::Body(body) => Ok(body),
            _ => Ok(Value::Null),
        }
    }

    async fn dispatch_list_prompts(
        &self,
        source: String,
    ) -> Result<Vec<PromptDescriptor>, ServerError> {
        let cx = MiddlewareContext::new(methods::PROMPTS_LIST, source, None);
        let registry = self.prompts.clone();
        let endpoint = FnEndpoint(move || {
            let registry = registry.clone();
            async move { Ok(Outcome::Prompts(registry.listings())) }
        });

        match self.chain.dispatch(&cx, &endpoint).await? {
            Outcome::Prompts(prompts) => Ok(prompts),
            _ => Ok(Vec::new()),
        }
    }

    async fn dispatch_get_prompt(
        &self,
        source: String,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<String, ServerError> {
        let cx = MiddlewareContext::new(
            methods::PROMPTS_GET,
            source,
            Some(Value::Object(arguments.clone())),
        );
        let registry = self.prompts.clone();
        let name = name.to_string();
        let endpoint = FnEndpoint(move || {
            let registry = registry.clone();
            let name = name.clone();
            let arguments = arguments.clone();
            async move {
                let descriptor = registry
                    .get(&name)
                    .ok_or_else(|| ServerError::UnknownPrompt(name.clone()))?;
                Ok(Outcome::PromptText((descriptor.render)(&arguments)))
            }
        });

        match self.chain.dispatch(&cx, &endpoint).await? {
            Outcome::PromptText(text) => Ok(text),
            _ => Ok(String::new()),
        }
    }
}

/// Caller identity for the middleware context: the client name reported at
/// initialize, when available
fn source_of(context: &RequestContext<RoleServer>) -> String {
    context
        .peer
        .peer_info()
        .map(|info| info.client_info.name.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn to_rmcp_tool(info: ToolInfo) -> Tool {
    let schema = match info.input_schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Tool::new(info.name, info.description, Arc::new(schema))
}

fn to_rmcp_prompt(descriptor: PromptDescriptor) -> Prompt {
    let arguments: Vec<PromptArgument> = descriptor
        .arguments
        .iter()
        .map(|arg| PromptArgument {
            name: arg.name.to_string(),
            description: Some(arg.description.to_string()),
            required: Some(arg.required),
            title: None,
        })
        .collect();

    Prompt::new(
        descriptor.name,
        Some(descriptor.description),
        Some(arguments),
    )
}

impl ServerHandler for InstanaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Instana MCP Server - exposes IBM Instana observability data to AI assistants.\n\n\
                 Tools cover top applications/services/endpoints/websites by performance \
                 (trending), application perspectives (app), events (events), and \
                 infrastructure metrics and agent snapshots (infra). Website analysis \
                 prompts are also available."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .dispatch_list_tools(source_of(&context))
            .await
            .map_err(ErrorData::from)?;

        Ok(ListToolsResult {
            tools: tools.into_iter().map(to_rmcp_tool).collect(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));

        let body = self
            .dispatch_call_tool(source_of(&context), &request.name, arguments)
            .await
            .map_err(|err| {
                tracing::error!("{}", err);
                ErrorData::from(err)
            })?;

        let text = serde_json::to_string(&body)
            .map_err(|err| ErrorData::internal_error(err.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        let prompts = self
            .dispatch_list_prompts(source_of(&context))
            .await
            .map_err(ErrorData::from)?;

        Ok(ListPromptsResult {
            prompts: prompts.into_iter().map(to_rmcp_prompt).collect(),
            ..Default::default()
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        let arguments = request.arguments.clone().unwrap_or_default();
        let text = self
            .dispatch_get_prompt(source_of(&context), &request.name, arguments)
            .await
            .map_err(ErrorData::from)?;

        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage {
                role: PromptMessageRole::User,
                content: PromptMessageContent::text(text),
            }],
        })
    }
}

/// Start the protocol listener in the configured transport mode. Blocks
/// until the host disconnects (stdio) or shutdown is requested (HTTP).
pub async fn run(config: &ServerConfig, server: InstanaServer) -> Result<()> {
    match config.transport {
        TransportMode::Stdio => {
            tracing::info!("Starting MCP server in stdio mode");
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
        }
        TransportMode::StreamableHttp => {
            tracing::info!(
                "Starting MCP server in streamable-http mode on port {}",
                config.port
            );

            let ct = CancellationToken::new();
            let service = StreamableHttpService::new(
                move || Ok(server.clone()),
                LocalSessionManager::default().into(),
                StreamableHttpServerConfig {
                    cancellation_token: ct.child_token(),
                    ..Default::default()
                },
            );

            let router = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
            tracing::info!("MCP server listening at http://0.0.0.0:{}/mcp", config.port);

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("MCP server shutdown requested");
                    ct.cancel();
                })
                .await?;

            tracing::info!("MCP server stopped");
        }
    }

    Ok(())
}
