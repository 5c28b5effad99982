//! Explicit tool and prompt registries
//!
//! Tools and prompts are registered by an initialization routine walking a
//! fixed list of definitions (see `tools::build_registry` and
//! `prompts::build_registry`); there is no attribute-macro registration.
//! Registration order is preserved because tool listings must come back in
//! the order they were registered, before and after category filtering.

use crate::client::InstanaApi;
use crate::error::ServerError;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Tool invocation entry point: scoped API client + raw JSON arguments in,
/// JSON response body (a mapping from string keys to values) or a
/// classified error out.
pub type ToolHandler =
    Arc<dyn Fn(Arc<dyn InstanaApi>, Value) -> BoxFuture<Result<Value, ServerError>> + Send + Sync>;

/// A registered tool: immutable after registration
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Category tags; fixed at registration, used by `--tools` filtering
    pub tags: &'static [&'static str],
    pub input_schema: Value,
    pub handler: ToolHandler,
}

/// Listing-facing view of a descriptor (no handler), as flowed through the
/// middleware chain
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub input_schema: Value,
}

impl From<&ToolDescriptor> for ToolInfo {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            tags: descriptor.tags.iter().map(|t| t.to_string()).collect(),
            input_schema: descriptor.input_schema.clone(),
        }
    }
}

/// Order-preserving tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Duplicate names are a startup bug, not a runtime
    /// condition, so they abort the process before serving begins.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        if self.index.contains_key(descriptor.name) {
            panic!("duplicate tool name: {}", descriptor.name);
        }
        self.index.insert(descriptor.name, self.tools.len());
        self.tools.push(descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tool infos in registration order
    pub fn listings(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(ToolInfo::from).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Keep only tools whose tag set intersects the selection, preserving the
/// input order. An unset selection disables filtering entirely; a tool
/// with no tags never survives an active filter.
pub fn filter_by_categories(
    tools: Vec<ToolInfo>,
    selection: Option<&HashSet<String>>,
) -> Vec<ToolInfo> {
    let Some(selection) = selection else {
        return tools;
    };

    tools
        .into_iter()
        .filter(|tool| tool.tags.iter().any(|tag| selection.contains(tag)))
        .collect()
}

// ============================================================================
// Prompts
// ============================================================================

/// Declared argument of a prompt template
#[derive(Debug, Clone)]
pub struct PromptArgSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Renders the prompt text from the supplied arguments
pub type PromptRenderer = fn(&serde_json::Map<String, Value>) -> String;

/// A registered prompt template (static text, no external calls)
#[derive(Clone)]
pub struct PromptDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgSpec>,
    pub render: PromptRenderer,
}

/// Order-preserving prompt registry
#[derive(Default)]
pub struct PromptRegistry {
    prompts: Vec<PromptDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: PromptDescriptor) {
        if self.index.contains_key(descriptor.name) {
            panic!("duplicate prompt name: {}", descriptor.name);
        }
        self.index.insert(descriptor.name, self.prompts.len());
        self.prompts.push(descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&PromptDescriptor> {
        self.index.get(name).map(|&i| &self.prompts[i])
    }

    pub fn listings(&self) -> Vec<PromptDescriptor> {
        self.prompts.clone()
    }
}

// ============================================================================
// Input schema helpers
// ============================================================================

pub fn schema_object(properties: Value) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": []
    })
}

pub fn schema_string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub fn schema_integer(description: &str) -> Value {
    json!({ "type": "integer", "description": description })
}
