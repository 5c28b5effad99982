//! Tag-based tool filtering
//!
//! Intercepts `tools/list` outcomes and keeps only tools whose tag set
//! intersects the category selection from `--tools`. Every other method,
//! and every listing when no selection is configured, passes through
//! untouched. Filtering never re-sorts: upstream order is preserved.

use super::{methods, Middleware, MiddlewareContext, Next, Outcome};
use crate::error::ServerError;
use crate::registry::filter_by_categories;
use async_trait::async_trait;
use std::collections::HashSet;

pub struct CategoryFilterMiddleware {
    selection: Option<HashSet<String>>,
}

impl CategoryFilterMiddleware {
    pub fn new(selection: Option<HashSet<String>>) -> Self {
        Self { selection }
    }
}

#[async_trait]
impl Middleware for CategoryFilterMiddleware {
    async fn handle(&self, cx: &MiddlewareContext, next: Next<'_>) -> Result<Outcome, ServerError> {
        let outcome = next.run(cx).await?;

        if cx.method != methods::TOOLS_LIST {
            return Ok(outcome);
        }

        match outcome {
            Outcome::Tools(tools) => match &self.selection {
                None => {
                    tracing::info!("Listing all {} tools without filtering", tools.len());
                    Ok(Outcome::Tools(tools))
                }
                Some(selection) => {
                    let filtered = filter_by_categories(tools, Some(selection));
                    let mut categories: Vec<_> = selection.iter().cloned().collect();
                    categories.sort();
                    tracing::info!(
                        "Listed tools filtered by categories [{}], total {} tools",
                        categories.join(","),
                        filtered.len()
                    );
                    Ok(Outcome::Tools(filtered))
                }
            },
            other => Ok(other),
        }
    }
}
