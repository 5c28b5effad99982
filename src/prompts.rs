//! Website analysis prompts
//!
//! Static text templates parameterized by optional arguments; prompts make
//! no external calls. Registered through the same explicit-init pattern as
//! the tools.

use crate::registry::{PromptArgSpec, PromptDescriptor, PromptRegistry};
use serde_json::{Map, Value};

const WEBSITE_BEACON_GROUPS: &str = "get_website_beacon_groups";
const WEBSITE_BEACONS: &str = "get_website_beacons";

fn argument(args: &Map<String, Value>, name: &str, missing: &str) -> String {
    match args.get(name) {
        None | Some(Value::Null) => missing.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_beacon_groups(args: &Map<String, Value>) -> String {
    format!(
        "Get website beacon groups with payload:\n\
         - Payload: {}\n\
         - Fill time series: {}",
        argument(args, "payload", "None (will use default payload)"),
        argument(args, "fill_time_series", "None"),
    )
}

fn render_beacons(args: &Map<String, Value>) -> String {
    format!(
        "Get website beacons with payload:\n\
         - Payload: {}\n\
         - Fill time series: {}",
        argument(args, "payload", "None (will use default payload)"),
        argument(args, "fill_time_series", "None"),
    )
}

fn beacon_arguments() -> Vec<PromptArgSpec> {
    vec![
        PromptArgSpec {
            name: "payload",
            description: "Beacon metrics request payload; omit to use the default payload",
            required: false,
        },
        PromptArgSpec {
            name: "fill_time_series",
            description: "Whether to fill gaps in the time series with zeroes",
            required: false,
        },
    ]
}

/// Populate the prompt registry from the fixed prompt list
pub fn build_registry() -> PromptRegistry {
    let mut registry = PromptRegistry::new();

    registry.register(PromptDescriptor {
        name: WEBSITE_BEACON_GROUPS,
        description:
            "Retrieve grouped website beacon metrics for analyzing performance across different \
             dimensions like page URLs, browsers, or geographic locations",
        arguments: beacon_arguments(),
        render: render_beacon_groups,
    });

    registry.register(PromptDescriptor {
        name: WEBSITE_BEACONS,
        description:
            "Retrieve individual website beacon metrics providing detailed information about \
             specific beacon events",
        arguments: beacon_arguments(),
        render: render_beacons,
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_lists_both_prompts() {
        let registry = build_registry();
        let names: Vec<_> = registry
            .listings()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec![WEBSITE_BEACON_GROUPS, WEBSITE_BEACONS]);
    }

    #[test]
    fn test_render_without_arguments_uses_placeholders() {
        let registry = build_registry();
        let prompt = registry.get(WEBSITE_BEACON_GROUPS).unwrap();

        let text = (prompt.render)(&Map::new());
        assert!(text.contains("website beacon groups"));
        assert!(text.contains("None (will use default payload)"));
        assert!(text.contains("Fill time series: None"));
    }

    #[test]
    fn test_render_with_arguments_embeds_them() {
        let registry = build_registry();
        let prompt = registry.get(WEBSITE_BEACONS).unwrap();

        let mut args = Map::new();
        args.insert("payload".to_string(), json!({"metrics": ["pageLoads"]}));
        args.insert("fill_time_series".to_string(), json!(true));

        let text = (prompt.render)(&args);
        assert!(text.contains(r#"{"metrics":["pageLoads"]}"#));
        assert!(text.contains("Fill time series: true"));
    }
}
