use crate::core::protocol::capabilities::{
    ResourcesCapability, ServerCapabilities, ToolsCapability,
};

/// Builder for the capabilities a router announces in `initialize`
#[derive(Default)]
pub struct CapabilitiesBuilder {
    tools: Option<ToolsCapability>,
    resources: Option<ResourcesCapability>,
}

impl CapabilitiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable tools capability
    pub fn with_tools(mut self, list_changed: bool) -> Self {
        self.tools = Some(ToolsCapability {
            list_changed: Some(list_changed),
        });
        self
    }

    /// Enable resources capability
    pub fn with_resources(mut self, subscribe: bool, list_changed: bool) -> Self {
        self.resources = Some(ResourcesCapability {
            subscribe: Some(subscribe),
            list_changed: Some(list_changed),
        });
        self
    }

    pub fn build(self) -> ServerCapabilities {
        ServerCapabilities {
            tools: self.tools,
            resources: self.resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_enabled_capabilities_are_announced() {
        let caps = CapabilitiesBuilder::new().with_tools(false).build();
        assert!(caps.tools.is_some());
        assert!(caps.resources.is_none());

        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json, serde_json::json!({"tools": {"listChanged": false}}));
    }
}
