use std::collections::HashMap;

use crate::models::tool::ToolDescriptor;

/// The flat, name-addressable catalog of tools merged from every connected
/// provider.
///
/// Collision policy: when two providers expose the same tool name, the last
/// registration observed wins, for `resolve` and for the model-facing
/// catalog alike, so routing and the offered catalog can never disagree.
/// Registration happens only at session entry, never during a dispatch.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry::default()
    }

    /// Add one provider's descriptors to the catalog. Descriptors carry
    /// their owning provider id; a failure to fetch descriptors from one
    /// provider never prevents others from registering (callers just skip
    /// the failed provider).
    pub fn register(&mut self, descriptors: Vec<ToolDescriptor>) {
        self.tools.extend(descriptors);
    }

    /// Exact name match; last registration wins.
    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().rev().find(|tool| tool.name == name)
    }

    /// The deduplicated catalog, in first-seen order with last-registered
    /// definitions.
    pub fn all(&self) -> Vec<ToolDescriptor> {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut catalog: Vec<ToolDescriptor> = Vec::new();
        for tool in &self.tools {
            match by_name.get(tool.name.as_str()) {
                Some(&index) => catalog[index] = tool.clone(),
                None => {
                    by_name.insert(&tool.name, catalog.len());
                    catalog.push(tool.clone());
                }
            }
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
