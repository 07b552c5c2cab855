pub mod stdio;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::ProviderConfig;
use crate::errors::ProviderResult;
use crate::models::tool::ToolDescriptor;
use crate::registry::ToolRegistry;

/// Core trait for a tool-provider connection: an external process exposing
/// schema-described callable functions.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Id of this provider connection
    fn id(&self) -> &str;

    /// Whether the underlying transport is still up
    fn connected(&self) -> bool;

    /// Fetch the provider's tool descriptors
    async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>>;

    /// Invoke a named tool with parsed arguments. Returns the provider's
    /// raw content items; reducing them to text is the dispatcher's job.
    async fn call_tool(&self, name: &str, arguments: Value) -> ProviderResult<Vec<Value>>;

    /// Tear down the connection. Best effort; callers log failures rather
    /// than propagate them.
    async fn shutdown(&self) -> ProviderResult<()>;
}

/// Spawn every configured provider and merge their tools into one registry.
///
/// Providers are initialized independently: one failing to spawn or to list
/// its tools is logged and skipped without affecting the rest. An empty
/// result means chat continues with no tools available.
pub async fn connect_all(
    configs: &HashMap<String, ProviderConfig>,
) -> (HashMap<String, Arc<dyn ToolProvider>>, ToolRegistry) {
    let mut providers: HashMap<String, Arc<dyn ToolProvider>> = HashMap::new();
    let mut registry = ToolRegistry::new();

    // Sorted so registration order, and therefore collision resolution,
    // is deterministic across runs.
    let mut ids: Vec<&String> = configs.keys().collect();
    ids.sort();

    for id in ids {
        let config = &configs[id];
        let provider = match stdio::StdioProvider::spawn(id, config).await {
            Ok(provider) => provider,
            Err(err) => {
                error!(provider = %id, %err, "failed to start tool provider, skipping");
                continue;
            }
        };

        match provider.list_tools().await {
            Ok(descriptors) => {
                info!(provider = %id, tools = descriptors.len(), "tool provider connected");
                registry.register(descriptors);
                providers.insert(id.clone(), Arc::new(provider));
            }
            Err(err) => {
                error!(provider = %id, %err, "failed to list tools, skipping provider");
                if let Err(err) = provider.shutdown().await {
                    error!(provider = %id, %err, "failed to stop provider");
                }
            }
        }
    }

    (providers, registry)
}
