use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// How to launch one tool-provider process.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProvidersFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: HashMap<String, ProviderConfig>,
}

/// The provider used when no configuration is present.
pub fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert(
        "memory".to_string(),
        ProviderConfig {
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "@modelcontextprotocol/server-memory".to_string()],
            env: HashMap::new(),
        },
    );
    providers
}

/// Load provider configurations from an `mcp.json` file.
///
/// A missing or unreadable file, invalid JSON, or an empty server map all
/// degrade to the default memory provider; configuration problems must
/// never block chat.
pub fn load_provider_configs<P: AsRef<Path>>(path: P) -> HashMap<String, ProviderConfig> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => {
            warn!(path = %path.display(), "provider config not found, using default memory provider");
            return default_providers();
        }
    };

    match serde_json::from_str::<ProvidersFile>(&contents) {
        Ok(file) if !file.mcp_servers.is_empty() => file.mcp_servers,
        Ok(_) => {
            warn!(path = %path.display(), "no providers configured, using default memory provider");
            default_providers()
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "invalid provider config, using default memory provider");
            default_providers()
        }
    }
}
