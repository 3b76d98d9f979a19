//! proxy_update tool implementation.
//!
//! Re-runs registration for the configured generation, optionally
//! promoting a generation that is installed and waiting.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use biblio_core::OfflineProxy;
use biblio_core::proxy::RegisterOutcome;

use super::json_result;

/// Parameters for the proxy_update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProxyUpdateParams {
    /// Activate the new generation even when the proxy is configured to
    /// let it wait.
    #[serde(default)]
    pub activate: bool,
}

/// Output from the proxy_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyUpdateOutput {
    pub outcome: RegisterOutcome,
}

/// Implementation of the proxy_update tool.
pub async fn update_impl(proxy: &OfflineProxy, params: ProxyUpdateParams) -> Result<CallToolResult, McpError> {
    let mut outcome = proxy.register().await?;

    if params.activate && matches!(outcome, RegisterOutcome::Installed { .. }) {
        outcome = RegisterOutcome::Activated(proxy.activate().await?);
    }

    tracing::info!(outcome = ?outcome, "proxy update");
    json_result(&ProxyUpdateOutput { outcome })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{output, proxy};
    use super::*;

    #[tokio::test]
    async fn test_update_installs_then_noop() {
        let proxy = proxy("v1").await;

        let result = update_impl(&proxy, ProxyUpdateParams::default()).await.unwrap();
        let first: ProxyUpdateOutput = output(&result);
        assert!(matches!(first.outcome, RegisterOutcome::Activated(_)));

        let result = update_impl(&proxy, ProxyUpdateParams::default()).await.unwrap();
        let second: ProxyUpdateOutput = output(&result);
        assert_eq!(second.outcome, RegisterOutcome::AlreadyActive);
    }
}
