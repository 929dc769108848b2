use serde::Serialize;

/// Health snapshot of one provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealthStatus {
    pub name: String,
    pub connected: bool,
    /// Consecutive failures since the last completed call
    pub failures: u32,
}

/// Snapshot of every provider the manager knows, in failover order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub active_provider: String,
    pub providers: Vec<ProviderHealthStatus>,
}

impl ProviderStatus {
    /// Look up one provider's entry by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderHealthStatus> {
        self.providers.iter().find(|p| p.name == name)
    }
}
