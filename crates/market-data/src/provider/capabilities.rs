//! Provider capabilities.
//!
//! Describes what a market data provider can do so the manager can tell an
//! unsupported operation apart from a provider that genuinely has no data.

/// Describes the capabilities of a market data provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether the provider serves historical bars.
    ///
    /// A provider that does not returns an empty list from
    /// `get_historical_bars`, and the manager treats that as a reason to try
    /// the next provider. An empty list from a provider that does support
    /// history is taken at face value.
    pub supports_historical: bool,

    /// Whether quote subscriptions are pushed by the source (true) or
    /// emulated by polling (false).
    pub supports_streaming: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supports_historical: true,
            supports_streaming: false,
        }
    }
}
