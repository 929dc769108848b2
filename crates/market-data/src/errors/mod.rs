//! Error types for the market data crate.
//!
//! Providers return [`MarketDataError`] from every fallible call. The
//! [`MarketDataManager`](crate::MarketDataManager) never lets these escape:
//! each one is logged, counted against the provider's health and turned into
//! an absent result for the caller.

use thiserror::Error;

/// Errors that can occur while talking to a market data provider.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider is not connected.
    #[error("Provider not connected: {provider}")]
    NotConnected {
        /// The provider that is offline
        provider: String,
    },

    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The unsupported operation
        operation: String,
        /// The provider that rejected it
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider returned data that could not be converted.
    #[error("Invalid data from {provider}: {message}")]
    InvalidData {
        /// The provider that returned the data
        provider: String,
        /// What was wrong with it
        message: String,
    },
}

impl MarketDataError {
    /// Shorthand for a [`MarketDataError::ProviderError`].
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`MarketDataError::NotConnected`].
    pub fn not_connected(provider: impl Into<String>) -> Self {
        Self::NotConnected {
            provider: provider.into(),
        }
    }
}
