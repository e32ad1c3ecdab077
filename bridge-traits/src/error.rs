use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Error reported by the aggregation provider's API (bad request, item
    /// login required, product not ready, rate limit, ...).
    #[error("Provider API error [{code}]: {message}")]
    ProviderApi { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Convenience constructor for provider API errors.
    pub fn provider_api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderApi {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised by the provider API itself rather than
    /// by the transport or the host bridge.
    pub fn is_provider_api(&self) -> bool {
        matches!(self, Self::ProviderApi { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
