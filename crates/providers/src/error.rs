use std::fmt;

use foundation::Handle;
use layers::FeatureKey;

use crate::catalog::ProviderId;

/// A rendering backend could not be loaded or brought up.
///
/// Recovered by showing a "map unavailable" placeholder; the rest of the
/// page keeps working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderInitError {
    ScriptUnavailable { provider: ProviderId, reason: String },
    MissingCredentials { provider: ProviderId },
    Backend { provider: ProviderId, message: String },
}

impl ProviderInitError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderInitError::ScriptUnavailable { provider, .. }
            | ProviderInitError::MissingCredentials { provider }
            | ProviderInitError::Backend { provider, .. } => *provider,
        }
    }

    /// Re-attributes the error to `provider`; backends shared between
    /// providers do not know which one they serve.
    pub fn for_provider(self, provider: ProviderId) -> Self {
        match self {
            ProviderInitError::ScriptUnavailable { reason, .. } => {
                ProviderInitError::ScriptUnavailable { provider, reason }
            }
            ProviderInitError::MissingCredentials { .. } => {
                ProviderInitError::MissingCredentials { provider }
            }
            ProviderInitError::Backend { message, .. } => {
                ProviderInitError::Backend { provider, message }
            }
        }
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderInitError::ScriptUnavailable { provider, reason } => {
                write!(f, "{provider} script could not be loaded: {reason}")
            }
            ProviderInitError::MissingCredentials { provider } => {
                write!(f, "{provider} requires an API key")
            }
            ProviderInitError::Backend { provider, message } => {
                write!(f, "{provider} failed to initialize: {message}")
            }
        }
    }
}

impl std::error::Error for ProviderInitError {}

/// Misuse of the adapter lifecycle, or a failed initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    NotInitialized(Handle),
    Disposed(Handle),
    UnknownFeature(FeatureKey),
    Init(ProviderInitError),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::NotInitialized(handle) => {
                write!(f, "map handle {handle} was never initialized")
            }
            AdapterError::Disposed(handle) => write!(f, "map handle {handle} is disposed"),
            AdapterError::UnknownFeature(key) => write!(f, "no rendered feature {key}"),
            AdapterError::Init(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdapterError::Init(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderInitError> for AdapterError {
    fn from(err: ProviderInitError) -> Self {
        AdapterError::Init(err)
    }
}
