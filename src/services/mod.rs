pub mod directions;
pub mod fleet;
pub mod geocoding;

use thiserror::Error;

/// Failure of an outbound call to one of the consumed services.
///
/// Navigation-path callers degrade silently on any variant; action-path
/// callers surface `Api` messages to the user.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: String },

    #[error("directions service returned no routes")]
    NoRoute,

    #[error("geocoding returned no candidates")]
    NoCandidates,

    #[error("{service} request failed ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },
}

impl ProviderError {
    /// Message suitable for showing to the user, preferring whatever the
    /// upstream service said.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
