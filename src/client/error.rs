//! Errors returned by [`ResourceClient`](crate::client::ResourceClient).
//!
//! Every operation returns `Result<_, ResourceError>` so callers can tell an
//! absent row apart from an unreachable backend. Call sites that only want the
//! old "empty result on any failure" behavior use [`IntoSentinel`].

use thiserror::Error;

use crate::client::types::ResourceRecord;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Validation error: the {resource} field '{field}' is required")]
    Validation {
        resource: &'static str,
        field: &'static str,
    },

    #[error("Validation error: '{0}' is a reserved query parameter and cannot be used as a filter")]
    ReservedField(String),

    #[error("No {resource} found with ID {id}")]
    NotFound { resource: &'static str, id: i64 },

    #[error("HTTP error {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response from backend: {0}")]
    Decode(String),
}

impl ResourceError {
    /// Short machine-readable name of the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceError::Config(_) => "config",
            ResourceError::UnknownResource(_) => "unknown_resource",
            ResourceError::Validation { .. } | ResourceError::ReservedField(_) => "validation",
            ResourceError::NotFound { .. } => "not_found",
            ResourceError::Http { .. } => "http",
            ResourceError::Transport(_) => "transport",
            ResourceError::Decode(_) => "decode",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound { .. })
    }
}

impl From<serde_json::Error> for ResourceError {
    fn from(e: serde_json::Error) -> Self {
        ResourceError::Decode(e.to_string())
    }
}

pub type ResourceResult<T> = std::result::Result<T, ResourceError>;

fn log_discarded(error: &ResourceError) {
    if error.is_not_found() {
        tracing::warn!("{}", error);
    } else {
        tracing::error!("{}", error);
    }
}

/// Collapses an operation result into the "no data" value of its type:
/// an empty list, `None`, or `false`. The discarded error is logged.
pub trait IntoSentinel {
    type Output;

    fn into_sentinel(self) -> Self::Output;
}

impl IntoSentinel for ResourceResult<Vec<ResourceRecord>> {
    type Output = Vec<ResourceRecord>;

    fn into_sentinel(self) -> Self::Output {
        self.unwrap_or_else(|e| {
            log_discarded(&e);
            Vec::new()
        })
    }
}

impl IntoSentinel for ResourceResult<ResourceRecord> {
    type Output = Option<ResourceRecord>;

    fn into_sentinel(self) -> Self::Output {
        self.map_err(|e| log_discarded(&e)).ok()
    }
}

impl IntoSentinel for ResourceResult<()> {
    type Output = bool;

    fn into_sentinel(self) -> Self::Output {
        self.map_err(|e| log_discarded(&e)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let missing: ResourceResult<ResourceRecord> = Err(ResourceError::NotFound {
            resource: "client",
            id: 4,
        });
        assert_eq!(missing.into_sentinel(), None);

        let failed: ResourceResult<Vec<ResourceRecord>> =
            Err(ResourceError::Config("POSTGREST_URL is not set".to_string()));
        assert!(failed.into_sentinel().is_empty());

        let deleted: ResourceResult<()> = Ok(());
        assert!(deleted.into_sentinel());
    }

    #[test]
    fn test_messages_name_the_resource() {
        let err = ResourceError::Validation {
            resource: "client",
            field: "nombre",
        };
        assert_eq!(err.kind(), "validation");
        assert_eq!(
            err.to_string(),
            "Validation error: the client field 'nombre' is required"
        );
    }
}
