//! Error types for the Hive simulator

use std::fmt;

use thiserror::Error;

use crate::kind::ResourceKind;

/// Main error type for simulator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Target state is absent from the current configuration
    #[error("{kind} state {state} not found in configuration")]
    StateNotFound {
        /// Kind whose configuration was consulted
        kind: ResourceKind,
        /// Requested state name
        state: String,
    },

    /// Backing store could not be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid simulator configuration or request
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse error classification reported by the configuration API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Resource vanished; never fatal
    NotFound,
    /// Configuration no longer matches the resource's target state
    ConfigurationInconsistency,
    /// Transient store failure
    StoreUnavailable,
    /// Rejected configuration or request payload
    InvalidConfiguration,
    /// Anything else
    Internal,
}

impl ErrorClass {
    /// Stable identifier used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::ConfigurationInconsistency => "configuration-inconsistency",
            Self::StoreUnavailable => "store-unavailable",
            Self::InvalidConfiguration => "invalid-configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a state-not-found error
    pub fn state_not_found(kind: ResourceKind, state: impl Into<String>) -> Self {
        Self::StateNotFound {
            kind,
            state: state.into(),
        }
    }

    /// Create a store-unavailable error with the given message
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Kube(kube::Error::Api(ae)) if ae.code == 404 => ErrorClass::NotFound,
            Self::StateNotFound { .. } => ErrorClass::ConfigurationInconsistency,
            Self::StoreUnavailable(_) | Self::Kube(_) => ErrorClass::StoreUnavailable,
            Self::Validation(_) => ErrorClass::InvalidConfiguration,
            Self::Serialization(_) => ErrorClass::Internal,
        }
    }

    /// Whether a later reconciliation may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::ConfigurationInconsistency | ErrorClass::StoreUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // ==========================================================================
    // Story Tests: How failures are classified
    // ==========================================================================

    /// Story: a config reload removed the state a reconciliation was heading to
    ///
    /// The error names both the kind and the missing state, and the caller is
    /// told it can try again once the configuration is consistent.
    #[test]
    fn story_state_removed_during_reconciliation() {
        let err = Error::state_not_found(ResourceKind::ClusterDeployment, "Installing");
        assert_eq!(
            err.to_string(),
            "ClusterDeployment state Installing not found in configuration"
        );
        assert_eq!(err.class(), ErrorClass::ConfigurationInconsistency);
        assert!(err.is_retryable());
    }

    /// Story: an operator posts a probability of 1.5
    ///
    /// Invalid configuration is not something a retry will fix.
    #[test]
    fn story_invalid_configuration_is_not_retryable() {
        let err = Error::validation("AccountClaim failure scenario 0 probability must be 0.0-1.0");
        assert!(err.to_string().contains("validation error"));
        assert_eq!(err.class(), ErrorClass::InvalidConfiguration);
        assert!(!err.is_retryable());
    }

    /// Story: the API server answers 404 for a resource deleted mid-cycle
    #[test]
    fn story_kube_404_is_treated_as_not_found() {
        let err = Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "clusterdeployments \"gone\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert!(!err.is_retryable());
    }

    #[rstest]
    #[case::state(
        Error::state_not_found(ResourceKind::AccountClaim, "Gone"),
        "configuration-inconsistency"
    )]
    #[case::store(Error::store_unavailable("connection refused"), "store-unavailable")]
    #[case::validation(Error::validation("bad"), "invalid-configuration")]
    #[case::serialization(Error::serialization("bad json"), "internal")]
    fn test_class_identifiers(#[case] err: Error, #[case] expected: &str) {
        assert_eq!(err.class().as_str(), expected);
        assert_eq!(err.class().to_string(), expected);
    }

    #[test]
    fn test_store_unavailable_is_retryable() {
        assert!(Error::store_unavailable("timeout").is_retryable());
        assert!(!Error::validation("x").is_retryable());
    }
}
