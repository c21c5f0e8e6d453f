use std::time::Duration;
use thiserror::Error;

use crate::lifecycle::ContainerState;

pub type Result<T> = std::result::Result<T, LifewireError>;

#[derive(Debug, Error)]
pub enum LifewireError {
    #[error("Duplicate provider for {type_name}: already provided by {existing}")]
    DuplicateProvider { type_name: String, existing: String },

    #[error("Missing type: {type_name} (required by {required_by})")]
    UnknownType {
        type_name: String,
        required_by: String,
    },

    #[error("Circular dependency detected: {cycle}")]
    CyclicDependency { cycle: String },

    #[error("Constructor {provider} failed: {source:#}")]
    ConstructorFailed {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invocation {invocation} failed: {source:#}")]
    InvocationFailed {
        invocation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("OnStart hook {hook} did not complete within {timeout:?}")]
    StartTimeout { hook: String, timeout: Duration },

    #[error("OnStart hook {hook} failed: {source:#}")]
    StartHookFailed {
        hook: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("OnStop hook {hook} did not complete within {timeout:?}")]
    StopTimeout { hook: String, timeout: Duration },

    #[error("OnStop hook {hook} failed: {source:#}")]
    StopHookFailed {
        hook: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} stop hook(s) failed: {}", .errors.len(), join_errors(.errors))]
    StopFailed { errors: Vec<LifewireError> },

    #[error("Cannot {action} while application is {state}")]
    InvalidLifecycleTransition {
        state: ContainerState,
        action: &'static str,
    },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },
}

impl LifewireError {
    pub(crate) fn invalid_transition(state: ContainerState, action: &'static str) -> Self {
        Self::InvalidLifecycleTransition { state, action }
    }

    /// Individual failures when this is an aggregated stop error, otherwise
    /// the error itself.
    pub fn errors(&self) -> &[LifewireError] {
        match self {
            Self::StopFailed { errors } => errors,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::StartTimeout { .. } | Self::StopTimeout { .. })
    }
}

fn join_errors(errors: &[LifewireError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
