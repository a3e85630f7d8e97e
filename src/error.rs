use thiserror::Error;

/// Errors raised by filter components.
///
/// Only [`FilterError::Evaluation`] is recovered inside a filtering pass.
/// Everything else reaches the caller of
/// [`AttributeFilterEngine::filter_attributes`](crate::filter::engine::AttributeFilterEngine::filter_attributes).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Invalid configuration detected while activating a component.
    #[error("component '{component}' is misconfigured: {message}")]
    Configuration { component: String, message: String },

    /// An evaluation method was called before the component was activated.
    #[error("component '{component}' has not been initialized")]
    Uninitialized { component: String },

    /// An evaluation method was called after the component was torn down.
    #[error("component '{component}' has been destroyed")]
    Destroyed { component: String },

    /// A rule or matcher could not be evaluated against this request.
    #[error("evaluation of '{component}' failed: {message}")]
    Evaluation { component: String, message: String },

    /// A matcher produced values that are not values of the prefiltered attribute.
    #[error("invariant violated for attribute '{attribute}': {message}")]
    InvariantViolation { attribute: String, message: String },
}

impl FilterError {
    pub fn configuration(component: &str, message: impl Into<String>) -> Self {
        FilterError::Configuration {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn evaluation(component: &str, message: impl Into<String>) -> Self {
        FilterError::Evaluation {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn invariant(attribute: &str, message: impl Into<String>) -> Self {
        FilterError::InvariantViolation {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// True for failures that a filtering pass contains locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FilterError::Evaluation { .. })
    }

    /// True for calls made outside a component's active lifetime.
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            FilterError::Uninitialized { .. } | FilterError::Destroyed { .. }
        )
    }
}

pub type FilterResult<T> = Result<T, FilterError>;
