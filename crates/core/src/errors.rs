use thiserror::Error;

use crate::domain::rule::RuleMetric;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("no transaction data available for market basket analysis")]
    EmptyInput,
    #[error(
        "no frequent itemsets found at min_support {min_support}; try lowering the support threshold"
    )]
    NoFrequentItemsets { min_support: f64 },
    #[error(
        "no association rules met {metric} >= {min_threshold}; try lowering the rule threshold"
    )]
    NoRulesFound { metric: RuleMetric, min_threshold: f64 },
    #[error("no association rules found for item `{item_id}`")]
    NoMatchingRules { item_id: String },
    #[error("invalid mining parameter: {0}")]
    InvalidParameter(String),
    #[error("more than {limit} candidate itemsets generated at level {level}")]
    CandidateLimitExceeded { level: usize, limit: usize },
    #[error("mining deadline exceeded before level {level}")]
    DeadlineExceeded { level: usize },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Outcomes that mean "the data produced nothing", reported with `success=false`
    /// instead of as a failure.
    pub fn is_empty_outcome(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::NoFrequentItemsets { .. }
                | Self::NoRulesFound { .. }
                | Self::NoMatchingRules { .. }
        )
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Self::CandidateLimitExceeded { .. } | Self::DeadlineExceeded { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("mining run did not finish within {0} ms")]
    Timeout(u64),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id }
            }
            ApplicationError::Domain(error) if error.is_budget_exhausted() => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Timeout(millis) => Self::ServiceUnavailable {
                message: format!("mining run did not finish within {millis} ms"),
                correlation_id,
            },
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
