use thiserror::Error;

/// Errors that can arise while constructing or validating domain values,
/// independent of any particular storage or transport.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("project key must be non-empty")]
    EmptyProjectKey,

    #[error("issue key must be non-empty")]
    EmptyIssueKey,

    #[error("limit must be greater than zero")]
    ZeroLimit,
}
