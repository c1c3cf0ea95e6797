//! forge::traits
//!
//! The forge abstraction: the capabilities the engine consumes from a
//! code-review host.
//!
//! The trait is async because every operation is network I/O. Forge
//! failures never compromise local correctness: the orchestrator calls
//! the forge only after local metadata and refs are consistent, and
//! writes forge results back to cached metadata fields.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from forge operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Credentials missing or rejected. Distinct so the UI can point the
    /// user at re-authentication rather than a generic failure.
    #[error("forge authentication missing or rejected")]
    Unauthenticated,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited by the forge")]
    RateLimited,

    /// The API returned an error.
    #[error("forge API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network or connection failure.
    #[error("forge network error: {0}")]
    Network(String),
}

impl ForgeError {
    /// Whether a single retry of an idempotent call is reasonable.
    pub fn is_transient(&self) -> bool {
        matches!(self, ForgeError::Network(_) | ForgeError::RateLimited)
    }
}

/// State of a request on the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Open => write!(f, "open"),
            RequestState::Closed => write!(f, "closed"),
            RequestState::Merged => write!(f, "merged"),
        }
    }
}

/// A request as the forge reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Forge-assigned opaque id (GraphQL node id on GitHub).
    pub id: String,
    /// Request number.
    pub number: u64,
    /// Web permalink.
    pub permalink: String,
    /// Current state.
    pub state: RequestState,
    /// Whether the request is a draft.
    pub is_draft: bool,
    /// Head branch name.
    pub head: String,
    /// Base branch name.
    pub base: String,
    /// Title.
    pub title: String,
    /// Body text (description).
    pub body: String,
    /// The forge's recorded head commit, when reported.
    pub head_oid: Option<String>,
    /// The merge commit, when the request was merged.
    pub merge_commit: Option<String>,
}

/// Fields for creating a request.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Base branch name.
    pub base: String,
    /// Head branch name.
    pub head: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Create as draft.
    pub draft: bool,
}

/// Fields for updating a request; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    /// New base branch.
    pub base: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub body: Option<String>,
}

impl UpdateRequest {
    /// Whether the update would change anything.
    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.title.is_none() && self.body.is_none()
    }
}

/// The capabilities the engine consumes from a forge.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Forge name, e.g. "github".
    fn name(&self) -> &'static str;

    /// Find the request whose head is `head` and whose state is one of
    /// `states`. Returns the most recent match, or `None`.
    async fn get_request_for_branch(
        &self,
        head: &str,
        states: &[RequestState],
    ) -> Result<Option<Request>, ForgeError>;

    /// Fetch a request by number, including body and merge-commit data.
    async fn get_request(&self, number: u64) -> Result<Request, ForgeError>;

    /// Create a request.
    async fn create_request(&self, request: CreateRequest) -> Result<Request, ForgeError>;

    /// Update base, title, and/or body of a request.
    async fn update_request(
        &self,
        number: u64,
        update: UpdateRequest,
    ) -> Result<Request, ForgeError>;

    /// Convert a request to draft. `id` is the opaque request id.
    async fn convert_to_draft(&self, id: &str) -> Result<(), ForgeError>;

    /// Mark a draft request ready for review. `id` is the opaque id.
    async fn mark_ready(&self, id: &str) -> Result<(), ForgeError>;

    /// Add labels to a request.
    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(RequestState::Open.to_string(), "open");
        assert_eq!(RequestState::Closed.to_string(), "closed");
        assert_eq!(RequestState::Merged.to_string(), "merged");
    }

    #[test]
    fn transient_classification() {
        assert!(ForgeError::Network("reset".into()).is_transient());
        assert!(ForgeError::RateLimited.is_transient());
        assert!(!ForgeError::Unauthenticated.is_transient());
        assert!(!ForgeError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn empty_update_detected() {
        assert!(UpdateRequest::default().is_empty());
        let update = UpdateRequest {
            base: Some("main".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
