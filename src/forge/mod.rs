//! forge
//!
//! Abstraction over the code-review host.
//!
//! The engine consumes the [`Forge`] trait; `github` is the production
//! implementation and `mock` the deterministic one for tests. `body`
//! owns the request-description wire format (stack summary + metadata
//! regions).

pub mod body;
pub mod github;
pub mod mock;
pub mod traits;

pub use body::{parse_body, serialize_body, BodyMetadata, StackEntry};
pub use github::GitHubForge;
pub use mock::MockForge;
pub use traits::{CreateRequest, Forge, ForgeError, Request, RequestState, UpdateRequest};

use crate::core::config::Config;
use crate::git::interface::parse_owner_repo;

/// Build the configured forge client for a repository.
///
/// # Errors
///
/// - [`ForgeError::Unauthenticated`] when no token is configured
/// - [`ForgeError::NotFound`] when the remote URL is not parseable
pub fn create_forge(config: &Config, remote_url: &str) -> Result<GitHubForge, ForgeError> {
    let token = config.forge_token().ok_or(ForgeError::Unauthenticated)?;
    let (owner, repo) = parse_owner_repo(remote_url)
        .ok_or_else(|| ForgeError::NotFound(format!("cannot parse remote url '{remote_url}'")))?;

    let host = config.forge_host();
    if host == "github.com" {
        Ok(GitHubForge::new(token, owner, repo))
    } else {
        Ok(GitHubForge::with_api_base(
            token,
            owner,
            repo,
            format!("https://{host}/api/v3"),
        ))
    }
}
