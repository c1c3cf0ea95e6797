//! forge::github
//!
//! GitHub implementation of the [`Forge`] trait.
//!
//! REST covers everything except draft toggling, which GitHub only
//! exposes through GraphQL mutations keyed by node id.
//!
//! Authentication is a bearer token with `repo` scope. Rate limiting is
//! reported as [`ForgeError::RateLimited`]; retrying is the caller's
//! decision.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{CreateRequest, Forge, ForgeError, Request, RequestState, UpdateRequest};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent value for API requests.
const USER_AGENT_VALUE: &str = "avstack-cli";

/// GitHub forge client.
#[derive(Debug, Clone)]
pub struct GitHubForge {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    api_base: String,
}

impl GitHubForge {
    /// Create a client for `owner/repo` on github.com.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a client against a custom API base (GitHub Enterprise).
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into(),
        }
    }

    /// Repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| ForgeError::Unauthenticated)?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_base)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::Api {
                status: status.as_u16(),
                message: format!("failed to parse response: {e}"),
            })
        } else {
            Err(Self::error_for(status, response).await)
        }
    }

    async fn error_for(status: StatusCode, response: Response) -> ForgeError {
        let message = response
            .json::<GitHubErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|e| e.to_string());

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::Unauthenticated,
            StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
                ForgeError::RateLimited
            }
            StatusCode::FORBIDDEN => ForgeError::Unauthenticated,
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            _ => ForgeError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn graphql(&self, query: String) -> Result<(), ForgeError> {
        let response = self
            .client
            .post(self.graphql_url())
            .headers(self.headers()?)
            .json(&GraphQlQuery { query })
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(status, response).await);
        }

        let body: GraphQlResponse = response.json().await.map_err(|e| ForgeError::Api {
            status: status.as_u16(),
            message: format!("failed to parse GraphQL response: {e}"),
        })?;
        if let Some(errors) = body.errors {
            if let Some(first) = errors.first() {
                return Err(ForgeError::Api {
                    status: 200,
                    message: first.message.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_request_for_branch(
        &self,
        head: &str,
        states: &[RequestState],
    ) -> Result<Option<Request>, ForgeError> {
        let url = self.repo_url("pulls");
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[
                ("head", format!("{}:{}", self.owner, head)),
                ("state", "all".to_string()),
                ("sort", "created".to_string()),
                ("direction", "desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        let pulls: Vec<GitHubPullRequest> = self.handle_response(response).await?;
        let found = pulls
            .into_iter()
            .map(Request::from)
            .find(|r| states.contains(&r.state));
        Ok(found)
    }

    async fn get_request(&self, number: u64) -> Result<Request, ForgeError> {
        let url = self.repo_url(&format!("pulls/{number}"));
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        let pull: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pull.into())
    }

    async fn create_request(&self, request: CreateRequest) -> Result<Request, ForgeError> {
        let url = self.repo_url("pulls");
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&CreatePullBody {
                title: &request.title,
                head: &request.head,
                base: &request.base,
                body: &request.body,
                draft: request.draft,
            })
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        let pull: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pull.into())
    }

    async fn update_request(
        &self,
        number: u64,
        update: UpdateRequest,
    ) -> Result<Request, ForgeError> {
        let url = self.repo_url(&format!("pulls/{number}"));
        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(&UpdatePullBody {
                title: update.title.as_deref(),
                body: update.body.as_deref(),
                base: update.base.as_deref(),
            })
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        let pull: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pull.into())
    }

    async fn convert_to_draft(&self, id: &str) -> Result<(), ForgeError> {
        self.graphql(format!(
            r#"mutation {{ convertPullRequestToDraft(input: {{pullRequestId: "{id}"}}) {{ pullRequest {{ isDraft }} }} }}"#
        ))
        .await
    }

    async fn mark_ready(&self, id: &str) -> Result<(), ForgeError> {
        self.graphql(format!(
            r#"mutation {{ markPullRequestReadyForReview(input: {{pullRequestId: "{id}"}}) {{ pullRequest {{ isDraft }} }} }}"#
        ))
        .await
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("issues/{number}/labels"));
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&AddLabelsBody { labels })
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::error_for(status, response).await)
        }
    }
}

// Wire types.

#[derive(Serialize)]
struct CreatePullBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
    draft: bool,
}

#[derive(Serialize)]
struct UpdatePullBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<&'a str>,
}

#[derive(Serialize)]
struct AddLabelsBody<'a> {
    labels: &'a [String],
}

#[derive(Serialize)]
struct GraphQlQuery {
    query: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct GitHubPullRequest {
    node_id: String,
    number: u64,
    html_url: String,
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    draft: bool,
    head: GitHubRef,
    base: GitHubBaseRef,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    merge_commit_sha: Option<String>,
}

#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    refname: String,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Deserialize)]
struct GitHubBaseRef {
    #[serde(rename = "ref")]
    refname: String,
}

impl From<GitHubPullRequest> for Request {
    fn from(pull: GitHubPullRequest) -> Self {
        let state = match (pull.state.as_str(), pull.merged_at.is_some()) {
            ("open", _) => RequestState::Open,
            (_, true) => RequestState::Merged,
            _ => RequestState::Closed,
        };
        // GitHub only populates merge_commit_sha meaningfully once merged.
        let merge_commit = if state == RequestState::Merged {
            pull.merge_commit_sha
        } else {
            None
        };
        Request {
            id: pull.node_id,
            number: pull.number,
            permalink: pull.html_url,
            state,
            is_draft: pull.draft,
            head: pull.head.refname,
            base: pull.base.refname,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
            head_oid: pull.head.sha,
            merge_commit,
        }
    }
}
