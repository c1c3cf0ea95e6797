//! forge::mock
//!
//! In-memory forge implementation for deterministic tests.
//!
//! Stores requests in memory, records every operation for later
//! verification, and can be told to fail a specific method to exercise
//! error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{CreateRequest, Forge, ForgeError, Request, RequestState, UpdateRequest};

/// Which operation should fail, and how.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRequestForBranch(ForgeError),
    GetRequest(ForgeError),
    CreateRequest(ForgeError),
    UpdateRequest(ForgeError),
    SetDraft(ForgeError),
    AddLabels(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRequestForBranch { head: String },
    GetRequest { number: u64 },
    CreateRequest { head: String, base: String, draft: bool },
    UpdateRequest { number: u64, base: Option<String>, body_updated: bool },
    ConvertToDraft { id: String },
    MarkReady { id: String },
    AddLabels { number: u64, labels: Vec<String> },
}

#[derive(Debug, Default)]
struct MockInner {
    requests: HashMap<u64, Request>,
    next_number: u64,
    fail_on: Option<FailOn>,
    /// When set, the named operation fails once and then succeeds.
    fail_once: bool,
    operations: Vec<MockOperation>,
}

/// Mock forge; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForge {
    /// A fresh, empty mock.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                next_number: 1,
                ..Default::default()
            })),
        }
    }

    /// Seed an existing request.
    pub fn seed(&self, request: Request) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_number = inner.next_number.max(request.number + 1);
        inner.requests.insert(request.number, request);
    }

    /// Configure one method to fail.
    pub fn fail_on(&self, fail: FailOn) {
        self.inner.lock().unwrap().fail_on = Some(fail);
    }

    /// Configure one method to fail exactly once, then recover.
    pub fn fail_once(&self, fail: FailOn) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = Some(fail);
        inner.fail_once = true;
    }

    /// Everything that was called, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Fetch current request state for assertions.
    pub fn request(&self, number: u64) -> Option<Request> {
        self.inner.lock().unwrap().requests.get(&number).cloned()
    }

    /// Mark a seeded request merged with the given merge commit, as the
    /// forge would after a squash-merge.
    pub fn merge_request(&self, number: u64, merge_commit: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(request) = inner.requests.get_mut(&number) {
            request.state = RequestState::Merged;
            request.merge_commit = Some(merge_commit.to_string());
        }
    }

    fn take_failure<F>(&self, matcher: F) -> Option<ForgeError>
    where
        F: Fn(&FailOn) -> Option<&ForgeError>,
    {
        let mut inner = self.inner.lock().unwrap();
        let error = inner.fail_on.as_ref().and_then(&matcher).cloned();
        if error.is_some() && inner.fail_once {
            inner.fail_on = None;
            inner.fail_once = false;
        }
        error
    }

    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_request_for_branch(
        &self,
        head: &str,
        states: &[RequestState],
    ) -> Result<Option<Request>, ForgeError> {
        self.record(MockOperation::GetRequestForBranch {
            head: head.to_string(),
        });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::GetRequestForBranch(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<&Request> = inner
            .requests
            .values()
            .filter(|r| r.head == head && states.contains(&r.state))
            .collect();
        matches.sort_by_key(|r| std::cmp::Reverse(r.number));
        Ok(matches.first().map(|r| (*r).clone()))
    }

    async fn get_request(&self, number: u64) -> Result<Request, ForgeError> {
        self.record(MockOperation::GetRequest { number });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::GetRequest(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        self.inner
            .lock()
            .unwrap()
            .requests
            .get(&number)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("request #{number}")))
    }

    async fn create_request(&self, request: CreateRequest) -> Result<Request, ForgeError> {
        self.record(MockOperation::CreateRequest {
            head: request.head.clone(),
            base: request.base.clone(),
            draft: request.draft,
        });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::CreateRequest(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        let mut inner = self.inner.lock().unwrap();
        let number = inner.next_number;
        inner.next_number += 1;
        let created = Request {
            id: format!("MOCK_{number}"),
            number,
            permalink: format!("https://forge.example/pull/{number}"),
            state: RequestState::Open,
            is_draft: request.draft,
            head: request.head,
            base: request.base,
            title: request.title,
            body: request.body,
            head_oid: None,
            merge_commit: None,
        };
        inner.requests.insert(number, created.clone());
        Ok(created)
    }

    async fn update_request(
        &self,
        number: u64,
        update: UpdateRequest,
    ) -> Result<Request, ForgeError> {
        self.record(MockOperation::UpdateRequest {
            number,
            base: update.base.clone(),
            body_updated: update.body.is_some(),
        });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::UpdateRequest(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        let mut inner = self.inner.lock().unwrap();
        let request = inner
            .requests
            .get_mut(&number)
            .ok_or_else(|| ForgeError::NotFound(format!("request #{number}")))?;
        if let Some(base) = update.base {
            request.base = base;
        }
        if let Some(title) = update.title {
            request.title = title;
        }
        if let Some(body) = update.body {
            request.body = body;
        }
        Ok(request.clone())
    }

    async fn convert_to_draft(&self, id: &str) -> Result<(), ForgeError> {
        self.record(MockOperation::ConvertToDraft { id: id.to_string() });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::SetDraft(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        let mut inner = self.inner.lock().unwrap();
        for request in inner.requests.values_mut() {
            if request.id == id {
                request.is_draft = true;
                return Ok(());
            }
        }
        Err(ForgeError::NotFound(format!("request id {id}")))
    }

    async fn mark_ready(&self, id: &str) -> Result<(), ForgeError> {
        self.record(MockOperation::MarkReady { id: id.to_string() });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::SetDraft(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        let mut inner = self.inner.lock().unwrap();
        for request in inner.requests.values_mut() {
            if request.id == id {
                request.is_draft = false;
                return Ok(());
            }
        }
        Err(ForgeError::NotFound(format!("request id {id}")))
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), ForgeError> {
        self.record(MockOperation::AddLabels {
            number,
            labels: labels.to_vec(),
        });
        if let Some(error) = self.take_failure(|f| match f {
            FailOn::AddLabels(e) => Some(e),
            _ => None,
        }) {
            return Err(error);
        }
        if self.inner.lock().unwrap().requests.contains_key(&number) {
            Ok(())
        } else {
            Err(ForgeError::NotFound(format!("request #{number}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(head: &str) -> CreateRequest {
        CreateRequest {
            base: "main".into(),
            head: head.into(),
            title: format!("Add {head}"),
            body: String::new(),
            draft: false,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers() {
        let forge = MockForge::new();
        let first = forge.create_request(create("feat-1")).await.unwrap();
        let second = forge.create_request(create("feat-2")).await.unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.state, RequestState::Open);
    }

    #[tokio::test]
    async fn find_by_head_filters_state() {
        let forge = MockForge::new();
        let request = forge.create_request(create("feat-1")).await.unwrap();
        forge.merge_request(request.number, &"a".repeat(40));

        let open = forge
            .get_request_for_branch("feat-1", &[RequestState::Open])
            .await
            .unwrap();
        assert!(open.is_none());

        let merged = forge
            .get_request_for_branch("feat-1", &[RequestState::Merged])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.merge_commit, Some("a".repeat(40)));
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let forge = MockForge::new();
        let request = forge.create_request(create("feat-1")).await.unwrap();

        let updated = forge
            .update_request(
                request.number,
                UpdateRequest {
                    base: Some("feat-0".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.base, "feat-0");
        assert_eq!(updated.title, "Add feat-1");
    }

    #[tokio::test]
    async fn draft_toggling_by_id() {
        let forge = MockForge::new();
        let request = forge.create_request(create("feat-1")).await.unwrap();

        forge.convert_to_draft(&request.id).await.unwrap();
        assert!(forge.request(request.number).unwrap().is_draft);

        forge.mark_ready(&request.id).await.unwrap();
        assert!(!forge.request(request.number).unwrap().is_draft);
    }

    #[tokio::test]
    async fn fail_once_recovers() {
        let forge = MockForge::new();
        let request = forge.create_request(create("feat-1")).await.unwrap();
        forge.fail_once(FailOn::UpdateRequest(ForgeError::Network("reset".into())));

        let first = forge
            .update_request(request.number, UpdateRequest::default())
            .await;
        assert!(first.is_err());

        let second = forge
            .update_request(request.number, UpdateRequest::default())
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn operations_are_recorded_in_order() {
        let forge = MockForge::new();
        forge.create_request(create("feat-1")).await.unwrap();
        forge.get_request(1).await.unwrap();

        let ops = forge.operations();
        assert!(matches!(ops[0], MockOperation::CreateRequest { .. }));
        assert_eq!(ops[1], MockOperation::GetRequest { number: 1 });
    }
}
