//! Human approval gates.
//!
//! An APPROVAL node files an [`ApprovalRequest`] through an [`ApprovalStore`]
//! and pauses. Decisions arrive later, possibly racing the timeout sweep, so
//! every status change goes through [`ApprovalStatus::transition`], which only
//! lets a pending request move once.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Invalid approval transition: {from} -> {to}")]
    InvalidTransition {
        from: ApprovalStatus,
        to: ApprovalStatus,
    },
    #[error("Approval request not found: {0}")]
    NotFound(String),
    #[error("Approval store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Escalated,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Escalated => "escalated",
            ApprovalStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Move to `to`.
    ///
    /// Returns `Ok(true)` when the status changed and `Ok(false)` when it
    /// already was `to`. Any move out of a decided state is rejected, so a
    /// late sweep cannot overwrite a human decision or the reverse.
    pub fn transition(&mut self, to: ApprovalStatus) -> Result<bool, ApprovalError> {
        if *self == to {
            return Ok(false);
        }
        if self.is_terminal() || !to.is_terminal() {
            return Err(ApprovalError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(true)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub execution_id: String,
    pub workflow_id: String,
    pub node_id: String,
    pub node_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub approvers: Vec<String>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persistence for approval requests.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Store a new pending request and return its id.
    async fn create_request(&self, request: ApprovalRequest) -> Result<String, ApprovalError>;

    async fn get_request(&self, id: &str) -> Result<Option<ApprovalRequest>, ApprovalError>;

    /// Apply a decision, guarded by [`ApprovalStatus::transition`].
    async fn update_status(&self, id: &str, to: ApprovalStatus) -> Result<bool, ApprovalError>;
}

/// Process-local store, also used by tests.
#[derive(Default)]
pub struct InMemoryApprovalStore {
    requests: Mutex<HashMap<String, ApprovalRequest>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire every pending request whose deadline is at or before `now`.
    /// Returns the ids that this call expired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut requests = self.requests.lock().await;
        let mut expired = Vec::new();
        for request in requests.values_mut() {
            let overdue = request.expires_at.is_some_and(|at| at <= now);
            if overdue && !request.status.is_terminal() {
                if let Ok(true) = request.status.transition(ApprovalStatus::Expired) {
                    expired.push(request.id.clone());
                }
            }
        }
        expired
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn create_request(&self, request: ApprovalRequest) -> Result<String, ApprovalError> {
        let mut requests = self.requests.lock().await;
        if requests.contains_key(&request.id) {
            return Err(ApprovalError::Store(format!(
                "duplicate approval request id {}",
                request.id
            )));
        }
        let id = request.id.clone();
        requests.insert(id.clone(), request);
        Ok(id)
    }

    async fn get_request(&self, id: &str) -> Result<Option<ApprovalRequest>, ApprovalError> {
        Ok(self.requests.lock().await.get(id).cloned())
    }

    async fn update_status(&self, id: &str, to: ApprovalStatus) -> Result<bool, ApprovalError> {
        let mut requests = self.requests.lock().await;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| ApprovalError::NotFound(id.to_string()))?;
        request.status.transition(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(id: &str, expires_at: Option<DateTime<Utc>>) -> ApprovalRequest {
        ApprovalRequest {
            id: id.into(),
            execution_id: "e1".into(),
            workflow_id: "w1".into(),
            node_id: "n1".into(),
            node_name: "Gate".into(),
            title: "Ship it?".into(),
            description: None,
            approvers: vec!["alice".into()],
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_transition_from_pending() {
        for to in [
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
            ApprovalStatus::Escalated,
            ApprovalStatus::Expired,
        ] {
            let mut status = ApprovalStatus::Pending;
            assert!(!status.is_terminal());
            assert!(status.transition(to).unwrap());
            assert_eq!(status, to);
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_transition_is_idempotent() {
        let mut status = ApprovalStatus::Approved;
        assert!(!status.transition(ApprovalStatus::Approved).unwrap());
    }

    #[test]
    fn test_decided_request_cannot_move() {
        let mut status = ApprovalStatus::Approved;
        let err = status.transition(ApprovalStatus::Expired).unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
        assert_eq!(status, ApprovalStatus::Approved);

        let mut status = ApprovalStatus::Rejected;
        assert!(status.transition(ApprovalStatus::Pending).is_err());
    }

    #[tokio::test]
    async fn test_sweep_does_not_override_decision() {
        let store = InMemoryApprovalStore::new();
        let past = Utc::now() - Duration::hours(1);
        store.create_request(request("a1", Some(past))).await.unwrap();
        store.create_request(request("a2", Some(past))).await.unwrap();

        assert!(store.update_status("a1", ApprovalStatus::Approved).await.unwrap());
        let expired = store.expire_overdue(Utc::now()).await;
        assert_eq!(expired, vec!["a2".to_string()]);

        let a1 = store.get_request("a1").await.unwrap().unwrap();
        assert_eq!(a1.status, ApprovalStatus::Approved);
        assert!(store.update_status("a2", ApprovalStatus::Approved).await.is_err());
    }

    #[tokio::test]
    async fn test_update_unknown_request() {
        let store = InMemoryApprovalStore::new();
        let err = store.update_status("nope", ApprovalStatus::Approved).await.unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound(_)));
    }
}
