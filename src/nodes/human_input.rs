use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;

use crate::approval::{ApprovalRequest, ApprovalStatus};
use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{ApprovalConfig, Node};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::{EngineServices, NodeProcessor};
use crate::nodes::utils::render_field;

/// Approval node processor
///
/// Files a pending [`ApprovalRequest`] and returns a paused output carrying
/// its id. The run resumes once the request is decided elsewhere.
pub struct ApprovalProcessor {
    services: Arc<EngineServices>,
}

impl ApprovalProcessor {
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl NodeProcessor for ApprovalProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let cfg: ApprovalConfig = node.parse_config()?;
        let store = self.services.approvals()?;

        let title = if cfg.title.trim().is_empty() {
            node.name.clone()
        } else {
            render_field(ctx, "title", &cfg.title)
        };
        let description = cfg
            .description
            .as_deref()
            .map(|d| render_field(ctx, "description", d));
        let expires_at = match cfg.timeout_hours {
            Some(hours) => Some(
                i64::try_from(hours)
                    .ok()
                    .and_then(Duration::try_hours)
                    .and_then(|timeout| started_at.checked_add_signed(timeout))
                    .ok_or_else(|| NodeError::config("timeoutHours out of range"))?,
            ),
            None => None,
        };

        let request = ApprovalRequest {
            id: ctx.runtime().next_id(),
            execution_id: ctx.execution_id.clone(),
            workflow_id: ctx.workflow_id.clone(),
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            title: title.clone(),
            description,
            approvers: cfg.approvers.clone(),
            status: ApprovalStatus::Pending,
            created_at: started_at,
            expires_at,
        };
        let approval_id = store.create_request(request).await?;

        ctx.step_with_data(
            "approval",
            format!("Waiting for approval: {}", title),
            json!({"approvalRequestId": approval_id, "approvers": cfg.approvers}),
        );

        Ok(NodeOutput::paused(
            node,
            approval_id.clone(),
            json!({
                "approvalRequestId": approval_id,
                "title": title,
                "status": ApprovalStatus::Pending,
                "expiresAt": expires_at,
            }),
            started_at,
            ctx.now(),
        ))
    }
}
