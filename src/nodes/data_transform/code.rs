use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{CodeConfig, Node};
use crate::error::NodeResult;
use crate::nodes::executor::{EngineServices, NodeProcessor};
use crate::nodes::utils::{describe, render_field};
use crate::sandbox::{SandboxError, SandboxRequest, DEFAULT_CODE_TIMEOUT};

/// Code node processor
///
/// Runs the script through the configured [`CodeSandbox`] with every
/// upstream output passed in as `inputs`, keyed by node name.
///
/// [`CodeSandbox`]: crate::sandbox::CodeSandbox
pub struct CodeProcessor {
    services: Arc<EngineServices>,
}

impl CodeProcessor {
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl NodeProcessor for CodeProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: CodeConfig = node.parse_config()?;
        let sandbox = self.services.sandbox()?;

        if !sandbox.supported_languages().contains(&config.language) {
            return Err(SandboxError::UnsupportedLanguage(config.language).into());
        }

        let code = render_field(ctx, "code", &config.code);
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CODE_TIMEOUT);

        ctx.step(
            "code",
            format!("Running {:?} script ({} bytes)", config.language, code.len()),
        );
        let result = sandbox
            .execute(SandboxRequest {
                code,
                language: config.language,
                inputs: Value::Object(ctx.output_data()),
                timeout,
            })
            .await?;

        for line in &result.logs {
            ctx.info(format!("console: {}", line));
        }
        ctx.success(format!(
            "Script finished in {}ms, returned {}",
            result.execution_time_ms,
            describe(&result.output)
        ));

        Ok(NodeOutput::success(
            node,
            json!({
                "result": result.output,
                "logs": result.logs,
                "executionTimeMs": result.execution_time_ms,
            }),
            started_at,
            ctx.now(),
        ))
    }
}
