use serde_json::Value;

use crate::core::execution_context::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::llm::AiConfig;
use crate::template::{substitute, unresolved_references};

use super::executor::EngineServices;

/// Substitute `template` and warn about every reference that rendered empty.
pub fn render_field(ctx: &mut ExecutionContext, field: &str, template: &str) -> String {
    let missing = unresolved_references(template, ctx);
    if !missing.is_empty() {
        ctx.warning(format!(
            "Unresolved references in {}: {}",
            field,
            missing.join(", ")
        ));
    }
    substitute(template, ctx)
}

/// Load the AI configuration a node asks for, falling back to the engine
/// default. Loaded configs are cached on the context so each id is fetched
/// at most once per run.
pub async fn load_ai_config(
    services: &EngineServices,
    requested: Option<&str>,
    default_id: Option<&str>,
    ctx: &mut ExecutionContext,
) -> NodeResult<AiConfig> {
    let config_id = requested
        .filter(|id| !id.is_empty())
        .or(default_id)
        .ok_or_else(|| NodeError::config("No AI configuration selected"))?
        .to_string();

    if let Some(cached) = ctx.ai_config(&config_id) {
        return Ok(cached.clone());
    }

    ctx.step("config", format!("Loading AI config {}", config_id));
    let loaded = services.ai_configs()?.load(&config_id).await?;
    Ok(ctx.cache_ai_config(loaded).clone())
}

/// Short description of a value for log lines.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("array({})", items.len()),
        Value::Object(map) => format!("object({} keys)", map.len()),
        Value::String(s) => format!("string({} chars)", s.chars().count()),
        other => other.to_string(),
    }
}
