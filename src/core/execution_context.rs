//! Shared mutable state for one execution or debug run.
//!
//! An [`ExecutionContext`] is owned by exactly one run and is written by one
//! node at a time. Processors append log entries and fill the AI config
//! cache while they run; the caller inserts the returned [`NodeOutput`]
//! afterwards, which is what makes it visible to later nodes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::redact::{KeyRedactor, Redactor};
use super::runtime_context::RuntimeContext;
use crate::domain::execution::NodeOutput;
use crate::llm::AiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Step,
    Success,
    Warning,
    Error,
}

/// One structured entry of the user-facing log trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Already redacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Receives log entries as soon as they are recorded.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &LogEntry);
}

impl LogSink for mpsc::UnboundedSender<LogEntry> {
    fn emit(&self, entry: &LogEntry) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(entry.clone());
    }
}

/// Adapts a closure into a [`LogSink`].
pub struct CallbackSink<F>(pub F);

impl<F> LogSink for CallbackSink<F>
where
    F: Fn(&LogEntry) + Send + Sync,
{
    fn emit(&self, entry: &LogEntry) {
        (self.0)(entry)
    }
}

/// A file imported into the workflow, addressable by name from DATA nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedFile {
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Value,
}

pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow_id: String,
    pub organization_id: String,
    pub user_id: String,
    node_outputs: HashMap<String, NodeOutput>,
    names_by_id: HashMap<String, String>,
    global_variables: Map<String, Value>,
    ai_configs: HashMap<String, AiConfig>,
    logs: Vec<LogEntry>,
    imported_files: Vec<ImportedFile>,
    runtime: RuntimeContext,
    redactor: Arc<dyn Redactor>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("workflow_id", &self.workflow_id)
            .field("node_outputs", &self.node_outputs.keys().collect::<Vec<_>>())
            .field("logs", &self.logs.len())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub fn new(execution_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            organization_id: String::new(),
            user_id: String::new(),
            node_outputs: HashMap::new(),
            names_by_id: HashMap::new(),
            global_variables: Map::new(),
            ai_configs: HashMap::new(),
            logs: Vec::new(),
            imported_files: Vec::new(),
            runtime: RuntimeContext::default(),
            redactor: Arc::new(KeyRedactor::default()),
            log_sink: None,
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = organization_id.into();
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeContext) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn with_global_variables(mut self, variables: Map<String, Value>) -> Self {
        self.global_variables = variables;
        self
    }

    pub fn with_imported_files(mut self, files: Vec<ImportedFile>) -> Self {
        self.imported_files = files;
        self
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.runtime.now()
    }

    // ---- node outputs ----

    /// Record a finished node's output under its name.
    ///
    /// Names are not unique across a graph: a second node with the same
    /// name replaces the first one for `{{name...}}` resolution. The
    /// replaced output stays reachable through [`Self::output_by_id`] only
    /// until its id is reused.
    pub fn set_node_output(&mut self, output: NodeOutput) {
        if let Some(previous) = self.node_outputs.get(&output.node_name) {
            if previous.node_id != output.node_id {
                tracing::warn!(
                    execution_id = %self.execution_id,
                    node_name = %output.node_name,
                    previous_node_id = %previous.node_id,
                    node_id = %output.node_id,
                    "duplicate node name; later output overwrites earlier one"
                );
            }
        }
        self.names_by_id
            .insert(output.node_id.clone(), output.node_name.clone());
        self.node_outputs.insert(output.node_name.clone(), output);
    }

    pub fn node_output(&self, name: &str) -> Option<&NodeOutput> {
        self.node_outputs.get(name)
    }

    /// Look up an output by node id. Returns `None` when the id's output was
    /// overwritten by a different node sharing its name.
    pub fn output_by_id(&self, node_id: &str) -> Option<&NodeOutput> {
        let name = self.names_by_id.get(node_id)?;
        self.node_outputs
            .get(name)
            .filter(|output| output.node_id == node_id)
    }

    pub fn node_outputs(&self) -> &HashMap<String, NodeOutput> {
        &self.node_outputs
    }

    /// Name → data map of every recorded output.
    pub fn output_data(&self) -> Map<String, Value> {
        self.node_outputs
            .iter()
            .map(|(name, output)| (name.clone(), output.data.clone()))
            .collect()
    }

    // ---- globals ----

    pub fn global_variable(&self, name: &str) -> Option<&Value> {
        self.global_variables.get(name)
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: Value) {
        self.global_variables.insert(name.into(), value);
    }

    pub fn global_variables(&self) -> &Map<String, Value> {
        &self.global_variables
    }

    // ---- AI config cache ----

    pub fn ai_config(&self, config_id: &str) -> Option<&AiConfig> {
        self.ai_configs.get(config_id)
    }

    /// Cache a config. The first entry for an id wins.
    pub fn cache_ai_config(&mut self, config: AiConfig) -> &AiConfig {
        self.ai_configs.entry(config.id.clone()).or_insert(config)
    }

    // ---- imported files ----

    pub fn imported_files(&self) -> &[ImportedFile] {
        &self.imported_files
    }

    pub fn imported_file(&self, name: &str) -> Option<&ImportedFile> {
        self.imported_files.iter().find(|f| f.name == name)
    }

    // ---- logging ----

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.record(level, message.into(), None, None);
    }

    pub fn log_with_data(&mut self, level: LogLevel, message: impl Into<String>, data: Value) {
        self.record(level, message.into(), None, Some(data));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn step(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.record(LogLevel::Step, message.into(), Some(step.into()), None);
    }

    pub fn step_with_data(
        &mut self,
        step: impl Into<String>,
        message: impl Into<String>,
        data: Value,
    ) {
        self.record(LogLevel::Step, message.into(), Some(step.into()), Some(data));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    fn record(
        &mut self,
        level: LogLevel,
        message: String,
        step: Option<String>,
        data: Option<Value>,
    ) {
        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(execution_id = %self.execution_id, step = ?step, "{}", message)
            }
            LogLevel::Step => {
                tracing::debug!(execution_id = %self.execution_id, step = ?step, "{}", message)
            }
            LogLevel::Warning => {
                tracing::warn!(execution_id = %self.execution_id, step = ?step, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(execution_id = %self.execution_id, step = ?step, "{}", message)
            }
        }

        let entry = LogEntry {
            level,
            message,
            step,
            data: data.map(|d| self.redactor.redact(&d)),
            timestamp: self.runtime.now(),
        };
        if let Some(sink) = &self.log_sink {
            sink.emit(&entry);
        }
        self.logs.push(entry);
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }
}
