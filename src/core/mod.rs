//! Execution state shared by the processors of one run, and the harness that
//! runs a single node in isolation.

pub mod debug;
pub mod execution_context;
pub mod redact;
pub mod runtime_context;

pub use debug::{DebugRequest, DebugResult, DebugRunner};
pub use execution_context::{
    CallbackSink, ExecutionContext, ImportedFile, LogEntry, LogLevel, LogSink,
};
pub use redact::{KeyRedactor, Redactor};
pub use runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    RuntimeContext, TimeProvider,
};
