use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Wall clock and id source used by an execution.
#[derive(Clone)]
pub struct RuntimeContext {
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_generator: Arc<dyn IdGenerator>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            time_provider: Arc::new(RealTimeProvider),
            id_generator: Arc::new(RealIdGenerator),
        }
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext").finish_non_exhaustive()
    }
}

impl RuntimeContext {
    pub fn new(time_provider: Arc<dyn TimeProvider>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            time_provider,
            id_generator,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.now()
    }

    pub fn next_id(&self) -> String {
        self.id_generator.next_id()
    }
}

pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

// --- Real implementations ---

#[derive(Debug, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Default)]
pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// --- Fake implementations ---

/// Returns a fixed instant, advancing by `step_millis` on every call.
pub struct FakeTimeProvider {
    pub start: DateTime<Utc>,
    pub step_millis: i64,
    calls: AtomicU64,
}

impl FakeTimeProvider {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, 0)
    }

    pub fn with_step(start: DateTime<Utc>, step_millis: i64) -> Self {
        Self {
            start,
            step_millis,
            calls: AtomicU64::new(0),
        }
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
        self.start + chrono::Duration::milliseconds(n.saturating_mul(self.step_millis))
    }
}

pub struct FakeIdGenerator {
    pub prefix: String,
    pub counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, id)
    }
}
