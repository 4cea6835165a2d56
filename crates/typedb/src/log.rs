//! Structured logging with field redaction.
//!
//! Every execution path emits events through a [`Logger`]. The logger
//! attached to a `Db` handle takes precedence over the process-wide default
//! installed with [`set_default_logger`]; absent both, events go to
//! `tracing`. Redaction happens before an event reaches any logger, so a
//! custom sink never sees a sensitive value.

use std::sync::{Arc, OnceLock, RwLock};

/// Structured log sink.
///
/// Fields arrive pre-rendered; values flagged `nolog` at registration (or
/// bound with `Param::redacted`) have already been replaced by the sentinel.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str, fields: &[(&'static str, String)]);
    fn info(&self, msg: &str, fields: &[(&'static str, String)]);
    fn error(&self, msg: &str, fields: &[(&'static str, String)]);
}

/// Default sink forwarding to the `tracing` ecosystem.
pub struct TracingLogger;

fn render(fields: &[(&'static str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[(&'static str, String)]) {
        tracing::debug!(target: "typedb", fields = %render(fields), "{msg}");
    }

    fn info(&self, msg: &str, fields: &[(&'static str, String)]) {
        tracing::info!(target: "typedb", fields = %render(fields), "{msg}");
    }

    fn error(&self, msg: &str, fields: &[(&'static str, String)]) {
        tracing::error!(target: "typedb", fields = %render(fields), "{msg}");
    }
}

static DEFAULT_LOGGER: OnceLock<RwLock<Arc<dyn Logger>>> = OnceLock::new();

fn default_cell() -> &'static RwLock<Arc<dyn Logger>> {
    DEFAULT_LOGGER.get_or_init(|| RwLock::new(Arc::new(TracingLogger)))
}

/// Install the process-wide default logger.
///
/// A logger attached to a specific `Db` handle still takes precedence for
/// calls made through that handle.
pub fn set_default_logger(logger: Arc<dyn Logger>) {
    *default_cell().write().expect("logger lock poisoned") = logger;
}

/// The current process-wide default logger.
pub fn default_logger() -> Arc<dyn Logger> {
    default_cell().read().expect("logger lock poisoned").clone()
}

/// Per-handle logging switches.
///
/// Query text and argument logging toggle independently; `enabled: false`
/// suppresses debug events entirely (error and transaction-boundary info
/// events are always emitted through the configured sink).
#[derive(Debug, Clone, Copy)]
pub struct LogFlags {
    pub enabled: bool,
    pub queries: bool,
    pub args: bool,
}

impl Default for LogFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            queries: true,
            args: true,
        }
    }
}

/// A captured log event, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub msg: String,
    pub fields: Vec<(String, String)>,
}

impl Event {
    /// The value of a field by key, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory [`Logger`] collecting events per level.
#[derive(Default)]
pub struct MemoryLogger {
    inner: RwLock<MemoryEvents>,
}

#[derive(Default)]
struct MemoryEvents {
    debugs: Vec<Event>,
    infos: Vec<Event>,
    errors: Vec<Event>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn debugs(&self) -> Vec<Event> {
        self.inner.read().expect("logger lock").debugs.clone()
    }

    pub fn infos(&self) -> Vec<Event> {
        self.inner.read().expect("logger lock").infos.clone()
    }

    pub fn errors(&self) -> Vec<Event> {
        self.inner.read().expect("logger lock").errors.clone()
    }

    /// All events across levels, in no particular order between levels.
    pub fn all(&self) -> Vec<Event> {
        let inner = self.inner.read().expect("logger lock");
        inner
            .debugs
            .iter()
            .chain(&inner.infos)
            .chain(&inner.errors)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("logger lock");
        inner.debugs.clear();
        inner.infos.clear();
        inner.errors.clear();
    }
}

fn to_event(msg: &str, fields: &[(&'static str, String)]) -> Event {
    Event {
        msg: msg.to_string(),
        fields: fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect(),
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, msg: &str, fields: &[(&'static str, String)]) {
        self.inner
            .write()
            .expect("logger lock")
            .debugs
            .push(to_event(msg, fields));
    }

    fn info(&self, msg: &str, fields: &[(&'static str, String)]) {
        self.inner
            .write()
            .expect("logger lock")
            .infos
            .push(to_event(msg, fields));
    }

    fn error(&self, msg: &str, fields: &[(&'static str, String)]) {
        self.inner
            .write()
            .expect("logger lock")
            .errors
            .push(to_event(msg, fields));
    }
}
