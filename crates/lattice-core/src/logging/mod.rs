//! 按 rank 的结构化日志：可插拔汇出口之上的空对象句柄。
//!
//! # 设计背景（Why）
//! - 并行程序里绝大多数 rank 应当沉默，否则输出被 N 份重复刷屏。把"沉默"
//!   做成一个合法的空日志器状态，应用代码就不必在每次记录前检查有没有
//!   日志器——空日志器吞掉一切并视为成功；
//! - 句柄引用计数：资源集合、运行时视图与应用可以共享同一底层汇出口，
//!   相等性按汇出口身份与标识符判断。
//!
//! # 契约说明（What）
//! - 低于阈值的消息被丢弃；阈值可在任何句柄上调整，共享同一状态的句柄
//!   同步可见；
//! - 空日志器上的所有操作都是成功的空操作。

mod factory;
mod sink;

pub use factory::LoggerFactory;
pub use sink::{ColourConsoleSink, FileSink, LogSink, StderrSink, StdoutSink, TracingSink};

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// 消息严重级别，低于日志器阈值的消息被丢弃。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

struct LoggerState {
    id: String,
    sink: Arc<dyn LogSink>,
    threshold: RwLock<Severity>,
}

/// 引用计数的日志器句柄；`None` 状态即空日志器。
///
/// ```
/// use lattice_core::{Logger, Severity};
/// use lattice_core::test_stubs::MemorySink;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::default());
/// let log = Logger::new("rank0", sink.clone());
/// log.set_severity(Severity::Warn);
/// log.debug("dropped");
/// log.error("kept");
/// assert_eq!(sink.messages().len(), 1);
///
/// Logger::null().critical("swallowed, successfully");
/// ```
#[derive(Clone)]
pub struct Logger {
    state: Option<Arc<LoggerState>>,
}

impl Logger {
    /// 空日志器：吞掉一切，永远成功。
    pub fn null() -> Self {
        Self { state: None }
    }

    /// 用标识符与汇出口构造日志器，默认阈值 `Info`。
    pub fn new(id: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            state: Some(Arc::new(LoggerState {
                id: id.into(),
                sink,
                threshold: RwLock::new(Severity::Info),
            })),
        }
    }

    /// 是否为空日志器。
    pub fn is_null(&self) -> bool {
        self.state.is_none()
    }

    /// 日志器标识符；空日志器为 `None`。
    pub fn identifier(&self) -> Option<&str> {
        self.state.as_deref().map(|s| s.id.as_str())
    }

    /// 当前阈值；空日志器为 `None`。
    pub fn severity(&self) -> Option<Severity> {
        self.state.as_deref().map(|s| *s.threshold.read())
    }

    /// 调整阈值。共享同一状态的所有句柄同步可见；空日志器上是空操作。
    pub fn set_severity(&self, severity: Severity) {
        if let Some(state) = self.state.as_deref() {
            *state.threshold.write() = severity;
        }
    }

    /// 按级别记录一条消息。低于阈值丢弃；空日志器吞掉一切。
    pub fn log(&self, severity: Severity, message: &str) {
        let Some(state) = self.state.as_deref() else { return };
        if severity < *state.threshold.read() {
            return;
        }
        state.sink.write(&state.id, severity, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(Severity::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    pub fn critical(&self, message: &str) {
        self.log(Severity::Critical, message);
    }

    /// 流式写出的替身：按 `Info` 级别记录。
    pub fn print(&self, message: &str) {
        self.info(message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        match (self.state.as_deref(), other.state.as_deref()) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(&a.sink, &b.sink) && a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for Logger {}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.as_deref() {
            None => f.write_str("Logger(null)"),
            Some(s) => f
                .debug_struct("Logger")
                .field("id", &s.id)
                .field("threshold", &*s.threshold.read())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::MemorySink;

    #[test]
    fn null_logger_swallows_everything() {
        let log = Logger::null();
        log.set_severity(Severity::Trace);
        log.critical("nobody hears this");
        assert!(log.is_null());
        assert_eq!(log.severity(), None);
        assert_eq!(log, Logger::default());
    }

    #[test]
    fn messages_below_the_threshold_are_dropped() {
        let sink = Arc::new(MemorySink::default());
        let log = Logger::new("t", sink.clone());
        log.set_severity(Severity::Warn);
        log.info("dropped");
        log.warn("kept");
        log.critical("kept too");
        assert_eq!(sink.messages(), vec!["[warn] t: kept", "[critical] t: kept too"]);
    }

    #[test]
    fn handles_share_threshold_state() {
        let sink = Arc::new(MemorySink::default());
        let a = Logger::new("shared", sink.clone());
        let b = a.clone();
        b.set_severity(Severity::Error);
        a.warn("dropped because the clone raised the bar");
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn equality_is_sink_identity_plus_identifier() {
        let sink = Arc::new(MemorySink::default());
        let a = Logger::new("x", sink.clone());
        let b = a.clone();
        let c = Logger::new("x", sink.clone());
        let d = Logger::new("x", Arc::new(MemorySink::default()));
        assert_eq!(a, b);
        assert_eq!(a, c, "same sink object and same identifier");
        assert_ne!(a, d, "distinct sink objects differ");
        assert_ne!(a, Logger::null());
    }
}
