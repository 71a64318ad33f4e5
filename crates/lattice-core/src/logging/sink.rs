//! 日志汇出口：把一条已通过阈值的记录真正写出去。
//!
//! 汇出口是协作方：核心只依赖 [`LogSink`] 这一个契约。内建提供标准流、
//! 彩色控制台、文件与 tracing 桥接四类；应用可以自带实现。

use crate::error::{CoreError, ErrorCategory, Result, codes};
use crate::logging::Severity;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// 汇出口契约。实现必须可跨线程共享；写出失败自行吞下（日志不反噬程序）。
pub trait LogSink: Send + Sync {
    fn write(&self, id: &str, severity: Severity, message: &str);
}

/// 标准输出汇出口。
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        println!("[{severity}] {id}: {message}");
    }
}

/// 标准错误汇出口。
#[derive(Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        eprintln!("[{severity}] {id}: {message}");
    }
}

/// 彩色控制台汇出口：级别着色的标准输出，rank 0 的出厂默认。
#[derive(Debug, Default)]
pub struct ColourConsoleSink;

impl ColourConsoleSink {
    fn colour(severity: Severity) -> &'static str {
        match severity {
            Severity::Trace => "\x1b[90m",
            Severity::Debug => "\x1b[36m",
            Severity::Info => "\x1b[32m",
            Severity::Warn => "\x1b[33m",
            Severity::Error => "\x1b[31m",
            Severity::Critical => "\x1b[1;31m",
        }
    }
}

impl LogSink for ColourConsoleSink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        let colour = Self::colour(severity);
        println!("{colour}[{severity}]\x1b[0m {id}: {message}");
    }
}

/// 文件汇出口：串行化追加写。
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// 以追加模式打开（不存在则创建）目标文件。
    ///
    /// 打开失败是后端设施故障（路径缺失、权限不足），归入 `Substrate`
    /// 分类并保留 I/O 根因。
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref()).map_err(
            |e| {
                CoreError::new(
                    codes::LOG_SINK_OPEN,
                    ErrorCategory::Substrate,
                    format!("cannot open log file {}", path.as_ref().display()),
                )
                .with_cause(e)
            },
        )?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl LogSink for FileSink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        let mut file = self.file.lock();
        // 日志写失败不反噬程序，静默丢弃这一条。
        let _ = writeln!(file, "[{severity}] {id}: {message}");
    }
}

/// tracing 桥接汇出口：把记录转发为对应级别的 tracing 事件。
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        match severity {
            Severity::Trace => tracing::trace!(target: "lattice::log", id, message),
            Severity::Debug => tracing::debug!(target: "lattice::log", id, message),
            Severity::Info => tracing::info!(target: "lattice::log", id, message),
            Severity::Warn => tracing::warn!(target: "lattice::log", id, message),
            Severity::Error => tracing::error!(target: "lattice::log", id, message),
            Severity::Critical => {
                tracing::error!(target: "lattice::log", id, message, critical = true)
            }
        }
    }
}
