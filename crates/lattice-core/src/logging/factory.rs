//! 日志器工厂：按名称或文件路径生产汇出口与日志器。
//!
//! 出厂默认遵循"rank 0 说话、其余 rank 沉默"：运行时视图在构造时向工厂
//! 要默认日志器，rank 0 得到彩色控制台，其余 rank 得到空日志器。彩色
//! 控制台汇出口是进程级单例，因此同一进程里两个默认日志器比较相等。

use crate::error::Result;
use crate::logging::sink::{
    ColourConsoleSink, FileSink, LogSink, StderrSink, StdoutSink, TracingSink,
};
use crate::logging::{Logger, Severity};
use lattice_substrate::Rank;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// 进程默认日志器的标识符。
const GLOBAL_LOGGER_ID: &str = "lattice";

/// 汇出口与日志器的出厂车间。
pub struct LoggerFactory;

impl LoggerFactory {
    fn shared_colour_sink() -> Arc<dyn LogSink> {
        static SINK: OnceLock<Arc<ColourConsoleSink>> = OnceLock::new();
        SINK.get_or_init(|| Arc::new(ColourConsoleSink)).clone()
    }

    /// 进程全局日志器的出厂默认：rank 0 彩色控制台，其余空日志器。
    pub fn default_global_logger(rank: Option<Rank>) -> Logger {
        match rank {
            Some(0) => Logger::new(GLOBAL_LOGGER_ID, Self::shared_colour_sink()),
            _ => Logger::null(),
        }
    }

    pub fn stdout_logger(id: impl Into<String>) -> Logger {
        Logger::new(id, Arc::new(StdoutSink))
    }

    pub fn stderr_logger(id: impl Into<String>) -> Logger {
        Logger::new(id, Arc::new(StderrSink))
    }

    /// 把记录转发给 tracing 生态的日志器。
    pub fn tracing_logger(id: impl Into<String>) -> Logger {
        Logger::new(id, Arc::new(TracingSink))
    }

    pub fn file_logger(id: impl Into<String>, path: impl AsRef<Path>) -> Result<Logger> {
        Ok(Logger::new(id, Arc::new(FileSink::create(path)?)))
    }

    /// 按名称取汇出口；未识别的名称按文件路径处理。
    pub fn sink_by_name(name: &str) -> Result<Arc<dyn LogSink>> {
        match name {
            "stdout" => Ok(Arc::new(StdoutSink)),
            "stderr" => Ok(Arc::new(StderrSink)),
            "colour" | "color" => Ok(Self::shared_colour_sink()),
            "tracing" => Ok(Arc::new(TracingSink)),
            path => Ok(Arc::new(FileSink::create(path)?)),
        }
    }

    /// 按名称组装日志器并设定初始阈值。
    pub fn logger_by_name(
        id: impl Into<String>,
        sink_name: &str,
        severity: Severity,
    ) -> Result<Logger> {
        let logger = Logger::new(id, Self::sink_by_name(sink_name)?);
        logger.set_severity(severity);
        Ok(logger)
    }
}
