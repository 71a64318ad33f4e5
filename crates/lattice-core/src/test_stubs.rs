//! 官方测试桩：集中维护的最小替身，供单元测试、集成测试与示例复用。
//!
//! 契约演进时在这里单点更新，避免各处重复定义零散的桩对象。

use crate::logging::{LogSink, Severity};
use parking_lot::Mutex;

/// 把记录累积在内存里的汇出口，测试用。
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    /// 到目前为止写出的全部记录。
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().clone()
    }
}

impl LogSink for MemorySink {
    fn write(&self, id: &str, severity: Severity, message: &str) {
        self.records.lock().push(format!("[{severity}] {id}: {message}"));
    }
}
