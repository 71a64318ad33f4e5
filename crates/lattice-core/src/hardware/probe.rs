//! 硬件探测：为 RAM 描述符提供名义总量。
//!
//! 只在资源集合构造时调用一次，必须在每个 rank 上都能安全执行。读不到
//! `/proc/meminfo`（非 Linux 或受限容器）时返回 0，调用方会得到一个空的
//! RAM 描述符而不是错误。

use std::fs;

/// 解析 `MemTotal: <n> kB` 行，返回字节数。
fn parse_meminfo(content: &str) -> Option<u64> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kib: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}

/// 当前节点可见的物理内存总量（字节）；探测失败返回 0。
pub fn detect_total_ram() -> u64 {
    fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|content| parse_meminfo(&content))
        .unwrap_or(0)
}

/// 当前节点 CPU 的名义描述。
///
/// 与 RAM 描述符一样是名义信息：用于日志与资源汇报，不用于调度决策。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuInfo {
    /// 在线逻辑核数。
    pub logical_cores: usize,
    /// 处理器型号串；探测不到时为空。
    pub model_name: String,
}

fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut logical_cores = 0;
    let mut model_name = String::new();
    for line in content.lines() {
        if line.starts_with("processor") {
            logical_cores += 1;
        } else if model_name.is_empty()
            && let Some(rest) = line.strip_prefix("model name")
        {
            if let Some((_, name)) = rest.split_once(':') {
                model_name = name.trim().to_string();
            }
        }
    }
    CpuInfo { logical_cores, model_name }
}

/// 探测当前节点的 CPU 描述；读不到 `/proc/cpuinfo` 时回落到标准库的
/// 可用并行度。
pub fn detect_cpu() -> CpuInfo {
    match fs::read_to_string("/proc/cpuinfo") {
        Ok(content) => parse_cpuinfo(&content),
        Err(_) => CpuInfo {
            logical_cores: std::thread::available_parallelism().map_or(0, |n| n.get()),
            model_name: String::new(),
        },
    }
}
