//! CPU 剖析器：以任务为单元的墙钟与能耗计量。
//!
//! # 契约说明（What）
//! - [`Cpu::profile`] 吃进一个类型擦除的任务，返回不透明结果与剖析信息；
//! - [`Cpu::profile_call`] 是便捷形态：包装闭包、执行、拆封，一步到位；
//! - 能耗字段只在监控后端可用时携带数值，空操作替身下为 `None`。

use crate::error::Result;
use crate::hardware::energy;
use crate::task::{Erased, Task, make_task};
use std::time::{Duration, Instant};

/// 一次任务执行的剖析信息。字段会随剖析能力增长，调用方应按名取用。
#[derive(Clone, Debug)]
pub struct ProfileInformation {
    /// 任务的墙钟耗时。
    pub wall_time: Duration,
    /// 被剖析区间的能耗（微焦）；监控后端不可用时为 `None`。
    pub energy_microjoules: Option<u64>,
}

/// 当前进程可用的中央处理器的运行时句柄。
#[derive(Clone, Copy, Debug, Default)]
pub struct Cpu;

impl Cpu {
    /// 当前节点 CPU 的名义描述（核数、型号）。
    pub fn info(&self) -> crate::hardware::probe::CpuInfo {
        crate::hardware::probe::detect_cpu()
    }

    /// 剖析一个类型擦除的任务。
    ///
    /// 能耗监控包在计时器外侧，墙钟只覆盖任务本体。
    pub fn profile(&self, task: Task) -> (Erased, ProfileInformation) {
        let mut monitor = energy::default_monitor();
        monitor.start();
        let begin = Instant::now();
        let result = task.run();
        let wall_time = begin.elapsed();
        let energy_microjoules = monitor.stop();
        (result, ProfileInformation { wall_time, energy_microjoules })
    }

    /// 剖析一个闭包并拆封出强类型结果。
    ///
    /// ```
    /// use lattice_core::hardware::Cpu;
    ///
    /// let data = vec![1.0f64; 1024];
    /// let (sum, info) = Cpu.profile_call(move || data.iter().sum::<f64>()).unwrap();
    /// assert_eq!(sum, 1024.0);
    /// assert!(info.wall_time.as_nanos() > 0);
    /// ```
    pub fn profile_call<F, R>(&self, f: F) -> Result<(R, ProfileInformation)>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, unwrapper) = make_task(f);
        let (carrier, info) = self.profile(task);
        Ok((unwrapper.unwrap(carrier)?, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiling_returns_the_value_and_a_nonzero_wall_time() {
        let (value, info) = Cpu
            .profile_call(|| {
                std::thread::sleep(Duration::from_millis(2));
                21 * 2
            })
            .unwrap();
        assert_eq!(value, 42);
        assert!(info.wall_time >= Duration::from_millis(2));
    }

    #[test]
    fn unit_tasks_profile_cleanly() {
        let ((), info) = Cpu.profile_call(|| ()).unwrap();
        assert!(info.wall_time.as_nanos() < u128::MAX);
    }
}
