//! 能耗监控：剖析区间的可选计量。
//!
//! # 设计背景（Why）
//! - 能耗计数器是平台设施（RAPL），并非处处可用；剖析器的 API 不应随
//!   平台变化。监控器因此是一个特征：RAPL 后端由 `energy-rapl` 特性开关
//!   启用，空操作替身始终存在。
//!
//! # 契约说明（What）
//! - `start`/`stop` 包住被剖析区间；`stop` 返回区间能耗（微焦），不可用
//!   时返回 `None`；
//! - 监控器通过自己的通道（`lattice::energy` 目标的 tracing 事件）上报，
//!   剖析信息里只带数值。

/// 剖析区间的能耗计量契约。
pub trait EnergyMonitor {
    /// 该监控器是否真的在计量。
    fn is_active(&self) -> bool;

    /// 进入被剖析区间。
    fn start(&mut self);

    /// 离开被剖析区间，返回区间能耗（微焦）。
    fn stop(&mut self) -> Option<u64>;
}

/// 空操作替身：没有计量后端时剖析照常进行。
#[derive(Debug, Default)]
pub struct NoopEnergyMonitor;

impl EnergyMonitor for NoopEnergyMonitor {
    fn is_active(&self) -> bool {
        false
    }

    fn start(&mut self) {}

    fn stop(&mut self) -> Option<u64> {
        None
    }
}

#[cfg(feature = "energy-rapl")]
mod rapl {
    use super::EnergyMonitor;
    use std::fs;

    const RAPL_COUNTER: &str = "/sys/class/powercap/intel-rapl:0/energy_uj";

    /// 基于 RAPL powercap 计数器的监控器。
    ///
    /// 计数器是累加值，区间能耗取两次读数之差；计数器回绕或读取失败时
    /// 放弃本次计量而不是报错——能耗是剖析的旁路信息。
    #[derive(Debug, Default)]
    pub struct RaplEnergyMonitor {
        started_uj: Option<u64>,
    }

    fn read_counter() -> Option<u64> {
        fs::read_to_string(RAPL_COUNTER).ok()?.trim().parse().ok()
    }

    impl EnergyMonitor for RaplEnergyMonitor {
        fn is_active(&self) -> bool {
            read_counter().is_some()
        }

        fn start(&mut self) {
            self.started_uj = read_counter();
        }

        fn stop(&mut self) -> Option<u64> {
            let begin = self.started_uj.take()?;
            let end = read_counter()?;
            let delta = end.checked_sub(begin)?;
            tracing::info!(target: "lattice::energy", microjoules = delta, "profiled region energy");
            Some(delta)
        }
    }
}

#[cfg(feature = "energy-rapl")]
pub use rapl::RaplEnergyMonitor;

/// 剖析器取默认监控器：特性开启用 RAPL，否则用空操作替身。
pub(crate) fn default_monitor() -> Box<dyn EnergyMonitor> {
    #[cfg(feature = "energy-rapl")]
    {
        Box::new(RaplEnergyMonitor::default())
    }
    #[cfg(not(feature = "energy-rapl"))]
    {
        Box::new(NoopEnergyMonitor)
    }
}
