//! 资源集合：一个 rank 的本地资源视图。
//!
//! # 契约说明（What）
//! - 空资源集合（默认构造或被移走）`rank()` 为 `None`；
//! - 访问器的失败面：`ram()` 在没有 RAM 描述符时报缺失状态；两个日志器
//!   访问器只在整个状态缺失时失败，拿着空日志器的资源集合永不失败；
//! - 相等性覆盖 rank、RAM、通信器与两个日志器。

use crate::comm::Communicator;
use crate::error::{CoreError, Result, codes};
use crate::hardware::Ram;
use crate::logging::Logger;
use lattice_substrate::Rank;
use std::fmt;

#[derive(Clone)]
struct ResourceSetPimpl {
    rank: Rank,
    ram: Ram,
    comm: Communicator,
    progress: Logger,
    debug: Logger,
}

/// 一个 rank 的资源集合：`(rank, RAM, 进度日志器, 调试日志器, 通信器)`。
///
/// # 设计背景（Why）
/// - 应用通过资源集合发现"我是谁、我有什么"：`is_mine` 把 rank 与通信器的
///   本进程身份对上，RAM 描述符把以我为根的集合操作路由到正确的 rank；
/// - 两个日志器各司其职：进度日志器面向科学输出（缺省只在 rank 0 出声），
///   调试日志器面向排障（缺省沉默），都可以整体替换。
pub struct ResourceSet {
    pimpl: Option<Box<ResourceSetPimpl>>,
}

impl ResourceSet {
    /// 空资源集合。
    pub fn null() -> Self {
        Self { pimpl: None }
    }

    pub(crate) fn new(
        rank: Rank,
        ram: Ram,
        comm: Communicator,
        progress: Logger,
        debug: Logger,
    ) -> Self {
        Self { pimpl: Some(Box::new(ResourceSetPimpl { rank, ram, comm, progress, debug })) }
    }

    fn pimpl(&self) -> Result<&ResourceSetPimpl> {
        self.pimpl.as_deref().ok_or_else(|| {
            CoreError::missing_state(codes::RESOURCE_SET_NULL, "resource set holds no state")
        })
    }

    fn pimpl_mut(&mut self) -> Result<&mut ResourceSetPimpl> {
        self.pimpl.as_deref_mut().ok_or_else(|| {
            CoreError::missing_state(codes::RESOURCE_SET_NULL, "resource set holds no state")
        })
    }

    /// 该资源集合对应的 rank；空资源集合为 `None` 哨兵。
    pub fn rank(&self) -> Option<Rank> {
        self.pimpl.as_deref().map(|p| p.rank)
    }

    /// 该资源集合是否属于当前进程。
    pub fn is_mine(&self) -> bool {
        self.pimpl.as_deref().is_some_and(|p| p.comm.me() == Some(p.rank))
    }

    /// 是否携带非空的 RAM 描述符。
    pub fn has_ram(&self) -> bool {
        self.pimpl.as_deref().is_some_and(|p| !p.ram.empty())
    }

    /// RAM 描述符；缺失时报缺失状态错误。
    pub fn ram(&self) -> Result<&Ram> {
        let p = self.pimpl()?;
        if p.ram.empty() {
            return Err(CoreError::missing_state(
                codes::RESOURCE_SET_NO_RAM,
                "resource set has no RAM descriptor",
            ));
        }
        Ok(&p.ram)
    }

    /// 进度日志器。只在整个状态缺失时失败；空日志器是合法返回。
    pub fn progress_logger(&self) -> Result<&Logger> {
        Ok(&self.pimpl()?.progress)
    }

    /// 调试日志器。失败面与 [`ResourceSet::progress_logger`] 相同。
    pub fn debug_logger(&self) -> Result<&Logger> {
        Ok(&self.pimpl()?.debug)
    }

    /// 替换进度日志器（移入）。
    pub fn set_progress_logger(&mut self, logger: Logger) -> Result<()> {
        self.pimpl_mut()?.progress = logger;
        Ok(())
    }

    /// 替换调试日志器（移入）。
    pub fn set_debug_logger(&mut self, logger: Logger) -> Result<()> {
        self.pimpl_mut()?.debug = logger;
        Ok(())
    }

    /// 该资源集合所在的通信器。
    pub fn communicator(&self) -> Result<&Communicator> {
        Ok(&self.pimpl()?.comm)
    }

    /// 是否为空资源集合（rank 为哨兵）。
    pub fn is_null(&self) -> bool {
        self.rank().is_none()
    }

    /// 空，或没有任何资源。
    pub fn empty(&self) -> bool {
        self.is_null() || !self.has_ram()
    }

    /// 交换两个资源集合的状态。
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.pimpl, &mut other.pimpl);
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::null()
    }
}

impl Clone for ResourceSet {
    fn clone(&self) -> Self {
        Self { pimpl: self.pimpl.clone() }
    }
}

impl PartialEq for ResourceSet {
    fn eq(&self, other: &Self) -> bool {
        match (self.pimpl.as_deref(), other.pimpl.as_deref()) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.rank == b.rank
                    && a.ram == b.ram
                    && a.comm == b.comm
                    && a.progress == b.progress
                    && a.debug == b.debug
            }
            _ => false,
        }
    }
}

impl Eq for ResourceSet {}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSet")
            .field("rank", &self.rank())
            .field("has_ram", &self.has_ram())
            .finish()
    }
}
