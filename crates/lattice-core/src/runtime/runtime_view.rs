//! 运行时视图：整个并行程序的共享视图。
//!
//! # 设计背景（Why）
//! - 视图是别名不是所有者：任意多个句柄共享同一份状态，最后一个引用释放
//!   时按后进先出顺序执行回收栈——若本视图在构造时真正初始化了底座，
//!   "finalize 底座"是栈底的那一项；
//! - 资源集合表按需填充：绝大多数 rank 只关心自己的资源集合，当前 rank
//!   的那份在构造时就位，其余 rank 首次被查询时才补。
//!
//! # 契约说明（What）
//! - 宏观状态只有两个：活（有状态）与空（默认构造）；底座的"未初始化 /
//!   我们初始化 / 他人初始化"三态在构造时一次性折叠进 `owns_substrate`；
//! - 集合便捷方法都是 all-变体：每个参与 rank 都拿到结果。

use crate::comm::{Communicator, Payload, ReduceOp};
use crate::error::{CoreError, ErrorCategory, Result, codes};
use crate::hardware::{Ram, detect_total_ram};
use crate::logging::{Logger, LoggerFactory};
use crate::runtime::resource_set::ResourceSet;
use lattice_substrate::{CommHandle, Rank, Substrate, global};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

type TeardownCallback = Box<dyn FnOnce() + Send>;

struct RuntimeViewPimpl {
    owns_substrate: bool,
    comm: Communicator,
    logger: Logger,
    resource_sets: Mutex<BTreeMap<Rank, ResourceSet>>,
    callbacks: Mutex<Vec<TeardownCallback>>,
}

impl Drop for RuntimeViewPimpl {
    fn drop(&mut self) {
        // 后进先出排空回收栈。析构路径不抛错：回调的 panic 被拦下并记录，
        // 剩余的栈继续执行（其中可能包含底座 finalize）。
        let mut callbacks = std::mem::take(self.callbacks.get_mut());
        while let Some(callback) = callbacks.pop() {
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::error!("teardown callback panicked; draining the remaining stack");
            }
        }
    }
}

/// 运行时的共享视图。克隆是廉价的指针递增。
///
/// # 使用方式（How）
/// ```ignore
/// use lattice_core::prelude::*;
///
/// let rt = RuntimeView::new()?;                      // 采用世界组
/// let mine = rt.my_resource_set()?;                  // 本 rank 的资源
/// let totals = rt.gather(vec![mine.ram()?.total_space()])?;
/// rt.stack_callback(|| println!("bye"));             // 回收栈
/// ```
///
/// # 风险提示（Trade-offs）
/// - 视图持有底座存活：只要还有一个引用在手，底座就不会被 finalize；
///   需要确定性的关闭点时，把最后一个视图的释放放到明确的作用域边界上。
#[derive(Clone)]
pub struct RuntimeView {
    pimpl: Option<Arc<RuntimeViewPimpl>>,
}

impl RuntimeView {
    /// 空视图。
    pub fn null() -> Self {
        Self { pimpl: None }
    }

    /// 默认构造：采用（必要时初始化）进程全局底座的世界组，不认领所有权。
    pub fn new() -> Result<Self> {
        let substrate = global();
        substrate.ensure_init(&[]).map_err(CoreError::substrate)?;
        let world = substrate.world();
        Self::from_parts(substrate, world, false)
    }

    /// 用程序参数初始化底座；本次调用真正执行了初始化才认领所有权。
    pub fn with_args(args: &[String]) -> Result<Self> {
        let substrate = global();
        let owned = substrate.ensure_init(args).map_err(CoreError::substrate)?;
        let world = substrate.world();
        Self::from_parts(substrate, world, owned)
    }

    /// 包装一个现成的通信器句柄；底座未初始化则顺带初始化并如实记录。
    pub fn from_comm(handle: CommHandle) -> Result<Self> {
        let substrate = global();
        let owned = substrate.ensure_init(&[]).map_err(CoreError::substrate)?;
        Self::from_parts(substrate, handle, owned)
    }

    fn from_parts(
        substrate: Arc<dyn Substrate>,
        handle: CommHandle,
        owns_substrate: bool,
    ) -> Result<Self> {
        let comm = Communicator::new(handle);
        let logger = LoggerFactory::default_global_logger(comm.me());
        tracing::debug!(
            size = comm.size(),
            me = ?comm.me(),
            owns_substrate,
            substrate = substrate.name(),
            "runtime view constructed"
        );

        let pimpl = RuntimeViewPimpl {
            owns_substrate,
            comm,
            logger,
            resource_sets: Mutex::new(BTreeMap::new()),
            callbacks: Mutex::new(Vec::new()),
        };
        if owns_substrate {
            // 栈底条目：引用计数归零时最后执行。
            pimpl.callbacks.lock().push(Box::new(move || {
                if let Err(e) = substrate.finalize() {
                    tracing::error!(error = %e, "substrate finalize failed during teardown");
                }
            }));
        }

        let me = pimpl.comm.me();
        let view = Self { pimpl: Some(Arc::new(pimpl)) };
        if let Some(me) = me {
            view.materialize(me)?;
        }
        Ok(view)
    }

    fn pimpl(&self) -> Result<&RuntimeViewPimpl> {
        self.pimpl.as_deref().ok_or_else(|| {
            CoreError::missing_state(
                codes::RUNTIME_NULL_VIEW,
                "runtime view is null; was it default constructed or moved from?",
            )
        })
    }

    /// 是否为空视图。
    pub fn is_null(&self) -> bool {
        self.pimpl.is_none()
    }

    /// 视图里的资源集合数，即进程组大小；空视图为 0。
    pub fn size(&self) -> usize {
        self.pimpl.as_deref().map_or(0, |p| p.comm.size())
    }

    /// 底层通信器句柄；空视图返回空句柄。
    pub fn comm(&self) -> CommHandle {
        self.pimpl.as_deref().map_or_else(CommHandle::null, |p| p.comm.handle().clone())
    }

    /// 通信器外观。
    pub fn communicator(&self) -> Result<&Communicator> {
        Ok(&self.pimpl()?.comm)
    }

    /// 当前进程是否属于这个视图的进程组。
    pub fn has_me(&self) -> bool {
        self.pimpl.as_deref().is_some_and(|p| p.comm.me().is_some())
    }

    /// 本视图构造时是否真正初始化了底座（从而负责 finalize）。
    pub fn owns_substrate(&self) -> bool {
        self.pimpl.as_deref().is_some_and(|p| p.owns_substrate)
    }

    fn bounds_check(&self, rank: Rank) -> Result<()> {
        let size = self.size();
        if rank < size {
            return Ok(());
        }
        Err(CoreError::missing_state(
            codes::RUNTIME_RANK_OUT_OF_RANGE,
            format!("{rank} is not in the range [0, {size})"),
        ))
    }

    fn materialize(&self, rank: Rank) -> Result<ResourceSet> {
        let pimpl = self.pimpl()?;
        let mut sets = pimpl.resource_sets.lock();
        if let Some(existing) = sets.get(&rank) {
            return Ok(existing.clone());
        }
        // 名义描述符：远端 rank 的 RAM 总量来自本地探测，用于相等性与
        // 根路由，不代表远端节点的真实容量。
        let ram = Ram::new(detect_total_ram(), rank, pimpl.comm.clone());
        let progress =
            if pimpl.comm.me() == Some(rank) { pimpl.logger.clone() } else { Logger::null() };
        let set = ResourceSet::new(rank, ram, pimpl.comm.clone(), progress, Logger::null());
        sets.insert(rank, set.clone());
        Ok(set)
    }

    /// 第 `rank` 个资源集合；首次访问时物化，越界报缺失状态错误。
    pub fn at(&self, rank: Rank) -> Result<ResourceSet> {
        self.bounds_check(rank)?;
        self.materialize(rank)
    }

    /// 当前进程的资源集合。
    pub fn my_resource_set(&self) -> Result<ResourceSet> {
        let me = self.pimpl()?.comm.me().ok_or_else(|| {
            CoreError::missing_state(
                codes::RUNTIME_NOT_A_MEMBER,
                "current process is not a member of this runtime view",
            )
        })?;
        self.materialize(me)
    }

    /// RAM 描述符等于 `ram` 的资源集合个数，用于发现节点内共享内存。
    pub fn count(&self, ram: &Ram) -> Result<usize> {
        let mut matches = 0;
        for rank in 0..self.size() {
            let set = self.at(rank)?;
            if set.has_ram() && set.ram()? == ram {
                matches += 1;
            }
        }
        Ok(matches)
    }

    /// 进程全局日志器（出厂默认：rank 0 彩色控制台，其余空日志器）。
    pub fn logger(&self) -> Logger {
        self.pimpl.as_deref().map_or_else(Logger::null, |p| p.logger.clone())
    }

    /// 把一个回调压进回收栈；最后一个视图引用释放时后进先出执行。
    pub fn stack_callback(&self, callback: impl FnOnce() + Send + 'static) -> Result<()> {
        self.pimpl()?.callbacks.lock().push(Box::new(callback));
        Ok(())
    }

    fn expect_all_variant<T>(value: Option<T>) -> Result<T> {
        value.ok_or_else(|| {
            CoreError::new(
                codes::COMM_PROTOCOL,
                ErrorCategory::Substrate,
                "all-variant collective returned no value on a participating rank",
            )
        })
    }

    /// all-变体类型化 gather：每个 rank 都拿到聚合结果。
    pub fn gather<T: Payload>(&self, x: T) -> Result<T::Gathered> {
        Self::expect_all_variant(self.communicator()?.gather(x, None)?)
    }

    /// all-变体类型化变长 gather。
    pub fn gatherv<T: Payload>(&self, x: T) -> Result<(T::Gathered, Vec<usize>)> {
        Self::expect_all_variant(self.communicator()?.gatherv(x, None)?)
    }

    /// all-变体类型化归约。
    pub fn reduce<T, Op>(&self, x: T, op: Op) -> Result<T>
    where
        T: Payload,
        Op: ReduceOp<T>,
    {
        Self::expect_all_variant(self.communicator()?.reduce(x, op, None)?)
    }

    /// 交换两个视图的状态指针。
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.pimpl, &mut other.pimpl);
    }
}

impl Default for RuntimeView {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for RuntimeView {
    fn eq(&self, other: &Self) -> bool {
        match (self.pimpl.as_deref(), other.pimpl.as_deref()) {
            (None, None) => true,
            // 资源集合内容由通信器决定，因此相等性只看通信器与日志器。
            (Some(a), Some(b)) => a.comm == b.comm && a.logger == b.logger,
            _ => false,
        }
    }
}

impl Eq for RuntimeView {}

impl fmt::Debug for RuntimeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeView")
            .field("size", &self.size())
            .field("has_me", &self.has_me())
            .field("owns_substrate", &self.owns_substrate())
            .finish()
    }
}
