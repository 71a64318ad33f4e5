use crate::comm::LocalComm;
use crate::group::GroupState;
use lattice_substrate::{CommHandle, RawComm, Substrate, SubstrateError, fresh_group_token};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

thread_local! {
    /// 当前线程（rank）的世界通信器，由 [`launch`] 在进入闭包前注入。
    ///
    /// 只存弱引用：rank 的生死由闭包栈上的强引用决定，线程局部存储不得
    /// 延长通信器的生命周期——否则 panic 展开时最后一个强引用会晚到
    /// 线程收尾阶段才释放，丢失成员的检测就失去了时效。
    static AMBIENT_WORLD: RefCell<Option<Weak<dyn RawComm>>> = const { RefCell::new(None) };
}

/// 拉起一个 `size` 个 rank 的进程组并在每个 rank 上运行 `f`。
///
/// # 契约说明（What）
/// - 每个 rank 在独立线程上执行，闭包收到的句柄命名同一进程组但 `rank()`
///   各不相同；返回值按 rank 升序收集；
/// - 任何 rank panic 时：展开过程丢掉它的最后一个强引用，通信器析构把组
///   钉为失效，其余 rank 的集合调用以 `RankLost` 失败；全部线程汇合后
///   首个 panic 原样向外传播。闭包正常返回的析构不影响组。
///
/// # 执行逻辑（How）
/// - 使用作用域线程，闭包可以借用调用栈上的测试状态；
/// - 进入闭包前把世界通信器的弱引用写进线程局部，供
///   [`LocalSubstrate::world`] 升级读取，从而让"默认构造运行时视图"的
///   路径在 rank 线程里得到正确的世界。
pub fn launch<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(CommHandle) -> R + Send + Sync,
    R: Send,
{
    assert!(size > 0, "a process group needs at least one member");
    let group = GroupState::new(size, fresh_group_token());
    tracing::debug!(size, token = group.token(), "launching in-process rank group");

    std::thread::scope(|scope| {
        let mut joins = Vec::with_capacity(size);
        for rank in 0..size {
            let group = Arc::clone(&group);
            let f = &f;
            joins.push(scope.spawn(move || {
                let comm: Arc<dyn RawComm> = Arc::new(LocalComm::new(rank, group));
                AMBIENT_WORLD.with(|w| *w.borrow_mut() = Some(Arc::downgrade(&comm)));
                let out = f(CommHandle::new(comm));
                AMBIENT_WORLD.with(|w| *w.borrow_mut() = None);
                out
            }));
        }
        joins
            .into_iter()
            .map(|j| match j.join() {
                Ok(out) => out,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// `LocalSubstrate` 把进程内线程组包装成完整的底座生命周期。
///
/// # 设计背景（Why）
/// - 运行时视图的默认构造路径只和 [`Substrate`] 契约打交道；在测试与单机
///   演示里把本实现安装为全局底座，视图就能在 rank 线程中拿到正确的世界
///   句柄，而不需要感知"线程即 rank"这个事实。
///
/// # 契约说明（What）
/// - `world` 返回当前线程的环境世界：rank 线程内是 [`launch`] 注入的句柄，
///   组外线程得到空句柄；
/// - finalize 后 `world` 恒为空句柄，已有句柄所在的组随各自的 launch 作用
///   域自然终结。
pub struct LocalSubstrate {
    initialized: AtomicBool,
    finalized: AtomicBool,
}

impl LocalSubstrate {
    pub fn new() -> Self {
        Self { initialized: AtomicBool::new(false), finalized: AtomicBool::new(false) }
    }
}

impl Default for LocalSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl Substrate for LocalSubstrate {
    fn name(&self) -> &'static str {
        "local-threads"
    }

    fn ensure_init(&self, _args: &[String]) -> Result<bool, SubstrateError> {
        if self.finalized.load(Ordering::Acquire) {
            return Err(SubstrateError::Finalized);
        }
        Ok(!self.initialized.swap(true, Ordering::AcqRel))
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire) && !self.finalized.load(Ordering::Acquire)
    }

    fn world(&self) -> CommHandle {
        if self.finalized.load(Ordering::Acquire) {
            return CommHandle::null();
        }
        AMBIENT_WORLD
            .with(|w| w.borrow().as_ref().and_then(Weak::upgrade))
            .map_or_else(CommHandle::null, CommHandle::new)
    }

    fn finalize(&self) -> Result<(), SubstrateError> {
        if !self.finalized.swap(true, Ordering::AcqRel) {
            tracing::debug!("local substrate finalized");
        }
        Ok(())
    }
}
