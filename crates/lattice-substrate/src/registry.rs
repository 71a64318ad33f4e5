use crate::comm::CommHandle;
use crate::error::SubstrateError;
use crate::stub::SelfSubstrate;
use parking_lot::RwLock;
use std::sync::Arc;

/// `Substrate` 抽象一个进程可见的消息传递底座的生命周期。
///
/// # 设计背景（Why）
/// - 消息传递库是进程级全局设施：初始化与 finalize 都只能发生一次，且可能
///   由宿主程序先行完成。运行时视图需要区分三种宏观状态——未初始化、由我们
///   初始化、由他人初始化——其中第三种只在构造时记录一次。
///
/// # 契约说明（What）
/// - `ensure_init` 幂等：已初始化时立即返回 `false`；真正执行了初始化才
///   返回 `true`，调用方据此决定是否把 finalize 压入自己的回收栈；
/// - `world` 返回调用上下文对应的"全体进程"句柄，底座尚未初始化或已
///   finalize 时返回空句柄；
/// - `finalize` 之后句柄全部失效，集合调用返回
///   [`SubstrateError::Finalized`]。
pub trait Substrate: Send + Sync {
    /// 底座的人类可读名称，用于日志。
    fn name(&self) -> &'static str;

    /// 确保底座已初始化；返回 `true` 当且仅当本次调用执行了初始化。
    fn ensure_init(&self, args: &[String]) -> Result<bool, SubstrateError>;

    /// 底座当前是否处于已初始化状态。
    fn is_initialized(&self) -> bool;

    /// 调用上下文的全体进程句柄。
    fn world(&self) -> CommHandle;

    /// 关闭底座。幂等：重复调用是无害的空操作。
    fn finalize(&self) -> Result<(), SubstrateError>;
}

static GLOBAL: RwLock<Option<Arc<dyn Substrate>>> = RwLock::new(None);

/// 安装进程全局底座。
///
/// # 契约说明（What）
/// - 后装替换先装；通常由启动器（或测试工装）在拉起任何运行时视图之前调用
///   一次。已经构造的句柄不受替换影响——它们直接持有通信器。
pub fn install(substrate: Arc<dyn Substrate>) {
    tracing::debug!(substrate = substrate.name(), "installing global substrate");
    *GLOBAL.write() = Some(substrate);
}

/// 获取进程全局底座；未安装时懒加载官方单进程桩。
///
/// # 执行逻辑（How）
/// - 读锁命中直接克隆；未命中升级为写锁并安装 [`SelfSubstrate`]，保证库在
///   没有任何启动器的环境里仍然以"单 rank 世界"的语义可用。
pub fn global() -> Arc<dyn Substrate> {
    if let Some(s) = GLOBAL.read().as_ref() {
        return Arc::clone(s);
    }
    let mut slot = GLOBAL.write();
    if let Some(s) = slot.as_ref() {
        return Arc::clone(s);
    }
    let fallback: Arc<dyn Substrate> = Arc::new(SelfSubstrate::new());
    *slot = Some(Arc::clone(&fallback));
    fallback
}
