use crate::atom::{AtomId, ReduceOpId};
use crate::comm::{CommHandle, Rank, RawComm, fresh_group_token};
use crate::error::SubstrateError;
use crate::registry::Substrate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// `SelfComm` 是官方维护的单进程通信器桩。
///
/// # 设计背景（Why）
/// - 库必须在没有任何分布式启动器的环境下可用（单元测试、交互式探索、
///   单机脚本）。与其让调用方分支判断"有没有底座"，不如提供一个语义完备的
///   1-rank 世界：所有集合操作都退化为本地拷贝。
/// - 官方桩随契约 crate 一起维护，契约演进时单点更新。
///
/// # 契约说明（What）
/// - `group_size() == 1`，`rank() == Some(0)`；
/// - gather/gatherv/reduce 均为把 `send` 原样写入接收缓冲；
/// - 所属底座 finalize 后所有操作返回 [`SubstrateError::Finalized`]。
pub struct SelfComm {
    token: u64,
    defunct: Arc<AtomicBool>,
}

impl SelfComm {
    fn new(defunct: Arc<AtomicBool>) -> Self {
        Self { token: fresh_group_token(), defunct }
    }

    fn check_live(&self) -> Result<(), SubstrateError> {
        if self.defunct.load(Ordering::Acquire) {
            return Err(SubstrateError::Finalized);
        }
        Ok(())
    }

    fn copy_through(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        offset: usize,
    ) -> Result<(), SubstrateError> {
        let Some(recv) = recv else { return Ok(()) };
        let need = offset + send.len();
        if recv.len() < need {
            return Err(SubstrateError::ShortReceiveBuffer { need, got: recv.len() });
        }
        recv[offset..need].copy_from_slice(send);
        Ok(())
    }
}

impl RawComm for SelfComm {
    fn group_size(&self) -> usize {
        1
    }

    fn rank(&self) -> Option<Rank> {
        Some(0)
    }

    fn gather(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        _root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        self.check_live()?;
        self.copy_through(send, recv, 0)
    }

    fn gatherv(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        _counts: &[usize],
        displs: &[usize],
        _root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        self.check_live()?;
        let offset = displs.first().copied().unwrap_or(0);
        self.copy_through(send, recv, offset)
    }

    fn reduce(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        _atom: AtomId,
        _op: ReduceOpId,
        _root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        // 单成员的归约就是恒等：没有第二个操作数可合并。
        self.check_live()?;
        self.copy_through(send, recv, 0)
    }

    fn group_token(&self) -> u64 {
        self.token
    }
}

const UNINIT: u8 = 0;
const LIVE: u8 = 1;
const FINALIZED: u8 = 2;

/// `SelfSubstrate` 把 [`SelfComm`] 包装成完整的底座生命周期。
///
/// # 逻辑解析（How）
/// - 三个宏观状态：未初始化 → 已初始化 → 已关闭，用一个原子字节驱动；
/// - `world` 只在已初始化状态返回非空句柄；
/// - finalize 点亮共享的 `defunct` 标志，使已经分发出去的句柄同步失效。
///
/// # 风险提示（Trade-offs）
/// - 与真实消息传递库一致，关闭后不允许再次初始化；重复 init 的需求应当
///   通过持有运行时视图引用来避免。
pub struct SelfSubstrate {
    state: AtomicU8,
    defunct: Arc<AtomicBool>,
    world: Arc<SelfComm>,
}

impl SelfSubstrate {
    pub fn new() -> Self {
        let defunct = Arc::new(AtomicBool::new(false));
        let world = Arc::new(SelfComm::new(Arc::clone(&defunct)));
        Self { state: AtomicU8::new(UNINIT), defunct, world }
    }
}

impl Default for SelfSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl Substrate for SelfSubstrate {
    fn name(&self) -> &'static str {
        "self"
    }

    fn ensure_init(&self, _args: &[String]) -> Result<bool, SubstrateError> {
        match self.state.compare_exchange(UNINIT, LIVE, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {
                tracing::debug!("self substrate initialized (single-rank world)");
                Ok(true)
            }
            Err(LIVE) => Ok(false),
            Err(_) => Err(SubstrateError::Finalized),
        }
    }

    fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == LIVE
    }

    fn world(&self) -> CommHandle {
        if !self.is_initialized() {
            return CommHandle::null();
        }
        CommHandle::new(Arc::clone(&self.world) as Arc<dyn RawComm>)
    }

    fn finalize(&self) -> Result<(), SubstrateError> {
        if self.state.swap(FINALIZED, Ordering::AcqRel) != FINALIZED {
            self.defunct.store(true, Ordering::Release);
            tracing::debug!("self substrate finalized");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_world_round_trips_bytes() {
        let sub = SelfSubstrate::new();
        assert!(sub.ensure_init(&[]).unwrap());
        assert!(!sub.ensure_init(&[]).unwrap());

        let world = sub.world();
        let comm = world.raw().expect("live world").clone();
        let mut out = [0u8; 4];
        comm.gather(&[1, 2, 3, 4], Some(&mut out), None).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn finalize_defuncts_outstanding_handles() {
        let sub = SelfSubstrate::new();
        sub.ensure_init(&[]).unwrap();
        let world = sub.world();
        let comm = world.raw().expect("live world").clone();

        sub.finalize().unwrap();
        assert!(sub.world().is_null());
        let err = comm.gather(&[0u8], Some(&mut [0u8; 1]), None).unwrap_err();
        assert!(matches!(err, SubstrateError::Finalized));
    }

    #[test]
    fn distinct_worlds_are_distinct_groups() {
        let a = SelfSubstrate::new();
        let b = SelfSubstrate::new();
        a.ensure_init(&[]).unwrap();
        b.ensure_init(&[]).unwrap();
        assert_ne!(a.world(), b.world());
        assert_eq!(a.world(), a.world());
    }
}
