use crate::atom::{AtomId, ReduceOpId};

/// `SubstrateError` 描述底座原语返回的非成功状态。
///
/// # 设计背景（Why）
/// - 核心 crate 把底座错误包装为自身错误域的 `Substrate` 分类并附带根因，
///   因此这里只需要一个携带足够排障信息的枚举，而不是稳定错误码体系。
/// - 集合调用是组内阻塞操作：任何一个成员出错都意味着整组操作失败，错误
///   信息必须指明出错的 rank 与期望，方便在多进程日志里定位。
///
/// # 契约说明（What）
/// - 实现者应在进入底座前完成参数校验（缓冲尺寸、算子组合），并用本枚举
///   报告；进入集合后的失败（对端退出等）用 `RankLost` 表达。
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// 底座已 finalize，句柄上的任何集合调用都不再合法。
    #[error("substrate already finalized; communicator handles are defunct")]
    Finalized,

    /// 定长集合里各 rank 的贡献长度不一致。
    #[error("collective arity mismatch: rank {rank} contributed {got} bytes, group expected {want}")]
    SizeMismatch { rank: usize, got: usize, want: usize },

    /// 同一通信器上各 rank 进入了不同种类的集合调用。
    #[error("mismatched collective on one communicator: rank {rank} entered {entered}, group is running {running}")]
    CollectiveMismatch {
        rank: usize,
        entered: &'static str,
        running: &'static str,
    },

    /// 某个成员在集合完成前消失（线程 panic 或提前退出）。
    #[error("rank {rank} abandoned the collective before completion")]
    RankLost { rank: usize },

    /// 原生归约不支持请求的原子/算子组合。
    #[error("native reduction over {atom:?} with {op:?} is not supported by this substrate")]
    UnsupportedReduction { atom: AtomId, op: ReduceOpId },

    /// 接收缓冲比协议要求的小。
    #[error("receive buffer too small: need {need} bytes, got {got}")]
    ShortReceiveBuffer { need: usize, got: usize },
}
