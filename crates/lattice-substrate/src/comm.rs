use crate::atom::{AtomId, ReduceOpId};
use crate::error::SubstrateError;
use core::fmt;
use std::sync::Arc;

/// 进程在某个通信器内的序号，取值范围 `0..group_size`。
pub type Rank = usize;

static NEXT_GROUP_TOKEN: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

/// 分配一个进程内唯一的进程组令牌。
///
/// 所有底座实现都从同一个计数器取令牌，保证跨实现的
/// [`RawComm::same_group`] 比较不会误判。令牌 0 保留不用。
pub fn fresh_group_token() -> u64 {
    NEXT_GROUP_TOKEN.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// `RawComm` 是底座必须实现的字节级通信器契约。
///
/// # 设计背景（Why）
/// - 上层的类型化集合操作最终都折算成"每个 rank 贡献一段字节，按 rank 升序
///   拼接/归约"的原语；把契约压到字节层，底座实现就完全不需要理解用户类型。
/// - 契约对象安全（`Arc<dyn RawComm>`），句柄可以在资源集合之间自由复制而
///   不暴露底座的具体类型。
///
/// # 契约说明（What）
/// - **阻塞语义**：所有方法在组内全部成员完成前不返回；同一通信器上按相同
///   顺序发起的集合调用按该顺序配对。
/// - **根语义**：`root` 为 `Some(r)` 时只有 rank `r` 的 `recv` 会被写入，
///   其余 rank 必须传 `None`（传了也会被忽略）；`root` 为 `None` 表示
///   all-变体，每个成员都提供 `recv` 并收到完整结果。
/// - **排布**：接收缓冲按 rank 升序紧排；`gatherv` 的 `displs[i]` 是 rank i
///   数据的起始字节偏移，由调用方预先算好（`displs[i] = Σ_{j<i} counts[j]`）。
///
/// # 风险提示（Trade-offs）
/// - 契约不含超时与取消：一旦进入集合就必须等整组完成，这与消息传递底座的
///   惯例一致；挂起的诊断交给实现层（如 rank 丢失检测）。
pub trait RawComm: Send + Sync {
    /// 该通信器命名的进程组大小。
    fn group_size(&self) -> usize;

    /// 当前进程在组内的序号；不属于该组时为 `None`。
    fn rank(&self) -> Option<Rank>;

    /// 定长 gather：每个 rank 贡献等长的 `send`，接收方得到按 rank 升序的拼接。
    ///
    /// # 前置条件
    /// - 所有 rank 的 `send.len()` 必须一致，违反时返回
    ///   [`SubstrateError::SizeMismatch`]；
    /// - 接收方的 `recv` 长度必须 ≥ `send.len() * group_size()`。
    fn gather(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        root: Option<Rank>,
    ) -> Result<(), SubstrateError>;

    /// 变长 gather：rank i 贡献 `counts[i]` 字节，写入 `recv[displs[i]..]`。
    ///
    /// # 前置条件
    /// - 接收方必须提供覆盖全组的 `counts`/`displs`；非接收 rank 传空切片即可；
    /// - `recv` 长度必须 ≥ `counts` 之和。
    fn gatherv(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        displs: &[usize],
        root: Option<Rank>,
    ) -> Result<(), SubstrateError>;

    /// 原生归约：把各 rank 的 `send` 视为 `atom` 元素数组，逐元素应用 `op`。
    ///
    /// 元素个数由 `send.len() / atom.width()` 决定，各 rank 必须一致。结果
    /// 写入接收方的 `recv`（长度与 `send` 相同）。
    fn reduce(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        atom: AtomId,
        op: ReduceOpId,
        root: Option<Rank>,
    ) -> Result<(), SubstrateError>;

    /// 返回标识进程组身份的令牌；两个通信器令牌相同当且仅当命名同一组。
    fn group_token(&self) -> u64;

    /// 判断两个通信器是否命名同一进程组。
    fn same_group(&self, other: &dyn RawComm) -> bool {
        self.group_token() == other.group_token()
    }
}

/// `CommHandle` 是通信器的值语义句柄。
///
/// # 设计背景（Why）
/// - 运行时视图、资源集合与 RAM 描述符都要持有通信器，句柄必须可廉价复制
///   且能表达"空"状态（对应消息传递库里的空通信器哨兵）。
///
/// # 契约说明（What）
/// - 空句柄：组大小为 0，rank 为 `None`，与任何空句柄相等；
/// - 非空句柄：相等性由底座的进程组比较决定，而非指针相等；
/// - 句柄构造后不可变——需要别的组就构造新句柄。
#[derive(Clone)]
pub struct CommHandle {
    raw: Option<Arc<dyn RawComm>>,
}

impl CommHandle {
    /// 构造空句柄。
    pub fn null() -> Self {
        Self { raw: None }
    }

    /// 包装一个底座通信器。
    pub fn new(raw: Arc<dyn RawComm>) -> Self {
        Self { raw: Some(raw) }
    }

    /// 是否为空句柄。
    pub fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    /// 访问底层通信器；空句柄返回 `None`。
    pub fn raw(&self) -> Option<&Arc<dyn RawComm>> {
        self.raw.as_ref()
    }

    /// 组大小；空句柄为 0。
    pub fn group_size(&self) -> usize {
        self.raw.as_ref().map_or(0, |c| c.group_size())
    }

    /// 当前进程的 rank；空句柄或不在组内为 `None`。
    pub fn rank(&self) -> Option<Rank> {
        self.raw.as_ref().and_then(|c| c.rank())
    }
}

impl fmt::Debug for CommHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            None => f.write_str("CommHandle(null)"),
            Some(c) => f
                .debug_struct("CommHandle")
                .field("group_token", &c.group_token())
                .field("size", &c.group_size())
                .field("rank", &c.rank())
                .finish(),
        }
    }
}

impl PartialEq for CommHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.raw, &other.raw) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_group(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for CommHandle {}

impl Default for CommHandle {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_empty_and_self_equal() {
        let h = CommHandle::null();
        assert!(h.is_null());
        assert_eq!(h.group_size(), 0);
        assert_eq!(h.rank(), None);
        assert_eq!(h, CommHandle::null());
        assert_eq!(h, CommHandle::default());
    }
}
