//! 通信器外观：底座句柄之上的面向对象封装。
//!
//! # 设计背景（Why）
//! - 底座契约是字节与裸句柄；应用层需要的是"对象 + 方法"：组大小与本进程
//!   rank 缓存在外观里（构造时各查询一次），集合操作以视图/缓冲为词汇；
//! - 外观持有句柄但从不拥有进程组——同一个组可以被任意多个外观、资源集合
//!   与 RAM 描述符引用。
//!
//! # 契约说明（What）
//! - 空句柄包装出的外观：`size() == 0`、`me() == None`，任何集合调用都以
//!   `MissingState` 失败；
//! - 所有集合调用阻塞到底座返回；接收缓冲不足在进入底座之前报告；
//! - 相等性即底座的进程组比较。

mod binary;
mod collective;
mod payload;
mod reduce;

pub use binary::{BinaryBuffer, BinaryView, ConstBinaryView};
pub use payload::{Payload, Scalar, from_binary_buffer, make_binary_buffer};
pub use reduce::{
    BitAnd, BitOr, BitXor, LogicalAnd, LogicalOr, LogicalXor, Plus, ReduceOp, Times,
};

use crate::error::{CoreError, Result, codes};
use lattice_substrate::{AtomId, CommHandle, Rank, RawComm, ReduceOpId};
use std::fmt;
use std::sync::Arc;

/// 通信器外观。引用语义：克隆共享同一进程组。
#[derive(Clone)]
pub struct Communicator {
    handle: CommHandle,
    size: usize,
    me: Option<Rank>,
}

impl Communicator {
    /// 包装一个句柄并缓存组大小与本进程 rank。
    pub fn new(handle: CommHandle) -> Self {
        let size = handle.group_size();
        let me = handle.rank();
        Self { handle, size, me }
    }

    /// 包装空句柄的外观。
    pub fn null() -> Self {
        Self::new(CommHandle::null())
    }

    /// 底座句柄。
    pub fn handle(&self) -> &CommHandle {
        &self.handle
    }

    /// 进程组大小（构造时缓存）。空外观为 0。
    pub fn size(&self) -> usize {
        self.size
    }

    /// 本进程在组内的 rank（构造时缓存）。空外观或组外为 `None`。
    pub fn me(&self) -> Option<Rank> {
        self.me
    }

    /// 是否为空外观。
    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    pub(crate) fn raw(&self) -> Result<&Arc<dyn RawComm>> {
        self.handle.raw().ok_or_else(|| {
            CoreError::missing_state(
                codes::COMM_NULL_HANDLE,
                "collective called on a null communicator handle",
            )
        })
    }

    pub(crate) fn is_receiver(&self, root: Option<Rank>) -> bool {
        root.is_none_or(|r| self.me == Some(r))
    }

    /// 定长二进制 gather，为结果自行分配缓冲。
    ///
    /// 每个 rank 贡献等长的 `data`；接收方得到 `size() * data.len()` 字节、
    /// 按 rank 升序拼接的缓冲。`root` 存在时只有根 rank 的返回值携带缓冲。
    pub fn gather_binary(
        &self,
        data: ConstBinaryView<'_>,
        root: Option<Rank>,
    ) -> Result<Option<BinaryBuffer>> {
        let receiving = self.is_receiver(root);
        let mut out =
            if receiving { BinaryBuffer::zeroed(data.len() * self.size) } else { BinaryBuffer::new() };
        let out_view = if receiving { Some(out.view_mut()) } else { None };
        self.gather_binary_into(data, out_view, root)?;
        Ok(receiving.then(|| out))
    }

    /// 定长二进制 gather 的免分配变体：结果直接写进调用方的视图。
    ///
    /// 接收方的视图至少要有 `size() * data.len()` 字节；不足在进入底座之前
    /// 以 `BufferMismatch` 报告。
    pub fn gather_binary_into(
        &self,
        data: ConstBinaryView<'_>,
        out: Option<BinaryView<'_>>,
        root: Option<Rank>,
    ) -> Result<()> {
        let raw = self.raw()?;
        let receiving = self.is_receiver(root);
        let need = data.len() * self.size;
        let recv = match (receiving, out) {
            (true, Some(view)) => {
                if view.len() < need {
                    return Err(CoreError::short_buffer(need, view.len()));
                }
                Some(view.into_mut_slice())
            }
            (true, None) => return Err(CoreError::short_buffer(need, 0)),
            (false, _) => None,
        };
        tracing::trace!(bytes = data.len(), size = self.size, root = ?root, "binary gather");
        raw.gather(data.as_slice(), recv, root).map_err(CoreError::substrate)
    }

    /// 变长二进制 gather：先交换各 rank 字节数，再按位移聚合。
    ///
    /// 接收方得到 `(拼接缓冲, 各 rank 字节数)`；拼接按 rank 升序，rank i 的
    /// 起始偏移是前缀和 `Σ_{j<i} sizes[j]`。
    pub fn gatherv_binary(
        &self,
        data: ConstBinaryView<'_>,
        root: Option<Rank>,
    ) -> Result<Option<(BinaryBuffer, Vec<usize>)>> {
        let raw = self.raw()?;
        let receiving = self.is_receiver(root);

        // 第 0 步：一次定长 gather 交换本地字节数。
        let n_me = [data.len() as u64];
        let sizes_buf = self.gather_binary(ConstBinaryView::of_typed(&n_me), root)?;

        // 第 1 步：接收方计算位移前缀和并分配聚合缓冲。
        let (counts, displs, total) = match &sizes_buf {
            Some(buf) => {
                let wide = <Vec<u64> as Payload>::from_binary(buf.as_slice())?;
                let counts: Vec<usize> = wide.into_iter().map(|n| n as usize).collect();
                let mut displs = Vec::with_capacity(counts.len());
                let mut total = 0usize;
                for &c in &counts {
                    displs.push(total);
                    total += c;
                }
                (counts, displs, total)
            }
            None => (Vec::new(), Vec::new(), 0),
        };

        // 第 2 步：变长 gather 本体。
        let mut out = if receiving { BinaryBuffer::zeroed(total) } else { BinaryBuffer::new() };
        let recv = if receiving { Some(out.as_mut_slice()) } else { None };
        tracing::trace!(bytes = data.len(), total, root = ?root, "binary gatherv");
        raw.gatherv(data.as_slice(), recv, &counts, &displs, root)
            .map_err(CoreError::substrate)?;
        Ok(receiving.then(|| (out, counts)))
    }

    pub(crate) fn reduce_binary_native(
        &self,
        data: ConstBinaryView<'_>,
        atom: AtomId,
        op: ReduceOpId,
        root: Option<Rank>,
    ) -> Result<Option<BinaryBuffer>> {
        let raw = self.raw()?;
        let receiving = self.is_receiver(root);
        let mut out = if receiving { BinaryBuffer::zeroed(data.len()) } else { BinaryBuffer::new() };
        let recv = if receiving { Some(out.as_mut_slice()) } else { None };
        tracing::trace!(bytes = data.len(), ?atom, ?op, root = ?root, "native reduce");
        raw.reduce(data.as_slice(), recv, atom, op, root).map_err(CoreError::substrate)?;
        Ok(receiving.then(|| out))
    }
}

impl PartialEq for Communicator {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Communicator {}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("size", &self.size)
            .field("me", &self.me)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_facade_has_no_group_and_fails_loudly() {
        let comm = Communicator::null();
        assert_eq!(comm.size(), 0);
        assert_eq!(comm.me(), None);
        assert_eq!(comm, Communicator::null());

        let data = [0u8; 4];
        let err = comm.gather_binary(ConstBinaryView::new(&data), None).unwrap_err();
        assert_eq!(err.code(), codes::COMM_NULL_HANDLE);
    }
}
