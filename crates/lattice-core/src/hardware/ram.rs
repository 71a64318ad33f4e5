//! RAM 描述符：一份资源集合可见内存的语义描述。
//!
//! # 设计背景（Why）
//! - 描述符回答两个问题：这个资源集合名义上管多少内存、以它为根的集合
//!   操作该发给谁。它不追踪在用量——那需要自定义分配器配合，留作后续
//!   方向；
//! - 远端 rank 的描述符由本地探测填充，是名义值：用于相等性判断与根路由
//!   有效，不用于汇报远端节点的真实容量。
//!
//! # 契约说明（What）
//! - 空描述符（无状态或总量为 0）上的集合操作报 `MissingState`；
//! - 相等性：都为空，或总量与通信器一致。属主 rank 不参与比较——同一节点
//!   上各 rank 的描述符应当相等，运行时视图靠这一点数出共享内存的成员；
//! - 拷贝是深拷贝（克隆内部状态），移动偷走状态。

use crate::comm::{Communicator, Payload, ReduceOp};
use crate::error::{CoreError, Result, codes};
use lattice_substrate::Rank;
use std::fmt;

#[derive(Clone)]
struct RamPimpl {
    total: u64,
    owner: Rank,
    comm: Communicator,
}

/// 一个资源集合的内存描述符。
pub struct Ram {
    pimpl: Option<Box<RamPimpl>>,
}

impl Ram {
    /// 空描述符。
    pub fn null() -> Self {
        Self { pimpl: None }
    }

    pub(crate) fn new(total: u64, owner: Rank, comm: Communicator) -> Self {
        Self { pimpl: Some(Box::new(RamPimpl { total, owner, comm })) }
    }

    /// 名义管理的内存总量（字节）；空描述符为 0。
    pub fn total_space(&self) -> u64 {
        self.pimpl.as_ref().map_or(0, |p| p.total)
    }

    /// 是否为空：无状态或总量为 0。
    pub fn empty(&self) -> bool {
        self.total_space() == 0
    }

    /// 拥有这份内存的 rank；空描述符为 `None`。
    pub fn owner(&self) -> Option<Rank> {
        self.pimpl.as_ref().map(|p| p.owner)
    }

    fn pimpl(&self) -> Result<&RamPimpl> {
        self.pimpl.as_deref().ok_or_else(|| {
            CoreError::missing_state(codes::RAM_EMPTY, "collective on an empty RAM descriptor")
        })
    }

    /// 以本描述符的属主为根的类型化 gather；只有属主的返回值携带结果。
    pub fn gather<T: Payload>(&self, x: T) -> Result<Option<T::Gathered>> {
        let p = self.pimpl()?;
        p.comm.gather(x, Some(p.owner))
    }

    /// 以本描述符的属主为根的类型化归约。
    pub fn reduce<T, Op>(&self, x: T, op: Op) -> Result<Option<T>>
    where
        T: Payload,
        Op: ReduceOp<T>,
    {
        let p = self.pimpl()?;
        p.comm.reduce(x, op, Some(p.owner))
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::null()
    }
}

impl Clone for Ram {
    fn clone(&self) -> Self {
        Self { pimpl: self.pimpl.clone() }
    }
}

impl PartialEq for Ram {
    fn eq(&self, other: &Self) -> bool {
        match (self.empty(), other.empty()) {
            (true, true) => true,
            (false, false) => {
                let (Some(a), Some(b)) = (self.pimpl.as_deref(), other.pimpl.as_deref()) else {
                    return false;
                };
                a.total == b.total && a.comm == b.comm
            }
            _ => false,
        }
    }
}

impl Eq for Ram {}

impl fmt::Debug for Ram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ram")
            .field("total", &self.total_space())
            .field("owner", &self.owner())
            .finish()
    }
}
