//! 类型化集合操作：把用户类型翻译成二进制原语。
//!
//! # 逻辑解析（How）
//! - gather/gatherv：免序列化类型把自己的字节视图交给二进制层，接收方由
//!   全组拼接直接重建聚合结果（零拷贝接收进预分配缓冲）；需要序列化的
//!   类型先过编解码器，接收方按每 rank 的字节数切片、逐段解码、再组装；
//! - reduce：元素原子与算子原生标识都存在时直接下发底座；任一缺失则退化
//!   为变长 all-gather 加本地折叠，折叠顺序固定为按 rank 升序从左到右。
//!
//! # 契约说明（What）
//! - 根变体在非根 rank 返回 `Ok(None)`，而不是错误——调用方负责检查；
//! - 定长 gather 要求各 rank 的字节数一致（序列化后的尺寸也算）；长度
//!   可能不同的数据请用 gatherv。

use crate::comm::Communicator;
use crate::comm::payload::Payload;
use crate::comm::reduce::ReduceOp;
use crate::error::{CoreError, ErrorCategory, Result, codes};
use lattice_substrate::Rank;

fn missing_view() -> CoreError {
    CoreError::new(
        codes::BINARY_NO_VIEW,
        ErrorCategory::Serialization,
        "payload claims a contiguous layout but exposes no byte view",
    )
}

impl Communicator {
    /// 类型化定长 gather。
    ///
    /// 返回类型映射：`root` 存在时仅根 rank 的 `Option` 携带值；容器类载荷
    /// 得到跨 rank 压扁的容器（长度 `size * len(x)`），其余载荷得到每 rank
    /// 一个值的 `Vec`。
    pub fn gather<T: Payload>(&self, x: T, root: Option<Rank>) -> Result<Option<T::Gathered>> {
        if T::NEEDS_SERIALIZATION {
            let sent = x.into_binary()?;
            match self.gather_binary(sent.view(), root)? {
                None => Ok(None),
                Some(all) => {
                    let size = self.size();
                    let chunk = all.len() / size.max(1);
                    let bytes = all.as_slice();
                    let mut parts = Vec::with_capacity(size);
                    for i in 0..size {
                        parts.push(T::from_binary(&bytes[i * chunk..(i + 1) * chunk])?);
                    }
                    Ok(Some(T::assemble(parts)))
                }
            }
        } else {
            let view = x.byte_view().ok_or_else(missing_view)?;
            match self.gather_binary(view, root)? {
                None => Ok(None),
                Some(all) => T::gathered_from_buffer(all).map(Some),
            }
        }
    }

    /// 类型化变长 gather：每 rank 的载荷长度可以不同。
    ///
    /// 接收方得到 `(聚合结果, 各 rank 的字节数)`；聚合按 rank 升序。
    pub fn gatherv<T: Payload>(
        &self,
        x: T,
        root: Option<Rank>,
    ) -> Result<Option<(T::Gathered, Vec<usize>)>> {
        if T::NEEDS_SERIALIZATION {
            let sent = x.into_binary()?;
            match self.gatherv_binary(sent.view(), root)? {
                None => Ok(None),
                Some((all, sizes)) => {
                    let bytes = all.as_slice();
                    let mut parts = Vec::with_capacity(sizes.len());
                    let mut offset = 0;
                    for &n in &sizes {
                        parts.push(T::from_binary(&bytes[offset..offset + n])?);
                        offset += n;
                    }
                    Ok(Some((T::assemble(parts), sizes)))
                }
            }
        } else {
            let view = x.byte_view().ok_or_else(missing_view)?;
            match self.gatherv_binary(view, root)? {
                None => Ok(None),
                Some((all, sizes)) => Ok(Some((T::gathered_from_buffer(all)?, sizes))),
            }
        }
    }

    /// 类型化归约。
    ///
    /// 原生路径要求元素原子映射与算子原生标识同时存在；否则退化为变长
    /// all-gather 加按 rank 升序的左折叠，结果与原生路径一致（浮点舍入顺序
    /// 也相同——两条路径都是升序逐个合并）。
    pub fn reduce<T, Op>(&self, x: T, op: Op, root: Option<Rank>) -> Result<Option<T>>
    where
        T: Payload,
        Op: ReduceOp<T>,
    {
        if !T::NEEDS_SERIALIZATION
            && let (Some(atom), Some(native)) = (T::ELEM_ATOM, op.native())
        {
            let view = x.byte_view().ok_or_else(missing_view)?;
            return match self.reduce_binary_native(view, atom, native, root)? {
                None => Ok(None),
                Some(folded) => T::from_binary(folded.as_slice()).map(Some),
            };
        }

        // 退化路径：gatherv 容忍序列化尺寸差异，折叠在每个接收方本地完成。
        let sent = x.into_binary()?;
        match self.gatherv_binary(sent.view(), root)? {
            None => Ok(None),
            Some((all, sizes)) => {
                let bytes = all.as_slice();
                let mut acc: Option<T> = None;
                let mut offset = 0;
                for &n in &sizes {
                    let part = T::from_binary(&bytes[offset..offset + n])?;
                    offset += n;
                    acc = Some(match acc {
                        None => part,
                        Some(folded) => op.combine(folded, part),
                    });
                }
                let folded = acc.ok_or_else(|| {
                    CoreError::new(
                        codes::COMM_PROTOCOL,
                        ErrorCategory::Substrate,
                        "reduction over an empty group",
                    )
                })?;
                Ok(Some(folded))
            }
        }
    }
}
