use crate::group::{GroupState, Poison};
use lattice_substrate::{AtomId, Rank, RawComm, ReduceOpId, SubstrateError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// `LocalComm` 是线程即 rank 的通信器实现。
///
/// # 逻辑解析（How）
/// - 每个 rank 线程持有一个实例；实例内的序号计数器把本 rank 发起的集合按
///   顺序编号，与 [`GroupState`] 的代号配对，落实"同序发起、同序配对"；
/// - 三种集合都先做一次全员字节交换，再在接收方本地完成拼接或折叠。对测试
///   底座来说多搬运的字节换来单一的、可审计的汇合原语。
///
/// # 契约说明（What）
/// - 成员在集合完成前消失（线程 panic）会把组钉为失效，存活成员收到
///   [`SubstrateError::RankLost`] 而不是永久挂起。
pub struct LocalComm {
    rank: Rank,
    group: Arc<GroupState>,
    seq: AtomicU64,
}

impl LocalComm {
    pub(crate) fn new(rank: Rank, group: Arc<GroupState>) -> Self {
        Self { rank, group, seq: AtomicU64::new(0) }
    }

    fn exchange(
        &self,
        kind: &'static str,
        bytes: Vec<u8>,
    ) -> Result<Arc<Vec<Vec<u8>>>, SubstrateError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(rank = self.rank, seq, kind, "entering collective");
        self.group.exchange(self.rank, seq, kind, bytes)
    }

    fn is_receiver(&self, root: Option<Rank>) -> bool {
        root.is_none_or(|r| r == self.rank)
    }

    fn uniform_len(blobs: &[Vec<u8>]) -> Result<usize, SubstrateError> {
        let want = blobs[0].len();
        for (rank, b) in blobs.iter().enumerate() {
            if b.len() != want {
                return Err(SubstrateError::SizeMismatch { rank, got: b.len(), want });
            }
        }
        Ok(want)
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        // 只有异常退场才终结进程组：panic 展开中丢掉通信器，说明该成员
        // 再也不会赴约，存活成员的挂起要转换为响亮的 RankLost。正常析构
        // （launch 闭包顺利返回后的清理）不触碰组状态。
        if std::thread::panicking() {
            self.group.poison(Poison::Lost { rank: self.rank });
        }
    }
}

impl RawComm for LocalComm {
    fn group_size(&self) -> usize {
        self.group.size()
    }

    fn rank(&self) -> Option<Rank> {
        Some(self.rank)
    }

    fn gather(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        let blobs = self.exchange("gather", send.to_vec())?;
        let n = Self::uniform_len(&blobs)?;
        if !self.is_receiver(root) {
            return Ok(());
        }
        let need = n * self.group.size();
        let recv = recv.ok_or(SubstrateError::ShortReceiveBuffer { need, got: 0 })?;
        if recv.len() < need {
            return Err(SubstrateError::ShortReceiveBuffer { need, got: recv.len() });
        }
        for (i, b) in blobs.iter().enumerate() {
            recv[i * n..(i + 1) * n].copy_from_slice(b);
        }
        Ok(())
    }

    fn gatherv(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        displs: &[usize],
        root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        let blobs = self.exchange("gatherv", send.to_vec())?;
        if !self.is_receiver(root) {
            return Ok(());
        }
        let size = self.group.size();
        if counts.len() != size || displs.len() != size {
            return Err(SubstrateError::SizeMismatch {
                rank: self.rank,
                got: counts.len().min(displs.len()),
                want: size,
            });
        }
        let need: usize = counts.iter().sum();
        let recv = recv.ok_or(SubstrateError::ShortReceiveBuffer { need, got: 0 })?;
        if recv.len() < need {
            return Err(SubstrateError::ShortReceiveBuffer { need, got: recv.len() });
        }
        for (rank, b) in blobs.iter().enumerate() {
            if b.len() != counts[rank] {
                return Err(SubstrateError::SizeMismatch {
                    rank,
                    got: b.len(),
                    want: counts[rank],
                });
            }
            recv[displs[rank]..displs[rank] + counts[rank]].copy_from_slice(b);
        }
        Ok(())
    }

    fn reduce(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        atom: AtomId,
        op: ReduceOpId,
        root: Option<Rank>,
    ) -> Result<(), SubstrateError> {
        let width = atom.width();
        if send.len() % width != 0 {
            return Err(SubstrateError::SizeMismatch {
                rank: self.rank,
                got: send.len(),
                want: (send.len() / width) * width,
            });
        }
        let blobs = self.exchange("reduce", send.to_vec())?;
        let n = Self::uniform_len(&blobs)?;
        if !self.is_receiver(root) {
            return Ok(());
        }
        let recv = recv.ok_or(SubstrateError::ShortReceiveBuffer { need: n, got: 0 })?;
        if recv.len() < n {
            return Err(SubstrateError::ShortReceiveBuffer { need: n, got: recv.len() });
        }

        // 按 rank 升序从左到右折叠，与无原生映射时的退化路径保持同一顺序。
        let mut acc = blobs[0].clone();
        for b in blobs.iter().skip(1) {
            fold_into(&mut acc, b, atom, op)?;
        }
        recv[..n].copy_from_slice(&acc);
        Ok(())
    }

    fn group_token(&self) -> u64 {
        self.group.token()
    }
}

/// 把 `next` 的原子逐道合并进 `acc`。
fn fold_lanes<T>(acc: &mut [u8], next: &[u8], f: impl Fn(T, T) -> T)
where
    T: FromBytes + IntoBytes + Immutable + Copy,
{
    let w = size_of::<T>();
    for (a_lane, b_lane) in acc.chunks_exact_mut(w).zip(next.chunks_exact(w)) {
        let a = T::read_from_bytes(a_lane).expect("lane width equals atom width");
        let b = T::read_from_bytes(b_lane).expect("lane width equals atom width");
        f(a, b).write_to(a_lane).expect("lane width equals atom width");
    }
}

fn fold_into(
    acc: &mut [u8],
    next: &[u8],
    atom: AtomId,
    op: ReduceOpId,
) -> Result<(), SubstrateError> {
    // 整数原子：全部算子都有定义；加法与乘法取回绕语义，避免调试构建下
    // 的中途崩溃把集合拖死。
    macro_rules! int_lanes {
        ($t:ty) => {{
            let f: fn($t, $t) -> $t = match op {
                ReduceOpId::Sum => |a, b| a.wrapping_add(b),
                ReduceOpId::Product => |a, b| a.wrapping_mul(b),
                ReduceOpId::BitAnd => |a, b| a & b,
                ReduceOpId::BitOr => |a, b| a | b,
                ReduceOpId::BitXor => |a, b| a ^ b,
                ReduceOpId::LogicalAnd => |a, b| ((a != 0) && (b != 0)) as $t,
                ReduceOpId::LogicalOr => |a, b| ((a != 0) || (b != 0)) as $t,
                ReduceOpId::LogicalXor => |a, b| ((a != 0) ^ (b != 0)) as $t,
            };
            fold_lanes::<$t>(acc, next, f);
            Ok(())
        }};
    }
    // 浮点原子：只有算术算子有意义，其余组合报不支持。
    macro_rules! float_lanes {
        ($t:ty) => {{
            let f: fn($t, $t) -> $t = match op {
                ReduceOpId::Sum => |a, b| a + b,
                ReduceOpId::Product => |a, b| a * b,
                _ => return Err(SubstrateError::UnsupportedReduction { atom, op }),
            };
            fold_lanes::<$t>(acc, next, f);
            Ok(())
        }};
    }

    match atom {
        AtomId::I8 => int_lanes!(i8),
        AtomId::U8 | AtomId::Byte => int_lanes!(u8),
        AtomId::I16 => int_lanes!(i16),
        AtomId::U16 => int_lanes!(u16),
        AtomId::I32 => int_lanes!(i32),
        AtomId::U32 => int_lanes!(u32),
        AtomId::I64 => int_lanes!(i64),
        AtomId::U64 => int_lanes!(u64),
        AtomId::F32 => float_lanes!(f32),
        AtomId::F64 => float_lanes!(f64),
        AtomId::Bool => match op {
            ReduceOpId::LogicalAnd | ReduceOpId::LogicalOr | ReduceOpId::LogicalXor => {
                int_lanes!(u8)
            }
            _ => Err(SubstrateError::UnsupportedReduction { atom, op }),
        },
    }
}
