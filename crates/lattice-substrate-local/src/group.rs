use lattice_substrate::{Rank, SubstrateError};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// 汇合点的永久失效原因。
///
/// 一旦某个成员乱入不同种类的集合、或在集合完成前消失，整个进程组就不可能
/// 再完成任何集合；失效原因被钉在组状态上，之后每个调用者都会收到对应错误。
#[derive(Clone, Copy, Debug)]
pub(crate) enum Poison {
    Mismatch {
        rank: Rank,
        entered: &'static str,
        running: &'static str,
    },
    Lost {
        rank: Rank,
    },
    Finalized,
}

impl Poison {
    pub(crate) fn to_error(self) -> SubstrateError {
        match self {
            Poison::Mismatch { rank, entered, running } => {
                SubstrateError::CollectiveMismatch { rank, entered, running }
            }
            Poison::Lost { rank } => SubstrateError::RankLost { rank },
            Poison::Finalized => SubstrateError::Finalized,
        }
    }
}

/// 单代集合的汇合状态。
struct Exchange {
    /// 当前接受存入的代号；rank 的第 k 次集合调用属于第 k 代。
    generation: u64,
    /// 本代首位到达者登记的集合种类，后续到达者必须一致。
    kind: &'static str,
    slots: Vec<Option<Vec<u8>>>,
    arrived: usize,
    departed: usize,
    /// 最后一位到达者发布的全组字节块，按 rank 升序。
    published: Option<Arc<Vec<Vec<u8>>>>,
    poison: Option<Poison>,
}

/// `GroupState` 是一个进程组的共享汇合点。
///
/// # 逻辑解析（How）
/// - 集合按"代"推进：rank 的第 k 次调用只会与其他 rank 的第 k 次调用配对，
///   这实现了契约要求的按发起顺序配对；
/// - 一代分三步：存入（全员把字节块放进自己的槽位）→ 发布（最后一位到达者
///   把 N 个块打包成 `Arc` 并唤醒全员）→ 撤离（最后一位撤离者清场并把代号
///   加一）。发布物在全员克隆 `Arc` 之前不会被清除，因此不存在读到下一代
///   数据的窗口。
///
/// # 契约说明（What）
/// - `exchange` 阻塞到本代完成或组失效；失效以 [`Poison`] 映射成
///   [`SubstrateError`] 返回。
pub(crate) struct GroupState {
    size: usize,
    token: u64,
    inner: Mutex<Exchange>,
    cv: Condvar,
}

impl GroupState {
    pub(crate) fn new(size: usize, token: u64) -> Arc<Self> {
        Arc::new(Self {
            size,
            token,
            inner: Mutex::new(Exchange {
                generation: 0,
                kind: "",
                slots: (0..size).map(|_| None).collect(),
                arrived: 0,
                departed: 0,
                published: None,
                poison: None,
            }),
            cv: Condvar::new(),
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    /// 全员字节交换：rank 存入自己的块，取回按 rank 升序的全组块。
    pub(crate) fn exchange(
        &self,
        rank: Rank,
        seq: u64,
        kind: &'static str,
        bytes: Vec<u8>,
    ) -> Result<Arc<Vec<Vec<u8>>>, SubstrateError> {
        let mut ex = self.inner.lock();

        // 第一步：等待轮到自己的代。前一代必须全员撤离后代号才会推进。
        while ex.generation != seq {
            if let Some(p) = ex.poison {
                return Err(p.to_error());
            }
            self.cv.wait(&mut ex);
        }
        if let Some(p) = ex.poison {
            return Err(p.to_error());
        }

        // 第二步：存入并校验集合种类。
        if ex.arrived == 0 {
            ex.kind = kind;
        } else if ex.kind != kind {
            let p = Poison::Mismatch { rank, entered: kind, running: ex.kind };
            ex.poison = Some(p);
            self.cv.notify_all();
            return Err(p.to_error());
        }
        ex.slots[rank] = Some(bytes);
        ex.arrived += 1;

        if ex.arrived == self.size {
            let blobs: Vec<Vec<u8>> =
                ex.slots.iter_mut().map(|s| s.take().unwrap_or_default()).collect();
            ex.published = Some(Arc::new(blobs));
            self.cv.notify_all();
        } else {
            while ex.published.is_none() {
                if let Some(p) = ex.poison {
                    return Err(p.to_error());
                }
                self.cv.wait(&mut ex);
            }
        }

        // 第三步：取走发布物并撤离；最后一位撤离者清场。
        let out = Arc::clone(ex.published.as_ref().expect("published by the last arriver"));
        ex.departed += 1;
        if ex.departed == self.size {
            ex.arrived = 0;
            ex.departed = 0;
            ex.published = None;
            ex.generation += 1;
            self.cv.notify_all();
        }
        Ok(out)
    }

    /// 钉上失效原因并唤醒所有等待者。已失效的组保持首个原因不变。
    pub(crate) fn poison(&self, p: Poison) {
        let mut ex = self.inner.lock();
        if ex.poison.is_none() {
            ex.poison = Some(p);
            self.cv.notify_all();
        }
    }
}
