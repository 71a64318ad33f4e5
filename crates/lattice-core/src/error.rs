//! 核心错误域。
//!
//! # 设计背景（Why）
//! - 运行时视图、集合通信与硬件探测在不同层次产生的故障需要合流为统一的
//!   错误形态，日志与上层调度才能按类别执行自动化处置；
//! - 错误码是稳定字符串（`<域>.<语义>` 约定），携带语义；分类枚举对应
//!   处置策略：缺失状态是调用方逻辑错误，缓冲尺寸错误在进入底座前拦截，
//!   底座与编解码失败携带根因向上传播。
//!
//! # 契约说明（What）
//! - 集合操作从不静默降级：任何 rank 上的错误都以 [`CoreError`] 形式在该
//!   rank 上浮出，是否全局中止由应用决定；
//! - 析构路径不抛错，只以 error 级别记录。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use lattice_substrate::SubstrateError;

/// 稳定错误码清单。新增错误码必须同步补充文档与分类。
pub mod codes {
    /// 在空的（默认构造或已被移走的）运行时视图上调用了需要状态的方法。
    pub const RUNTIME_NULL_VIEW: &str = "runtime.null_view";
    /// 资源集合下标越界。
    pub const RUNTIME_RANK_OUT_OF_RANGE: &str = "runtime.rank_out_of_range";
    /// 当前进程不属于该运行时视图的进程组。
    pub const RUNTIME_NOT_A_MEMBER: &str = "runtime.not_a_member";
    /// 在空资源集合上访问了需要状态的成员。
    pub const RESOURCE_SET_NULL: &str = "resource_set.null";
    /// 资源集合没有 RAM 描述符。
    pub const RESOURCE_SET_NO_RAM: &str = "resource_set.no_ram";
    /// 在空 RAM 描述符上发起了集合操作。
    pub const RAM_EMPTY: &str = "ram.empty";
    /// 在空通信器句柄上发起了操作。
    pub const COMM_NULL_HANDLE: &str = "comm.null_handle";
    /// 接收缓冲小于协议要求的尺寸。
    pub const COMM_SHORT_BUFFER: &str = "comm.short_buffer";
    /// 底座原语返回非成功状态。
    pub const COMM_SUBSTRATE_FAILURE: &str = "comm.substrate_failure";
    /// 集合结果缺少本应存在的值（内部协议被破坏）。
    pub const COMM_PROTOCOL: &str = "comm.protocol_violation";
    /// 序列化失败。
    pub const CODEC_ENCODE: &str = "codec.encode_failed";
    /// 反序列化失败。
    pub const CODEC_DECODE: &str = "codec.decode_failed";
    /// 字节重解释失败（长度不是元素宽度的整数倍、非法 UTF-8 等）。
    pub const BINARY_REBUILD: &str = "binary.rebuild_failed";
    /// 载荷声明免序列化却没有暴露字节视图。
    pub const BINARY_NO_VIEW: &str = "binary.no_byte_view";
    /// 拆封器与任务返回类型不匹配。
    pub const TASK_WRONG_UNWRAPPER: &str = "task.wrong_unwrapper";
    /// 日志汇出口打不开。
    pub const LOG_SINK_OPEN: &str = "logging.sink_open_failed";
}

/// 错误的处置分类，对应规格化的五类故障。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 在空对象上访问状态：调用方逻辑错误。
    MissingState,
    /// 用户提供的缓冲与集合尺寸不符，在进入底座前拦截。
    BufferMismatch,
    /// 底座原语失败。
    Substrate,
    /// 分配器失败，原样向上传播。
    Allocation,
    /// 编解码失败，对本次调用致命。
    Serialization,
}

/// `CoreError` 是 lattice 全部可观察错误的最终形态。
///
/// # 契约说明（What）
/// - `code`：稳定的 `'static` 字符串，见 [`codes`]；
/// - `message`：面向排障人员的描述，不含敏感信息；
/// - `category`：驱动上层处置策略；
/// - `cause`：可选根因链，经 [`StdError::source`] 暴露。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(
        code: &'static str,
        category: ErrorCategory,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self { code, category, message: message.into(), cause: None }
    }

    /// 附带底层根因。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 缺失状态类错误的便捷构造。
    pub fn missing_state(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(code, ErrorCategory::MissingState, message)
    }

    /// 接收缓冲不足：在任何底座调用发生之前报告。
    pub fn short_buffer(need: usize, got: usize) -> Self {
        Self::new(
            codes::COMM_SHORT_BUFFER,
            ErrorCategory::BufferMismatch,
            format!("receive buffer holds {got} bytes but the collective needs {need}"),
        )
    }

    /// 把底座错误包装为核心错误并保留根因。
    pub fn substrate(err: SubstrateError) -> Self {
        Self::new(
            codes::COMM_SUBSTRATE_FAILURE,
            ErrorCategory::Substrate,
            format!("substrate primitive failed: {err}"),
        )
        .with_cause(err)
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}

/// 核心 crate 的统一结果别名。
pub type Result<T> = std::result::Result<T, CoreError>;
