//! 二进制缓冲与视图：集合通信的数据平面地基。
//!
//! # 设计背景（Why）
//! - 所有集合操作最终都在连续字节上进行；拥有所有权的 [`BinaryBuffer`] 与
//!   非拥有的 [`BinaryView`]/[`ConstBinaryView`] 把"谁负责这段内存"在类型
//!   层面说清楚；
//! - 缓冲的后备存储是多态的：原始字节、从 `String` 偷来的分配、以及任意
//!   标量元素的 `Vec<T>`。把不同后备藏在一个存储接口后面，免序列化路径
//!   就能做到移动构造零拷贝。
//!
//! # 契约说明（What）
//! - 不变式：`len() == 0` 当且仅当缓冲不含字节；空缓冲迭代良定义、产出
//!   为空；
//! - 相等性是字节逐一比较，与后备存储种类无关；
//! - 深拷贝走存储克隆，移动走 Rust move（指针易主）。

use crate::comm::payload::Scalar;
use std::fmt;
use zerocopy::IntoBytes;

/// 缓冲后备存储的内部契约。
///
/// 对象安全，擦除元素类型；`into_raw` 供需要拿走分配的消费方使用（原始
/// 字节后备零拷贝，类型化后备退化为一次复制）。
trait BinaryStorage: Send + Sync {
    fn as_bytes(&self) -> &[u8];
    fn as_bytes_mut(&mut self) -> &mut [u8];
    fn clone_storage(&self) -> Box<dyn BinaryStorage>;
    fn into_raw(self: Box<Self>) -> Vec<u8>;
}

struct RawStorage(Vec<u8>);

impl BinaryStorage for RawStorage {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    fn clone_storage(&self) -> Box<dyn BinaryStorage> {
        Box::new(RawStorage(self.0.clone()))
    }

    fn into_raw(self: Box<Self>) -> Vec<u8> {
        self.0
    }
}

struct TypedStorage<T: Scalar>(Vec<T>);

impl<T: Scalar> BinaryStorage for TypedStorage<T> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_slice().as_bytes()
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.0.as_mut_slice().as_mut_bytes()
    }

    fn clone_storage(&self) -> Box<dyn BinaryStorage> {
        Box::new(TypedStorage(self.0.clone()))
    }

    fn into_raw(self: Box<Self>) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// 拥有所有权的连续字节缓冲。
///
/// # 逻辑解析（How）
/// - `storage` 为 `None` 表示默认构造的空缓冲，与"包着 0 字节存储"的缓冲
///   不可区分——两者 `len()` 都是 0，相等性也一致；
/// - 类型化构造（[`BinaryBuffer::from_typed`]）把 `Vec<T>` 整体移进缓冲，
///   字节是元素存储的重新解释，没有复制。
///
/// # 契约说明（What）
/// - 不变式：`len() == 0` ⇔ 缓冲不含字节 ⇔ `as_slice()` 为空切片；
/// - 拷贝是深拷贝（经存储克隆），移动偷走存储指针，[`swap`](Self::swap)
///   交换存储指针——三者都不触碰字节本身；
/// - 相等性按字节逐一比较，两个后备种类不同但字节一致的缓冲相等。
///
/// ```
/// use lattice_core::BinaryBuffer;
///
/// let a = BinaryBuffer::from_text("Hello".to_string());
/// let b = BinaryBuffer::from_raw(b"Hello".to_vec());
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 5);
/// assert!(BinaryBuffer::new().iter().next().is_none());
/// ```
pub struct BinaryBuffer {
    storage: Option<Box<dyn BinaryStorage>>,
}

impl BinaryBuffer {
    /// 创建空缓冲。
    pub fn new() -> Self {
        Self { storage: None }
    }

    /// 创建 `n` 个零字节的缓冲，用作集合操作的接收区。
    pub fn zeroed(n: usize) -> Self {
        if n == 0 {
            return Self::new();
        }
        Self { storage: Some(Box::new(RawStorage(vec![0; n]))) }
    }

    /// 用现成的字节向量构造缓冲（移动，零拷贝）。
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self { storage: Some(Box::new(RawStorage(bytes))) }
    }

    /// 偷走 `String` 的分配构造缓冲（移动，零拷贝）。
    pub fn from_text(text: String) -> Self {
        Self::from_raw(text.into_bytes())
    }

    /// 把标量向量整体移进缓冲，字节为元素存储的重新解释。
    pub fn from_typed<T: Scalar>(elems: Vec<T>) -> Self {
        Self { storage: Some(Box::new(TypedStorage(elems))) }
    }

    /// 缓冲的字节数。后备元素比字节宽时仍按字节计。
    pub fn len(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.as_bytes().len())
    }

    /// 是否为空缓冲。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 只读字节切片；空缓冲返回空切片。
    pub fn as_slice(&self) -> &[u8] {
        self.storage.as_ref().map_or(&[], |s| s.as_bytes())
    }

    /// 可写字节切片；空缓冲返回空切片。
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.storage.as_mut().map_or(&mut [], |s| s.as_bytes_mut())
    }

    /// 按字节迭代。空缓冲迭代良定义，产出为空。
    pub fn iter(&self) -> std::slice::Iter<'_, u8> {
        self.as_slice().iter()
    }

    /// 交换两个缓冲的存储指针。
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.storage, &mut other.storage);
    }

    /// 拿走缓冲的字节。原始字节后备零拷贝，类型化后备复制一次。
    pub fn into_raw(self) -> Vec<u8> {
        self.storage.map_or_else(Vec::new, |s| s.into_raw())
    }

    /// 只读视图。
    pub fn view(&self) -> ConstBinaryView<'_> {
        ConstBinaryView::new(self.as_slice())
    }

    /// 读写视图。
    pub fn view_mut(&mut self) -> BinaryView<'_> {
        BinaryView::new(self.as_mut_slice())
    }
}

impl Default for BinaryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BinaryBuffer {
    fn clone(&self) -> Self {
        Self { storage: self.storage.as_ref().map(|s| s.clone_storage()) }
    }
}

impl PartialEq for BinaryBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for BinaryBuffer {}

impl fmt::Debug for BinaryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryBuffer").field("len", &self.len()).finish()
    }
}

/// 读写的非拥有字节视图。
///
/// 视图只是 `(起点, 字节长)` 的别名对；安全 Rust 的切片构造保证了"空指针
/// 配非零长度"这种状态不可表示。
pub struct BinaryView<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BinaryView<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// 把标量切片看作可写字节。
    pub fn of_typed<T: Scalar>(elems: &'a mut [T]) -> Self {
        Self { bytes: elems.as_mut_bytes() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// 解包出底层可写切片，交还完整借用期。
    pub fn into_mut_slice(self) -> &'a mut [u8] {
        self.bytes
    }
}

impl PartialEq for BinaryView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl fmt::Debug for BinaryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryView").field("len", &self.len()).finish()
    }
}

/// 只读的非拥有字节视图。可由读写视图隐式收窄而来。
#[derive(Clone, Copy)]
pub struct ConstBinaryView<'a> {
    bytes: &'a [u8],
}

impl<'a> ConstBinaryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// 把标量切片看作只读字节。
    pub fn of_typed<T: Scalar>(elems: &'a [T]) -> Self {
        Self { bytes: elems.as_bytes() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a BinaryView<'_>> for ConstBinaryView<'a> {
    fn from(view: &'a BinaryView<'_>) -> Self {
        Self { bytes: view.as_slice() }
    }
}

impl<'a> From<&'a BinaryBuffer> for ConstBinaryView<'a> {
    fn from(buffer: &'a BinaryBuffer) -> Self {
        buffer.view()
    }
}

impl PartialEq for ConstBinaryView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ConstBinaryView<'_> {}

impl fmt::Debug for ConstBinaryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstBinaryView").field("len", &self.len()).finish()
    }
}
