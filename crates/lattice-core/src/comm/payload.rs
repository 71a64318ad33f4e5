//! 免序列化判定与载荷特征：类型化集合与字节世界之间的桥。
//!
//! # 设计背景（Why）
//! - 集合操作收到一个用户类型时要回答一个问题：它的字节是不是已经连续、
//!   可以直接上线？答案在编译期由 [`Payload::NEEDS_SERIALIZATION`] 给出——
//!   连续布局的走零拷贝视图，其余走编解码器；
//! - 判定表是开放集合：内建的"免序列化"成员（字符串、标量向量、二进制
//!   缓冲自身）不可移除，应用可以用声明宏把自己的类型登记到任一路径。
//!
//! # 契约说明（What）
//! - `Gathered` 与 `assemble` 服务于集合层的返回类型映射：容器类载荷拼接
//!   （跨 rank 压扁），标量类载荷收集为 `Vec<Self>`（每 rank 一个）；
//! - `byte_view` 在免序列化时必须返回 `Some`，集合层据此构造发送视图。

use crate::comm::binary::{BinaryBuffer, ConstBinaryView};
use crate::error::{CoreError, ErrorCategory, Result, codes};
use lattice_substrate::AtomId;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// 平凡可复制的标量元素：字节重解释在两个方向上都合法。
///
/// `ATOM` 是元素到底座原子的映射；平台相关宽度的 `usize`/`isize` 留空，
/// 它们能走零拷贝 gather，但原生归约会退化到 gather-折叠路径。
pub trait Scalar:
    FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Send + Sync + 'static
{
    const ATOM: Option<AtomId>;
}

macro_rules! register_scalar {
    ($($t:ty => $atom:expr),* $(,)?) => {
        $(
            impl Scalar for $t {
                const ATOM: Option<AtomId> = $atom;
            }
        )*
    };
}

register_scalar!(
    u8 => Some(AtomId::U8),
    i8 => Some(AtomId::I8),
    u16 => Some(AtomId::U16),
    i16 => Some(AtomId::I16),
    u32 => Some(AtomId::U32),
    i32 => Some(AtomId::I32),
    u64 => Some(AtomId::U64),
    i64 => Some(AtomId::I64),
    f32 => Some(AtomId::F32),
    f64 => Some(AtomId::F64),
    usize => None,
    isize => None,
);

/// 可参与集合操作的载荷。
///
/// # 逻辑解析（How）
/// - `NEEDS_SERIALIZATION == false` 的类型保证 `byte_view` 返回 `Some`，
///   并且 `from_binary` 是字节重解释（长度必须整除元素宽度）；
/// - 其余类型经 [`codec`]（serde）往返，`from_binary` 运行解码器；
/// - `ELEM_ATOM` 供归约层判断能否走底座原生路径。
pub trait Payload: Sized {
    /// 该类型上线前是否需要序列化。
    const NEEDS_SERIALIZATION: bool;

    /// 元素对应的底座原子；无原生映射时为 `None`。
    const ELEM_ATOM: Option<AtomId> = None;

    /// 全组聚合后的返回形态。
    type Gathered;

    /// 复制出一份字节形态（左值路径）。
    fn to_binary(&self) -> Result<BinaryBuffer>;

    /// 移动进字节形态（右值路径；免序列化类型零拷贝）。
    fn into_binary(self) -> Result<BinaryBuffer>;

    /// 从字节形态重建值。
    fn from_binary(bytes: &[u8]) -> Result<Self>;

    /// 免序列化类型暴露的只读字节视图。
    fn byte_view(&self) -> Option<ConstBinaryView<'_>> {
        None
    }

    /// 把按 rank 升序重建出的各方载荷组装成聚合结果。
    fn assemble(parts: Vec<Self>) -> Self::Gathered;

    /// 免序列化路径：直接由全组拼接字节构造聚合结果。
    fn gathered_from_buffer(_buffer: BinaryBuffer) -> Result<Self::Gathered> {
        Err(CoreError::new(
            codes::COMM_PROTOCOL,
            ErrorCategory::Serialization,
            "payload takes the serialized gather path; concatenated reconstruction is undefined",
        ))
    }
}

fn rebuild_error(detail: &'static str) -> CoreError {
    CoreError::new(codes::BINARY_REBUILD, ErrorCategory::Serialization, detail)
}

fn vec_from_bytes<T: Scalar>(bytes: &[u8]) -> Result<Vec<T>> {
    let width = size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(rebuild_error("byte length is not a multiple of the element width"));
    }
    bytes
        .chunks_exact(width)
        .map(|c| T::read_from_bytes(c).map_err(|_| rebuild_error("element reinterpret failed")))
        .collect()
}

fn scalar_from_bytes<T: Scalar>(bytes: &[u8]) -> Result<T> {
    if bytes.len() != size_of::<T>() {
        return Err(rebuild_error("byte length does not match the scalar width"));
    }
    T::read_from_bytes(bytes).map_err(|_| rebuild_error("scalar reinterpret failed"))
}

/// 登记标量与标量向量到免序列化路径。
///
/// 不用泛型 blanket 实现而用逐类型展开，是为了让"免序列化集合"保持开放：
/// 应用可以对自己的容器类型给出专门实现而不与本表冲突。
macro_rules! register_scalar_payloads {
    ($($t:ty),* $(,)?) => {
        $(
            impl Payload for $t {
                const NEEDS_SERIALIZATION: bool = false;
                const ELEM_ATOM: Option<AtomId> = <$t as Scalar>::ATOM;
                type Gathered = Vec<$t>;

                fn to_binary(&self) -> Result<BinaryBuffer> {
                    Ok(BinaryBuffer::from_typed(vec![*self]))
                }

                fn into_binary(self) -> Result<BinaryBuffer> {
                    Ok(BinaryBuffer::from_typed(vec![self]))
                }

                fn from_binary(bytes: &[u8]) -> Result<Self> {
                    scalar_from_bytes(bytes)
                }

                fn byte_view(&self) -> Option<ConstBinaryView<'_>> {
                    Some(ConstBinaryView::of_typed(std::slice::from_ref(self)))
                }

                fn assemble(parts: Vec<Self>) -> Self::Gathered {
                    parts
                }

                fn gathered_from_buffer(buffer: BinaryBuffer) -> Result<Self::Gathered> {
                    vec_from_bytes(buffer.as_slice())
                }
            }

            impl Payload for Vec<$t> {
                const NEEDS_SERIALIZATION: bool = false;
                const ELEM_ATOM: Option<AtomId> = <$t as Scalar>::ATOM;
                type Gathered = Vec<$t>;

                fn to_binary(&self) -> Result<BinaryBuffer> {
                    Ok(BinaryBuffer::from_typed(self.clone()))
                }

                fn into_binary(self) -> Result<BinaryBuffer> {
                    Ok(BinaryBuffer::from_typed(self))
                }

                fn from_binary(bytes: &[u8]) -> Result<Self> {
                    vec_from_bytes(bytes)
                }

                fn byte_view(&self) -> Option<ConstBinaryView<'_>> {
                    Some(ConstBinaryView::of_typed(self.as_slice()))
                }

                fn assemble(parts: Vec<Self>) -> Self::Gathered {
                    parts.into_iter().flatten().collect()
                }

                fn gathered_from_buffer(buffer: BinaryBuffer) -> Result<Self::Gathered> {
                    vec_from_bytes(buffer.as_slice())
                }
            }
        )*
    };
}

register_scalar_payloads!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

impl Payload for String {
    const NEEDS_SERIALIZATION: bool = false;
    type Gathered = String;

    fn to_binary(&self) -> Result<BinaryBuffer> {
        Ok(BinaryBuffer::from_raw(self.clone().into_bytes()))
    }

    fn into_binary(self) -> Result<BinaryBuffer> {
        Ok(BinaryBuffer::from_text(self))
    }

    fn from_binary(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| rebuild_error("gathered bytes are not valid UTF-8").with_cause(e))
    }

    fn byte_view(&self) -> Option<ConstBinaryView<'_>> {
        Some(ConstBinaryView::new(self.as_bytes()))
    }

    fn assemble(parts: Vec<Self>) -> Self::Gathered {
        parts.concat()
    }

    fn gathered_from_buffer(buffer: BinaryBuffer) -> Result<Self::Gathered> {
        String::from_utf8(buffer.into_raw())
            .map_err(|e| rebuild_error("gathered bytes are not valid UTF-8").with_cause(e))
    }
}

impl Payload for BinaryBuffer {
    const NEEDS_SERIALIZATION: bool = false;
    const ELEM_ATOM: Option<AtomId> = Some(AtomId::Byte);
    type Gathered = BinaryBuffer;

    fn to_binary(&self) -> Result<BinaryBuffer> {
        Ok(self.clone())
    }

    fn into_binary(self) -> Result<BinaryBuffer> {
        Ok(self)
    }

    fn from_binary(bytes: &[u8]) -> Result<Self> {
        Ok(BinaryBuffer::from_raw(bytes.to_vec()))
    }

    fn byte_view(&self) -> Option<ConstBinaryView<'_>> {
        Some(self.view())
    }

    fn assemble(parts: Vec<Self>) -> Self::Gathered {
        let mut all = Vec::with_capacity(parts.iter().map(BinaryBuffer::len).sum());
        for p in parts {
            all.extend_from_slice(p.as_slice());
        }
        BinaryBuffer::from_raw(all)
    }

    fn gathered_from_buffer(buffer: BinaryBuffer) -> Result<Self::Gathered> {
        Ok(buffer)
    }
}

/// 把一个 serde 类型登记到序列化路径；聚合形态为"每 rank 一个值"。
#[macro_export]
macro_rules! payload_via_serde {
    ($t:ty) => {
        impl $crate::comm::Payload for $t {
            const NEEDS_SERIALIZATION: bool = true;
            type Gathered = ::std::vec::Vec<$t>;

            fn to_binary(&self) -> $crate::Result<$crate::BinaryBuffer> {
                ::std::result::Result::Ok($crate::BinaryBuffer::from_raw(
                    $crate::codec::encode(self)?,
                ))
            }

            fn into_binary(self) -> $crate::Result<$crate::BinaryBuffer> {
                <Self as $crate::comm::Payload>::to_binary(&self)
            }

            fn from_binary(bytes: &[u8]) -> $crate::Result<Self> {
                $crate::codec::decode(bytes)
            }

            fn assemble(parts: ::std::vec::Vec<Self>) -> Self::Gathered {
                parts
            }
        }
    };
}

/// 把一个 serde 序列类型登记到序列化路径；聚合形态为跨 rank 压扁的序列。
#[macro_export]
macro_rules! payload_seq_via_serde {
    ($t:ty) => {
        impl $crate::comm::Payload for $t {
            const NEEDS_SERIALIZATION: bool = true;
            type Gathered = $t;

            fn to_binary(&self) -> $crate::Result<$crate::BinaryBuffer> {
                ::std::result::Result::Ok($crate::BinaryBuffer::from_raw(
                    $crate::codec::encode(self)?,
                ))
            }

            fn into_binary(self) -> $crate::Result<$crate::BinaryBuffer> {
                <Self as $crate::comm::Payload>::to_binary(&self)
            }

            fn from_binary(bytes: &[u8]) -> $crate::Result<Self> {
                $crate::codec::decode(bytes)
            }

            fn assemble(parts: ::std::vec::Vec<Self>) -> Self::Gathered {
                let mut parts = parts.into_iter();
                let mut merged = parts.next().unwrap_or_default();
                for p in parts {
                    ::std::iter::Extend::extend(&mut merged, p);
                }
                merged
            }
        }
    };
}

payload_seq_via_serde!(Vec<String>);

/// 把任意载荷变成二进制缓冲（移动路径；免序列化类型零拷贝）。
///
/// # 决策树（How）
/// - 免序列化类型：缓冲直接接管对象的存储，字节是存储的重新解释，
///   `len()` 等于 `元素个数 × 元素宽度`；
/// - 其余类型：经编解码器写成字节流，缓冲拥有该流。
///
/// ```
/// use lattice_core::comm::{from_binary_buffer, make_binary_buffer};
///
/// let b = make_binary_buffer(vec![1.1f64, 1.2, 1.3]).unwrap();
/// assert_eq!(b.len(), 24);
/// let back: Vec<f64> = from_binary_buffer(&b).unwrap();
/// assert_eq!(back, vec![1.1, 1.2, 1.3]);
///
/// let b = make_binary_buffer(vec!["Hello".to_string(), "World".to_string()]).unwrap();
/// let back: Vec<String> = from_binary_buffer(&b).unwrap();
/// assert_eq!(back, vec!["Hello", "World"]);
/// ```
pub fn make_binary_buffer<T: Payload>(x: T) -> Result<BinaryBuffer> {
    x.into_binary()
}

/// [`make_binary_buffer`] 的逆操作。
///
/// 免序列化类型按"双迭代器区间构造"的语义从字节重建（长度必须整除元素
/// 宽度）；其余类型运行解码器。失败都归入 `Serialization` 分类。
pub fn from_binary_buffer<T: Payload>(buffer: &BinaryBuffer) -> Result<T> {
    T::from_binary(buffer.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        label: String,
        weights: Vec<f64>,
    }

    crate::payload_via_serde!(Sample);

    #[test]
    fn contiguous_doubles_round_trip_without_serialization() {
        let x = vec![1.1f64, 1.2, 1.3];
        assert!(!<Vec<f64> as Payload>::NEEDS_SERIALIZATION);
        let b = make_binary_buffer(x.clone()).unwrap();
        assert_eq!(b.len(), 24);
        let y: Vec<f64> = from_binary_buffer(&b).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn string_containers_round_trip_through_the_codec() {
        let x = vec!["Hello".to_string(), "World".to_string()];
        assert!(<Vec<String> as Payload>::NEEDS_SERIALIZATION);
        let b = make_binary_buffer(x.clone()).unwrap();
        let y: Vec<String> = from_binary_buffer(&b).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn custom_types_register_on_the_serialized_path() {
        let x = Sample { label: "w".into(), weights: vec![0.5, 0.25] };
        let b = make_binary_buffer(x.clone()).unwrap();
        let y: Sample = from_binary_buffer(&b).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn misaligned_length_is_a_rebuild_error() {
        let b = BinaryBuffer::from_raw(vec![0u8; 7]);
        let err = from_binary_buffer::<Vec<f64>>(&b).unwrap_err();
        assert_eq!(err.code(), codes::BINARY_REBUILD);
    }

    #[test]
    fn assemble_flattens_containers_and_collects_scalars() {
        let flat = <Vec<u32> as Payload>::assemble(vec![vec![1, 2], vec![3]]);
        assert_eq!(flat, vec![1, 2, 3]);
        let per_rank = <u32 as Payload>::assemble(vec![1, 2, 3]);
        assert_eq!(per_rank, vec![1, 2, 3]);
        let text = <String as Payload>::assemble(vec!["a".into(), "b".into()]);
        assert_eq!(text, "ab");
    }

    proptest! {
        #[test]
        fn prop_pod_vectors_round_trip(xs in proptest::collection::vec(any::<i64>(), 0..64)) {
            let b = make_binary_buffer(xs.clone()).unwrap();
            prop_assert_eq!(b.len(), xs.len() * 8);
            let ys: Vec<i64> = from_binary_buffer(&b).unwrap();
            prop_assert_eq!(xs, ys);
        }

        #[test]
        fn prop_strings_round_trip(s in ".*") {
            let b = make_binary_buffer(s.clone()).unwrap();
            let t: String = from_binary_buffer(&b).unwrap();
            prop_assert_eq!(s, t);
        }
    }
}
