//! 归约函数对象及其底座映射。
//!
//! # 设计背景（Why）
//! - 归约既要能走底座原生路径（元素有原子映射、算子有原生标识），又要在
//!   任意组合缺失时退化为 gather-后-折叠；函数对象同时携带"怎么合并两个
//!   值"和"底座认不认识我"两份信息；
//! - 算子按元素类型逐一登记而非泛型覆盖：缺失的组合（如浮点按位与）在
//!   编译期就不存在，正对应"无映射是编译期可检验条件"的约定。

use lattice_substrate::ReduceOpId;

/// 二元归约算子。
///
/// `native` 返回底座原生标识；`None` 表示该算子只能走退化路径。
/// `combine` 是语义本体，退化路径按 rank 升序从左到右调用它。
pub trait ReduceOp<T> {
    fn native(&self) -> Option<ReduceOpId> {
        None
    }

    fn combine(&self, a: T, b: T) -> T;
}

/// 逐元素求和。
#[derive(Clone, Copy, Debug, Default)]
pub struct Plus;

/// 逐元素求积。
#[derive(Clone, Copy, Debug, Default)]
pub struct Times;

/// 逻辑与（非零为真，结果写回 0/1）。
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalAnd;

/// 逻辑或。
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalOr;

/// 逻辑异或。
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalXor;

/// 按位与。
#[derive(Clone, Copy, Debug, Default)]
pub struct BitAnd;

/// 按位或。
#[derive(Clone, Copy, Debug, Default)]
pub struct BitOr;

/// 按位异或。
#[derive(Clone, Copy, Debug, Default)]
pub struct BitXor;

macro_rules! register_int_ops {
    ($($t:ty),* $(,)?) => {
        $(
            impl ReduceOp<$t> for Plus {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::Sum)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a.wrapping_add(b)
                }
            }

            impl ReduceOp<$t> for Times {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::Product)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a.wrapping_mul(b)
                }
            }

            impl ReduceOp<$t> for LogicalAnd {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::LogicalAnd)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    ((a != 0) && (b != 0)) as $t
                }
            }

            impl ReduceOp<$t> for LogicalOr {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::LogicalOr)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    ((a != 0) || (b != 0)) as $t
                }
            }

            impl ReduceOp<$t> for LogicalXor {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::LogicalXor)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    ((a != 0) ^ (b != 0)) as $t
                }
            }

            impl ReduceOp<$t> for BitAnd {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::BitAnd)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a & b
                }
            }

            impl ReduceOp<$t> for BitOr {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::BitOr)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a | b
                }
            }

            impl ReduceOp<$t> for BitXor {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::BitXor)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a ^ b
                }
            }
        )*
    };
}

register_int_ops!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize);

macro_rules! register_float_ops {
    ($($t:ty),* $(,)?) => {
        $(
            impl ReduceOp<$t> for Plus {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::Sum)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a + b
                }
            }

            impl ReduceOp<$t> for Times {
                fn native(&self) -> Option<ReduceOpId> {
                    Some(ReduceOpId::Product)
                }
                fn combine(&self, a: $t, b: $t) -> $t {
                    a * b
                }
            }
        )*
    };
}

register_float_ops!(f32, f64);

/// 把逐元素算子提升到向量：对应消息传递惯例里"count 个元素逐道归约"。
macro_rules! lift_to_vec {
    ($($f:ident),* $(,)?) => {
        $(
            impl<T> ReduceOp<Vec<T>> for $f
            where
                $f: ReduceOp<T>,
            {
                fn native(&self) -> Option<ReduceOpId> {
                    <$f as ReduceOp<T>>::native(self)
                }

                fn combine(&self, a: Vec<T>, b: Vec<T>) -> Vec<T> {
                    debug_assert_eq!(a.len(), b.len(), "reduction lanes must agree in length");
                    a.into_iter()
                        .zip(b)
                        .map(|(x, y)| <$f as ReduceOp<T>>::combine(self, x, y))
                        .collect()
                }
            }
        )*
    };
}

lift_to_vec!(Plus, Times, LogicalAnd, LogicalOr, LogicalXor, BitAnd, BitOr, BitXor);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_lifts_elementwise_over_vectors() {
        let folded = Plus.combine(vec![1.0f64, 2.0], vec![10.0, 20.0]);
        assert_eq!(folded, vec![11.0, 22.0]);
        assert_eq!(<Plus as ReduceOp<Vec<f64>>>::native(&Plus), Some(ReduceOpId::Sum));
    }

    #[test]
    fn logical_ops_normalize_to_zero_or_one() {
        assert_eq!(LogicalAnd.combine(7u8, 3), 1);
        assert_eq!(LogicalAnd.combine(7u8, 0), 0);
        assert_eq!(LogicalXor.combine(5i32, 0), 1);
    }

    #[test]
    fn integer_arithmetic_wraps_instead_of_aborting() {
        assert_eq!(Plus.combine(u8::MAX, 1), 0);
        assert_eq!(Times.combine(200u8, 2), 144);
    }
}
