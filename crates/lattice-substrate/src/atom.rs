use serde::{Deserialize, Serialize};

/// `AtomId` 枚举底座在传输层原生支持的标量原子类型。
///
/// # 设计背景（Why）
/// - 类型化集合操作需要在编译期把元素类型映射到底座的原子标识，才能走
///   免序列化的原生路径；映射表在核心 crate 中维护，本枚举只负责命名。
/// - `Byte` 是已序列化负载的统一运输原子：任何经过编解码器的字节流都以
///   `Byte` 原子进入底座。
///
/// # 契约说明（What）
/// - 实现底座的 crate 必须支持对全部成员的定长/变长 gather；
/// - 原生归约允许只覆盖数值成员，遇到不支持的组合返回
///   [`SubstrateError::UnsupportedReduction`](crate::SubstrateError)。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtomId {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    Byte,
}

impl AtomId {
    /// 返回该原子在线上占用的字节宽度。
    pub const fn width(self) -> usize {
        match self {
            AtomId::I8 | AtomId::U8 | AtomId::Bool | AtomId::Byte => 1,
            AtomId::I16 | AtomId::U16 => 2,
            AtomId::I32 | AtomId::U32 | AtomId::F32 => 4,
            AtomId::I64 | AtomId::U64 | AtomId::F64 => 8,
        }
    }
}

/// `ReduceOpId` 枚举底座可以原生执行的归约算子。
///
/// # 契约说明（What）
/// - 与 [`AtomId`] 一样，这里只是命名空间；算子与元素类型的合法组合由实现
///   自行校验。逻辑算子约定非零字节为真，结果写回 0/1。
/// - 核心 crate 的函数对象若查不到对应成员，会退化为 gather-后-折叠 路径，
///   因此实现缺失某个组合只影响性能，不影响语义。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOpId {
    Sum,
    Product,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BitAnd,
    BitOr,
    BitXor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_widths_match_wire_layout() {
        assert_eq!(AtomId::Byte.width(), 1);
        assert_eq!(AtomId::U16.width(), 2);
        assert_eq!(AtomId::F32.width(), 4);
        assert_eq!(AtomId::F64.width(), 8);
    }
}
