//! 参数包装：把"按什么方式传入"显式化为所有权类别。
//!
//! # 设计背景（Why）
//! - 剖析器要先暂存参数、稍后再调用；暂存时必须既不意外延长生命周期，
//!   也不提前丢弃：按值传入的参数所有权移进包装，按引用传入的保持别名。
//!   Rust 的借用检查器会强制别名类别在调用点仍然有效，这正是我们要的。
//!
//! # 契约说明（What）
//! - `value()` 总是可用；`value_mut()` 只对可变类别（独占借用或持有值）
//!   返回 `Some`；`into_owned()` 在需要按值交给被调函数时使用，别名类别
//!   付出一次克隆。

/// 按所有权类别持有一个参数。
#[derive(Debug)]
pub enum ArgumentWrapper<'a, T> {
    /// 持有值：按值或右值传入，生命周期延长到包装内部。
    Owned(T),
    /// 共享别名：按只读引用传入，生命周期向调用方借。
    Borrowed(&'a T),
    /// 独占别名：按可变引用传入。
    BorrowedMut(&'a mut T),
}

impl<'a, T> ArgumentWrapper<'a, T> {
    /// 只读访问被包装的参数。
    pub fn value(&self) -> &T {
        match self {
            ArgumentWrapper::Owned(v) => v,
            ArgumentWrapper::Borrowed(v) => v,
            ArgumentWrapper::BorrowedMut(v) => v,
        }
    }

    /// 可变访问；共享别名类别返回 `None`。
    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            ArgumentWrapper::Owned(v) => Some(v),
            ArgumentWrapper::Borrowed(_) => None,
            ArgumentWrapper::BorrowedMut(v) => Some(v),
        }
    }

    /// 是否持有值（而非别名）。
    pub fn is_owned(&self) -> bool {
        matches!(self, ArgumentWrapper::Owned(_))
    }
}

impl<'a, T: Clone> ArgumentWrapper<'a, T> {
    /// 取出按值形态：持有值时移动，别名类别克隆。
    pub fn into_owned(self) -> T {
        match self {
            ArgumentWrapper::Owned(v) => v,
            ArgumentWrapper::Borrowed(v) => v.clone(),
            ArgumentWrapper::BorrowedMut(v) => v.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowed_categories_alias_the_callers_object() {
        let v = vec![1, 2, 3];
        let wrapped = ArgumentWrapper::Borrowed(&v);
        assert!(std::ptr::eq(wrapped.value(), &v));
        assert!(!wrapped.is_owned());
    }

    #[test]
    fn owned_category_holds_its_own_copy() {
        let v = vec![1, 2, 3];
        let original = v.as_ptr();
        let wrapped = ArgumentWrapper::Owned(v);
        // 移动保留了底层分配，但被包装对象本身已不再是调用方的那一个。
        assert_eq!(wrapped.value().as_ptr(), original);
        assert!(wrapped.is_owned());
        let back = wrapped.into_owned();
        assert_eq!(back.as_ptr(), original, "move in, move out, no reallocation");
    }

    #[test]
    fn mutable_alias_writes_through() {
        let mut v = 41;
        {
            let mut wrapped = ArgumentWrapper::BorrowedMut(&mut v);
            *wrapped.value_mut().expect("mutable category") += 1;
        }
        assert_eq!(v, 42);
    }

    #[test]
    fn shared_alias_refuses_mutation() {
        let v = 0u8;
        let mut wrapped = ArgumentWrapper::Borrowed(&v);
        assert!(wrapped.value_mut().is_none());
    }
}
