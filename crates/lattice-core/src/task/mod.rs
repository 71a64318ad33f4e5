//! 类型擦除的任务设施：剖析器的工作单元。
//!
//! # 设计背景（Why）
//! - 剖析器要"运行任何东西"，又要让调用点"拿回强类型"。两头兼顾的办法是
//!   把任务擦除成零参调用，把返回值装进不透明载体，同时配发一个以返回
//!   类型参数化的拆封器；
//! - 参数捕获交给闭包完成（语言自带的生命周期正确性），所有权类别需要
//!   显式表达时用 [`ArgumentWrapper`] 暂存。
//!
//! # 契约说明（What）
//! - 任务单发：[`Task::run`] 按值消费任务，二次执行在编译期就不可能；
//! - 任务只移动不复制：没有 `Clone`，捕获的闭包不会被重复执行；
//! - 返回 `()` 的任务产出空载体，对应的拆封器接受空载体并返回 `()`。

mod argument;

pub use argument::ArgumentWrapper;

use crate::error::{CoreError, Result, codes};
use std::any::Any;
use std::marker::PhantomData;

/// 任务返回值的不透明载体。
///
/// 动态类型与被包装调用的返回类型一致；返回 `()` 的调用产出空载体。
pub struct Erased(Option<Box<dyn Any + Send>>);

impl Erased {
    /// 空载体。
    pub fn empty() -> Self {
        Self(None)
    }

    /// 是否为空载体。
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl std::fmt::Debug for Erased {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erased").field("empty", &self.is_empty()).finish()
    }
}

/// 类型擦除的单发任务。只移动，不复制。
///
/// # 契约说明（What）
/// - 运行即消费：[`Task::run`] 拿走 `self`，重复执行无从谈起；
/// - 没有 `Clone`：捕获的闭包不会被意外复制后跑两遍；
/// - 被包装调用抛出（panic）时按原样向上传播，载体不会产生。
pub struct Task {
    invoke: Box<dyn FnOnce() -> Erased + Send>,
}

impl Task {
    /// 包装一个零参调用。参数在闭包里捕获，所有权语义由闭包决定。
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Self {
            invoke: Box::new(move || {
                let boxed: Box<dyn Any + Send> = Box::new(f());
                if boxed.is::<()>() { Erased::empty() } else { Erased(Some(boxed)) }
            }),
        }
    }

    /// 执行任务，按值消费自身。
    pub fn run(self) -> Erased {
        (self.invoke)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Task")
    }
}

/// 以返回类型参数化的拆封器，把载体还原成强类型值（按移动取出）。
pub struct Unwrapper<R> {
    _return: PhantomData<fn() -> R>,
}

impl<R: 'static> Unwrapper<R> {
    fn new() -> Self {
        Self { _return: PhantomData }
    }

    /// 拆出具体值。载体与 `R` 不匹配（配错了拆封器）报逻辑错误。
    pub fn unwrap(&self, carrier: Erased) -> Result<R> {
        let boxed: Box<dyn Any + Send> = match carrier.0 {
            Some(b) => b,
            // 空载体只对 R = () 合法。
            None => Box::new(()),
        };
        boxed.downcast::<R>().map(|b| *b).map_err(|_| {
            CoreError::missing_state(
                codes::TASK_WRONG_UNWRAPPER,
                "carrier type does not match this unwrapper's return type",
            )
        })
    }
}

/// 把调用包装成 `(任务, 拆封器)` 对。
///
/// ```
/// use lattice_core::task::make_task;
///
/// let v = vec![1, 2, 3];
/// let (task, unwrapper) = make_task(move || v.len());
/// let n = unwrapper.unwrap(task.run()).unwrap();
/// assert_eq!(n, 3);
/// ```
pub fn make_task<F, R>(f: F) -> (Task, Unwrapper<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    (Task::new(f), Unwrapper::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moved_capture_reaches_the_callee_without_copy() {
        let v = vec![1, 2, 3];
        let original = v.as_ptr();
        let (task, unwrapper) = make_task(move || v);
        let back: Vec<i32> = unwrapper.unwrap(task.run()).unwrap();
        assert_eq!(back.as_ptr(), original, "storage pointer survives the round trip");
    }

    #[test]
    fn unit_tasks_produce_an_empty_carrier() {
        let (task, unwrapper) = make_task(|| ());
        let carrier = task.run();
        assert!(carrier.is_empty());
        unwrapper.unwrap(carrier).unwrap();
    }

    #[test]
    fn mismatched_unwrapper_is_a_logic_error() {
        let (task, _right) = make_task(|| 7u32);
        let wrong: Unwrapper<String> = Unwrapper::new();
        let err = wrong.unwrap(task.run()).unwrap_err();
        assert_eq!(err.code(), codes::TASK_WRONG_UNWRAPPER);
    }

    #[test]
    fn arguments_staged_by_reference_keep_their_address() {
        let data = vec![1.0f64; 16];
        let staged = ArgumentWrapper::Borrowed(&data);
        let sum: f64 = staged.value().iter().sum();
        assert_eq!(sum, 16.0);
        assert!(std::ptr::eq(staged.value(), &data));
    }
}
