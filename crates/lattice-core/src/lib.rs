#![deny(unsafe_code)]
#![doc = "lattice-core: 面向科学计算与高性能计算应用的并行运行时核心。"]
#![doc = ""]
#![doc = "== 对象模型 =="]
#![doc = "一个由分布式启动器拉起的程序在这里被抽象成一棵协作对象树："]
#![doc = "[`runtime::RuntimeView`] 是程序级共享视图，按 rank 物化"]
#![doc = "[`runtime::ResourceSet`]；资源集合持有 [`hardware::Ram`] 描述符与"]
#![doc = "进度/调试日志器；类型化集合通信（gather / gatherv / reduce）经"]
#![doc = "[`comm::Communicator`] 外观流向底座，载荷是否需要序列化由"]
#![doc = "[`comm::Payload`] 在编译期判定。剖析器以 [`task`] 模块的类型擦除"]
#![doc = "任务为工作单元。"]
#![doc = ""]
#![doc = "== 并发模型 =="]
#![doc = "核心在单个进程内是单线程的：并发表达为多个进程运行同一份代码、经"]
#![doc = "底座的集合原语协调。所有集合调用都阻塞当前进程直到底座返回；同一"]
#![doc = "通信器上按相同顺序发起的调用按该顺序配对。"]
#![doc = ""]
#![doc = "== 快速上手 =="]
#![doc = "```ignore"]
#![doc = "use lattice_core::prelude::*;"]
#![doc = ""]
#![doc = "let rt = RuntimeView::new()?;"]
#![doc = "let me = rt.my_resource_set()?;"]
#![doc = "let totals = rt.gather(vec![me.ram()?.total_space()])?;"]
#![doc = "rt.logger().info(&format!(\"cluster ram: {totals:?}\"));"]
#![doc = "```"]

pub mod codec;
pub mod comm;
pub mod error;
pub mod hardware;
pub mod hasher;
pub mod logging;
pub mod prelude;
pub mod runtime;
pub mod task;
pub mod test_stubs;

pub use comm::{BinaryBuffer, BinaryView, Communicator, ConstBinaryView, Payload};
pub use error::{CoreError, ErrorCategory, Result};
pub use hardware::{Cpu, Ram};
pub use logging::{Logger, LoggerFactory, Severity};
pub use runtime::{ResourceSet, RuntimeView};
