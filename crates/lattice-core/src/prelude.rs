//! 常用项一次引入：`use lattice_core::prelude::*;`。

pub use crate::comm::{
    BinaryBuffer, BinaryView, Communicator, ConstBinaryView, Payload, Plus, ReduceOp, Times,
    from_binary_buffer, make_binary_buffer,
};
pub use crate::error::{CoreError, ErrorCategory, Result};
pub use crate::hardware::{Cpu, ProfileInformation, Ram};
pub use crate::hasher::hash_object;
pub use crate::logging::{Logger, LoggerFactory, Severity};
pub use crate::runtime::{ResourceSet, RuntimeView};
pub use crate::task::{ArgumentWrapper, Task, make_task};
