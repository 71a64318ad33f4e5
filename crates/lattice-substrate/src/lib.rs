#![deny(unsafe_code)]
#![doc = "lattice-substrate: 并行运行时底座契约。"]
#![doc = ""]
#![doc = "== 定位 =="]
#![doc = "`lattice` 把一个分布式启动器拉起的多进程程序抽象为一组协作的资源集合，"]
#![doc = "而进程间的消息传递能力由一个可替换的\"底座\"（substrate）提供。本 crate 只"]
#![doc = "定义底座必须满足的契约：不透明的通信器句柄、字节级集合原语（定长 gather、"]
#![doc = "变长 gatherv、原生归约）、进程组比较以及 init/finalize 生命周期。"]
#![doc = ""]
#![doc = "== 实现者须知 =="]
#![doc = "1. 契约全部以对象安全 trait 表达，实现 crate（如 `lattice-substrate-local`）"]
#![doc = "   不得要求调用方感知具体类型；"]
#![doc = "2. 所有集合调用都是阻塞语义：同一通信器上按相同顺序发起的调用按该顺序配对；"]
#![doc = "3. 官方单进程桩 `SelfComm` 随契约一起维护，保证零部署环境下契约可用。"]

mod atom;
mod comm;
mod error;
mod registry;
mod stub;

pub use atom::{AtomId, ReduceOpId};
pub use comm::{CommHandle, RawComm, Rank, fresh_group_token};
pub use error::SubstrateError;
pub use registry::{Substrate, global, install};
pub use stub::{SelfComm, SelfSubstrate};
