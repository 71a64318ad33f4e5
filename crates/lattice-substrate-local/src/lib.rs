#![deny(unsafe_code)]
#![doc = "lattice-substrate-local: 进程内的底座实现。"]
#![doc = ""]
#![doc = "== 设计动机（Why） =="]
#![doc = "契约的可测试性要求一个不依赖任何外部启动器的底座：用 N 个线程扮演 N 个"]
#![doc = "rank，集合操作通过共享内存里的代际汇合点完成。它不追求吞吐，只追求与"]
#![doc = "契约语义严格一致，包括阻塞配对、按 rank 升序排布、以及对乱序/丢失成员的"]
#![doc = "响亮失败。"]
#![doc = ""]
#![doc = "== 使用方式（How） =="]
#![doc = "```ignore"]
#![doc = "lattice_substrate_local::launch(3, |comm| {"]
#![doc = "    // comm 是当前 rank 的 CommHandle，组大小为 3"]
#![doc = "});"]
#![doc = "```"]
#![doc = ""]
#![doc = "== 风险提示（Trade-offs） =="]
#![doc = "gather 的根变体仍然把所有字节送达每个成员、由非根成员丢弃——对测试底座"]
#![doc = "这是正确性优先的取舍，真实底座（MPI 绑定）不受此影响。"]

mod comm;
mod group;
mod substrate;

pub use comm::LocalComm;
pub use substrate::{LocalSubstrate, launch};
