//! 单机演示：拉起 4 个 rank，汇总各自的内存描述与一次剖析结果。
//!
//! ```text
//! cargo run -p lattice-core --example cluster_report
//! ```

use lattice_core::prelude::*;
use lattice_substrate_local::launch;

fn main() -> Result<()> {
    launch(4, |handle| -> Result<()> {
        let rt = RuntimeView::from_comm(handle)?;
        let mine = rt.my_resource_set()?;
        let me = mine.rank().expect("member rank");

        // 每个 rank 剖析一段本地计算，再把耗时（纳秒）汇聚到所有 rank。
        let (local_sum, info) = Cpu.profile_call(move || {
            (0..1_000_000u64).map(|i| (i % 97) as f64).sum::<f64>()
        })?;
        let wall = vec![info.wall_time.as_nanos() as u64];
        let walls = rt.gather(wall)?;

        let totals = rt.gather(vec![mine.ram().map(Ram::total_space).unwrap_or(0)])?;

        if me == 0 {
            let log = rt.logger();
            let cpu = Cpu.info();
            log.info(&format!("ranks: {}", rt.size()));
            log.info(&format!("node cpu: {} x {}", cpu.logical_cores, cpu.model_name));
            log.info(&format!("per-rank ram bytes: {totals:?}"));
            log.info(&format!("per-rank profile ns: {walls:?}"));
            log.info(&format!("rank 0 local sum: {local_sum}"));
            log.info(&format!("cluster fingerprint: {}", hash_object(&totals)?));
        }
        Ok(())
    })
    .into_iter()
    .collect::<Result<()>>()
}
