//! 运行时视图的生命周期检验：资源集合表、回收栈与集合便捷方法。
//!
//! 这些测试会替换进程全局底座，彼此以一把静态锁串行。

use lattice_core::comm::Plus;
use lattice_core::error::codes;
use lattice_core::runtime::RuntimeView;
use lattice_substrate::{Substrate, install};
use lattice_substrate_local::{LocalSubstrate, launch};
use parking_lot::Mutex;
use std::sync::Arc;

static GUARD: Mutex<()> = Mutex::new(());

/// 安装一个全新的线程组底座并返回它；顺带装好测试用的 tracing 订阅器。
fn fresh_substrate() -> Arc<LocalSubstrate> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let substrate = Arc::new(LocalSubstrate::new());
    install(substrate.clone());
    substrate
}

#[test]
fn resource_set_table_is_lazy_bounds_checked_and_stable() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(3, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        assert_eq!(view.size(), 3);
        assert!(view.has_me());
        assert!(!view.owns_substrate(), "substrate was initialised before the view");

        let mine = view.my_resource_set().unwrap();
        assert!(mine.is_mine());

        for rank in 0..view.size() {
            let set = view.at(rank).unwrap();
            assert_eq!(set.rank(), Some(rank));
            assert_eq!(set.is_mine(), rank == mine.rank().unwrap());
            assert_eq!(view.at(rank).unwrap(), set, "materialised entries are value-stable");
        }
        assert_eq!(view.at(3).unwrap_err().code(), codes::RUNTIME_RANK_OUT_OF_RANGE);
    });
}

#[test]
fn count_discovers_ranks_sharing_this_nodes_memory() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(3, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        let mine = view.my_resource_set().unwrap();
        if mine.has_ram() {
            // 线程组的三个 rank 同处一个节点：名义描述符两两相等。
            assert_eq!(view.count(mine.ram().unwrap()).unwrap(), 3);
        } else {
            // 探测不到 /proc/meminfo 的环境里描述符为空，计数为零。
            assert_eq!(view.count(&lattice_core::Ram::null()).unwrap(), 0);
        }
    });
}

#[test]
fn teardown_drains_callbacks_lifo_and_finalizes_an_owned_substrate() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();

    launch(2, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        // 同步点：确保所有 rank 都完成构造后才允许任何视图析构。
        view.gather(vec![0u8]).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["A", "B", "C"] {
            let order = Arc::clone(&order);
            view.stack_callback(move || order.lock().push(name)).unwrap();
        }
        drop(view);
        assert_eq!(*order.lock(), vec!["C", "B", "A"]);
    });

    // 恰有一个 rank 在构造时真正初始化了底座；它的最后一个引用释放时，
    // 回收栈的栈底条目执行了 finalize。
    assert!(!substrate.is_initialized());
}

#[test]
fn copies_share_state_and_compare_equal() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(2, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        let copy = view.clone();
        assert_eq!(view, copy);
        assert_ne!(view, RuntimeView::null());
        assert_eq!(RuntimeView::null(), RuntimeView::null());

        // 回收栈由所有副本共享：经不同句柄压入，仍然后进先出。
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        view.stack_callback(move || o.lock().push("via-original")).unwrap();
        let o = Arc::clone(&order);
        copy.stack_callback(move || o.lock().push("via-copy")).unwrap();
        drop(view);
        assert!(order.lock().is_empty(), "callbacks wait for the last reference");
        drop(copy);
        assert_eq!(*order.lock(), vec!["via-copy", "via-original"]);
    });
}

#[test]
fn default_construction_adopts_the_ambient_world() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(2, |_handle| {
        let view = RuntimeView::new().unwrap();
        assert_eq!(view.size(), 2);
        assert!(view.has_me());
        assert!(!view.owns_substrate(), "the default form never claims ownership");
    });

    // rank 线程之外没有环境世界：视图是合法的 0 大小视图。
    let outside = RuntimeView::new().unwrap();
    assert_eq!(outside.size(), 0);
    assert!(!outside.has_me());
    assert_eq!(outside.my_resource_set().unwrap_err().code(), codes::RUNTIME_NOT_A_MEMBER);
}

#[test]
fn all_variant_shorthands_deliver_on_every_rank() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(3, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        let me = view.my_resource_set().unwrap().rank().unwrap();

        let ranks = view.gather(vec![me as u64]).unwrap();
        assert_eq!(ranks, vec![0, 1, 2]);

        let (words, sizes) = view.gatherv(vec![format!("w{me}")]).unwrap();
        assert_eq!(words, vec!["w0", "w1", "w2"]);
        assert_eq!(sizes.len(), 3);

        let sums = view.reduce(vec![1.0f64, 2.0], Plus).unwrap();
        assert_eq!(sums, vec![3.0, 6.0]);
    });
}

#[test]
fn rank_zero_speaks_other_ranks_default_to_silence() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    launch(2, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        let me = view.my_resource_set().unwrap().rank().unwrap();
        if me == 0 {
            assert!(!view.logger().is_null());
        } else {
            assert!(view.logger().is_null());
        }
        // 资源集合的进度日志器沿用视图日志器的缺省。
        let mine = view.my_resource_set().unwrap();
        assert_eq!(mine.progress_logger().unwrap().is_null(), me != 0);
        assert!(mine.debug_logger().unwrap().is_null());
    });
}

#[test]
fn ram_rooted_collectives_deliver_to_the_owner_only() {
    let _serial = GUARD.lock();
    let substrate = fresh_substrate();
    substrate.ensure_init(&[]).unwrap();

    let outputs = launch(3, |handle| {
        let view = RuntimeView::from_comm(handle).unwrap();
        let owner_set = view.at(1).unwrap();
        if !owner_set.has_ram() {
            // 没有探测数据的环境：描述符为空，路由无从谈起。
            return None;
        }
        let me = view.my_resource_set().unwrap().rank().unwrap() as u32;
        Some(owner_set.ram().unwrap().gather(vec![me]).unwrap())
    });

    if outputs.iter().all(Option::is_some) {
        assert_eq!(outputs[1], Some(Some(vec![0, 1, 2])));
        assert_eq!(outputs[0], Some(None));
        assert_eq!(outputs[2], Some(None));
    }
}
