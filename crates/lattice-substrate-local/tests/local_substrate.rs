//! 线程组底座的契约测试：阻塞配对、升序排布、响亮失败。

use lattice_substrate::{AtomId, ReduceOpId, Substrate, SubstrateError};
use lattice_substrate_local::{LocalSubstrate, launch};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[test]
fn allgather_concatenates_by_ascending_rank() {
    let outputs = launch(3, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let send = [comm.rank().unwrap() as u8; 2];
        let mut recv = [0u8; 6];
        comm.gather(&send, Some(&mut recv), None).unwrap();
        recv
    });
    for out in outputs {
        assert_eq!(out, [0, 0, 1, 1, 2, 2]);
    }
}

#[test]
fn rooted_gather_only_fills_the_root() {
    let outputs = launch(4, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let me = comm.rank().unwrap();
        let send = [me as u8];
        if me == 2 {
            let mut recv = [0xFFu8; 4];
            comm.gather(&send, Some(&mut recv), Some(2)).unwrap();
            Some(recv)
        } else {
            comm.gather(&send, None, Some(2)).unwrap();
            None
        }
    });
    assert_eq!(outputs[2], Some([0, 1, 2, 3]));
    assert!(outputs[0].is_none() && outputs[1].is_none() && outputs[3].is_none());
}

#[test]
fn gatherv_places_blocks_at_displacements() {
    let outputs = launch(3, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let me = comm.rank().unwrap();
        // rank i 贡献 i + 1 个字节。
        let send = vec![me as u8; me + 1];
        let counts = [1usize, 2, 3];
        let displs = [0usize, 1, 3];
        let mut recv = [0u8; 6];
        comm.gatherv(&send, Some(&mut recv), &counts, &displs, None).unwrap();
        recv
    });
    for out in outputs {
        assert_eq!(out, [0, 1, 1, 2, 2, 2]);
    }
}

#[test]
fn native_sum_folds_lanes_elementwise() {
    let outputs = launch(4, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let me = comm.rank().unwrap() as f64;
        let send: Vec<u8> =
            [me, me + 1.0, me + 2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut recv = vec![0u8; send.len()];
        comm.reduce(&send, Some(&mut recv), AtomId::F64, ReduceOpId::Sum, None).unwrap();
        recv.chunks_exact(8)
            .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
            .collect::<Vec<_>>()
    });
    for out in outputs {
        assert_eq!(out, vec![6.0, 10.0, 14.0]);
    }
}

#[test]
fn unsupported_reduction_is_reported_not_hung() {
    let errs = launch(2, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let mut recv = [0u8; 8];
        comm.reduce(&1.0f64.to_ne_bytes(), Some(&mut recv), AtomId::F64, ReduceOpId::BitAnd, None)
    });
    for e in errs {
        assert!(matches!(e.unwrap_err(), SubstrateError::UnsupportedReduction { .. }));
    }
}

#[test]
fn mismatched_collectives_poison_the_group() {
    let errs = launch(2, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let me = comm.rank().unwrap();
        let mut recv = [0u8; 2];
        if me == 0 {
            comm.gather(&[0u8], Some(&mut recv), None)
        } else {
            comm.reduce(&[0u8], Some(&mut recv[..1]), AtomId::U8, ReduceOpId::Sum, None)
        }
    });
    let mismatches = errs
        .into_iter()
        .filter(|e| matches!(e, Err(SubstrateError::CollectiveMismatch { .. })))
        .count();
    assert!(mismatches >= 1, "at least the second arriver must observe the mismatch");
}

#[test]
fn lost_rank_turns_hang_into_error() {
    let seen = Mutex::new(None);
    let result = catch_unwind(AssertUnwindSafe(|| {
        launch(2, |comm| {
            let comm = comm.raw().expect("live handle").clone();
            match comm.rank().unwrap() {
                1 => panic!("rank 1 dies before its collective"),
                _ => {
                    let mut recv = [0u8; 2];
                    let err = comm.gather(&[7u8], Some(&mut recv), None).unwrap_err();
                    *seen.lock() = Some(err);
                }
            }
        });
    }));
    assert!(result.is_err(), "the dead rank's panic propagates out of launch");
    assert!(matches!(*seen.lock(), Some(SubstrateError::RankLost { rank: 1 })));
}

#[test]
fn consecutive_collectives_reuse_the_rendezvous_in_order() {
    let outputs = launch(3, |comm| {
        let comm = comm.raw().expect("live handle").clone();
        let me = comm.rank().unwrap() as u8;
        let mut rounds = Vec::new();
        for round in 0..4u8 {
            let mut recv = [0u8; 3];
            comm.gather(&[me.wrapping_add(round)], Some(&mut recv), None).unwrap();
            rounds.push(recv);
        }
        rounds
    });
    for rounds in outputs {
        for (round, recv) in rounds.iter().enumerate() {
            let r = round as u8;
            assert_eq!(recv, &[r, 1 + r, 2 + r]);
        }
    }
}

#[test]
fn substrate_lifecycle_records_ownership_once() {
    let sub = LocalSubstrate::new();
    assert!(sub.ensure_init(&[]).unwrap(), "first init claims ownership");
    assert!(!sub.ensure_init(&[]).unwrap(), "second init adopts");
    assert!(sub.is_initialized());
    assert!(sub.world().is_null(), "no ambient world outside a launch");

    launch(2, |handle| {
        let world = sub.world();
        assert_eq!(world, handle, "ambient world names the launch group");
    });

    sub.finalize().unwrap();
    assert!(!sub.is_initialized());
    assert!(matches!(sub.ensure_init(&[]), Err(SubstrateError::Finalized)));
}
