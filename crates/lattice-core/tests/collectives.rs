//! 类型化集合操作的端到端检验：通信器外观 + 线程组底座。

use lattice_core::codec;
use lattice_core::comm::{Communicator, ConstBinaryView, Plus, ReduceOp};
use lattice_core::error::codes;
use lattice_core::payload_via_serde;
use lattice_substrate::CommHandle;
use lattice_substrate_local::launch;
use serde::{Deserialize, Serialize};

fn facade(handle: CommHandle) -> Communicator {
    Communicator::new(handle)
}

#[test]
fn all_gather_of_contiguous_ints_flattens_by_rank() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as i32;
        comm.gather(vec![me; 2], None).unwrap()
    });
    for out in outputs {
        assert_eq!(out, Some(vec![0, 0, 1, 1, 2, 2]));
    }
}

#[test]
fn rooted_gather_returns_a_value_only_on_the_root() {
    let outputs = launch(4, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as f64;
        comm.gather(vec![me], Some(1)).unwrap()
    });
    assert_eq!(outputs[1], Some(vec![0.0, 1.0, 2.0, 3.0]));
    for (rank, out) in outputs.iter().enumerate() {
        if rank != 1 {
            assert_eq!(out, &None, "non-root ranks receive an empty optional");
        }
    }
}

#[test]
fn mixed_length_string_sets_gatherv_in_rank_order() {
    let inputs: [&[&str]; 3] = [&["Hi"], &["Hello", "World"], &["X", "Y", "Z"]];
    let expected_sizes: Vec<usize> = inputs
        .iter()
        .map(|words| {
            let owned: Vec<String> = words.iter().map(|w| w.to_string()).collect();
            codec::encode(&owned).unwrap().len()
        })
        .collect();

    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap();
        let mine: Vec<String> = inputs[me].iter().map(|w| w.to_string()).collect();
        comm.gatherv(mine, None).unwrap()
    });

    let expected: Vec<String> =
        ["Hi", "Hello", "World", "X", "Y", "Z"].iter().map(|w| w.to_string()).collect();
    for out in outputs {
        let (all, sizes) = out.expect("all-variant carries a value everywhere");
        assert_eq!(all, expected);
        assert_eq!(sizes, expected_sizes);
    }
}

#[test]
fn rooted_reduce_with_plus_folds_elementwise() {
    let outputs = launch(4, |handle| {
        let comm = facade(handle);
        let r = comm.me().unwrap() as f64;
        comm.reduce(vec![r, r + 1.0, r + 2.0], Plus, Some(0)).unwrap()
    });
    assert_eq!(outputs[0], Some(vec![6.0, 10.0, 14.0]));
    assert!(outputs[1..].iter().all(Option::is_none));
}

/// 没有原生映射的算子：退化路径必须与原生路径同序折叠。
struct ElemMax;

impl ReduceOp<Vec<f64>> for ElemMax {
    fn combine(&self, a: Vec<f64>, b: Vec<f64>) -> Vec<f64> {
        a.into_iter().zip(b).map(|(x, y)| x.max(y)).collect()
    }
}

#[test]
fn custom_operator_takes_the_gather_fold_fallback_on_every_rank() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as f64;
        comm.reduce(vec![me, -me], ElemMax, None).unwrap()
    });
    for out in outputs {
        assert_eq!(out, Some(vec![2.0, 0.0]));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    v: u8,
}

payload_via_serde!(Reading);

#[test]
fn serialized_payloads_gather_one_value_per_rank() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as u8;
        // 单字节数值编码后等长，满足定长 gather 的约束。
        comm.gather(Reading { v: me }, Some(2)).unwrap()
    });
    assert_eq!(
        outputs[2],
        Some(vec![Reading { v: 0 }, Reading { v: 1 }, Reading { v: 2 }])
    );
    assert!(outputs[0].is_none() && outputs[1].is_none());
}

#[test]
fn string_all_gather_concatenates_in_rank_order() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap();
        comm.gather(format!("r{me}"), None).unwrap()
    });
    for out in outputs {
        assert_eq!(out.as_deref(), Some("r0r1r2"));
    }
}

#[test]
fn undersized_receive_views_fail_before_any_substrate_call() {
    let errors = launch(2, |handle| {
        let comm = facade(handle);
        let data = [0u8; 8];
        let mut small = [0u8; 4];
        comm.gather_binary_into(
            ConstBinaryView::new(&data),
            Some(lattice_core::BinaryView::new(&mut small)),
            None,
        )
        .unwrap_err()
    });
    for err in errors {
        assert_eq!(err.code(), codes::COMM_SHORT_BUFFER);
    }
}

#[test]
fn empty_contributions_are_legal_in_gatherv() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap();
        let mine: Vec<u8> = if me == 1 { Vec::new() } else { vec![me as u8; me + 1] };
        comm.gatherv(mine, None).unwrap()
    });
    for out in outputs {
        let (all, sizes) = out.unwrap();
        assert_eq!(all, vec![0, 2, 2, 2]);
        assert_eq!(sizes, vec![1, 0, 3]);
    }
}

#[test]
fn empty_payloads_gather_to_an_empty_result() {
    let outputs = launch(2, |handle| {
        let comm = facade(handle);
        comm.gather(Vec::<f64>::new(), None).unwrap()
    });
    for out in outputs {
        assert_eq!(out, Some(Vec::new()));
    }
}

#[test]
fn binary_buffers_are_first_class_payloads() {
    let outputs = launch(2, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as u8;
        let buf = lattice_core::BinaryBuffer::from_raw(vec![me, me]);
        comm.gather(buf, None).unwrap()
    });
    for out in outputs {
        assert_eq!(out.unwrap().as_slice(), &[0, 0, 1, 1]);
    }
}

#[test]
fn native_product_and_logical_reductions() {
    use lattice_core::comm::{LogicalAnd, Times};

    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap();
        let product = comm.reduce(vec![(me + 1) as u64], Times, None).unwrap();
        // 每个 rank 的第二道在 rank 0 上为假：逻辑与归一化到 0/1。
        let flags = comm.reduce(vec![1u32, me as u32], LogicalAnd, None).unwrap();
        (product, flags)
    });
    for (product, flags) in outputs {
        assert_eq!(product, Some(vec![6]));
        assert_eq!(flags, Some(vec![1, 0]));
    }
}

#[test]
fn rooted_gather_agrees_with_all_gather() {
    let outputs = launch(3, |handle| {
        let comm = facade(handle);
        let me = comm.me().unwrap() as u64;
        let rooted = comm.gather(vec![me], Some(2)).unwrap();
        let all = comm.gather(vec![me], None).unwrap();
        (rooted, all)
    });
    let all_everywhere = outputs[0].1.clone().unwrap();
    assert_eq!(outputs[2].0.clone().unwrap(), all_everywhere);
    for (rooted, all) in &outputs {
        assert_eq!(all.clone().unwrap(), all_everywhere);
        if let Some(r) = rooted {
            assert_eq!(r, &all_everywhere);
        }
    }
}
