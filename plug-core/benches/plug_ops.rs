//! Benchmarks for plug writes, undo/redo and lazy pulls through a chain.
//!
//! Run with: `cargo bench -p plug-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plug_core::{ActionLog, Direction, HistoryConfig, NodeEngine, PlugFlags, PlugGraph, TypedPlug};

/// `src.out -> n0.in => n0.out -> n1.in => ... -> n{len-1}.out`, each node
/// adding one.
fn chain(len: usize) -> (PlugGraph, NodeEngine, TypedPlug<i64>, TypedPlug<i64>) {
    let graph = PlugGraph::new();
    let engine = NodeEngine::new();

    let src_node = graph.add_node("src").unwrap();
    let src = graph
        .add_plug(src_node, "out", Direction::Output, 0_i64, PlugFlags::DEFAULT)
        .unwrap();

    let mut upstream = src.clone();
    for i in 0..len {
        let node = graph.add_node(&format!("n{i}")).unwrap();
        let input = graph
            .add_plug(node, "in", Direction::Input, 0_i64, PlugFlags::DEFAULT)
            .unwrap();
        let output = graph
            .add_plug(node, "out", Direction::Output, 0_i64, PlugFlags::DEFAULT)
            .unwrap();
        graph.declare_affects(&input, &output).unwrap();
        graph.connect(&input, &upstream).unwrap();

        let pull = input.clone();
        engine
            .register_compute(&output, move |engine| Ok(pull.get_value(engine)? + 1))
            .unwrap();
        upstream = output;
    }

    (graph, engine, src, upstream)
}

fn bench_set_value(c: &mut Criterion) {
    let graph = PlugGraph::new();
    let node = graph.add_node("n").unwrap();
    let plug = graph
        .add_plug(node, "x", Direction::Output, 0_i64, PlugFlags::DEFAULT)
        .unwrap();
    let log = ActionLog::with_config(HistoryConfig::default().with_max_undo_steps(1024));

    let mut value = 0_i64;
    c.bench_function("set_value", |b| {
        b.iter(|| {
            value += 1;
            plug.set_value(black_box(value), &log.begin("edit")).unwrap();
        })
    });

    c.bench_function("undo_redo", |b| {
        b.iter(|| {
            log.undo().unwrap();
            log.redo().unwrap();
        })
    });
}

fn bench_chain_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_pull");

    for len in [1, 10, 100] {
        let (_graph, engine, src, tail) = chain(len);
        let log = ActionLog::with_config(HistoryConfig::default().with_record_history(false));
        let mut value = 0_i64;

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                value += 1;
                src.set_value(value, &log.begin("edit")).unwrap();
                black_box(tail.get_value(&engine).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_set_value, bench_chain_pull);
criterion_main!(benches);
