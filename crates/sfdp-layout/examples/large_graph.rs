//! Large graph benchmark (9000 nodes), driven one iteration at a time.
//!
//! Run with: cargo run --example large_graph --release

use std::time::Instant;

use petgraph::graph::UnGraph;
use sfdp_layout::{
    CoolingSchedule, LayoutEngine, LayoutParameters, NoPins, Point, Uniform, UpdatePolicy,
};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let node_count = 9000usize;
    let edge_count = 9000usize;

    println!("=== SFDP Barnes-Hut Layout Benchmark ===");
    println!("Graph: {} nodes, {} edges", node_count, edge_count);
    println!();

    // Initial positions spread in a spiral
    let mut positions: Vec<Point> = (0..node_count)
        .map(|i| {
            let angle = (i as f64) * 0.1;
            let radius = 200.0 + (i as f64) * 0.3;
            Point::new(
                radius * angle.cos() + (i as f64 * 13.37).sin() * 100.0,
                radius * angle.sin() + (i as f64 * 7.13).cos() * 100.0,
            )
        })
        .collect();

    // Path plus pseudo-random chords
    let mut edges: Vec<(u32, u32)> = (1..node_count)
        .map(|i| ((i - 1) as u32, i as u32))
        .collect();
    let remaining = edge_count - (node_count - 1);
    for i in 0..remaining {
        let source = (i * 17) % node_count;
        let target = (i * 31 + 7) % node_count;
        if source != target {
            edges.push((source as u32, target as u32));
        }
    }
    let graph = UnGraph::<(), ()>::from_edges(edges);

    let params = LayoutParameters {
        k: 80.0,
        c: 0.2,
        p: 2.0,
        theta: 0.8,
        init_step: 80.0,
        max_level: 12,
        max_iter: 200,
        cooling: CoolingSchedule::Adaptive,
        update: UpdatePolicy::Snapshot,
        ..Default::default()
    };

    println!("Running layout (θ={}, max_level={})...", params.theta, params.max_level);

    let unit = Uniform(1.0);
    let mut engine = LayoutEngine::new(&graph, &unit, &unit, &NoPins, &params);
    let start = Instant::now();

    loop {
        let stats = match engine.iterate(&mut positions) {
            Ok(Some(stats)) => stats,
            Ok(None) => break,
            Err(e) => {
                eprintln!("layout failed: {e}");
                return;
            }
        };

        if stats.iteration % 20 == 0 {
            let bounds = engine.bounds();
            println!(
                "Iteration {}: step = {:.3}, delta = {:.3}, bounds = ({:.1}, {:.1}) to ({:.1}, {:.1})",
                stats.iteration,
                stats.step,
                stats.delta,
                bounds.lower_left.x,
                bounds.lower_left.y,
                bounds.upper_right.x,
                bounds.upper_right.y
            );
        }
    }

    let elapsed = start.elapsed();
    let iterations = engine.iteration().max(1);
    let per_iter = elapsed.as_secs_f64() * 1000.0 / iterations as f64;

    println!("\nCompleted {} iterations in {:.2?}", engine.iteration(), elapsed);
    println!("Average: {:.1} ms/iteration", per_iter);
}
