//! Simple example laying out a small ring-of-cliques graph.
//!
//! Run with: cargo run --example simple_layout

use petgraph::graph::UnGraph;
use sfdp_layout::{
    average_edge_length, sfdp_layout, Bounds, LayoutParameters, NoPins, Point, Uniform,
};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Five 4-cliques joined in a ring
    let cliques = 5u32;
    let size = 4u32;
    let mut edges = Vec::new();
    for c in 0..cliques {
        let base = c * size;
        for a in 0..size {
            for b in (a + 1)..size {
                edges.push((base + a, base + b));
            }
        }
        let next = ((c + 1) % cliques) * size;
        edges.push((base, next));
    }
    let graph = UnGraph::<(), ()>::from_edges(edges);
    let node_count = graph.node_count();

    println!(
        "Graph: {} nodes, {} edges",
        node_count,
        graph.edge_count()
    );

    // Spiral seed positions
    let mut positions: Vec<Point> = (0..node_count)
        .map(|i| {
            let angle = (i as f64) * 0.7;
            let radius = 1.0 + (i as f64) * 0.3;
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();

    let k = average_edge_length(&graph, &positions).unwrap_or(1.0);
    let params = LayoutParameters::default()
        .with_ideal_length(k)
        .with_max_iter(500);

    println!("Running SFDP layout (K = {:.3})...", k);

    let report = match sfdp_layout(
        &graph,
        &mut positions,
        &Uniform(1.0),
        &Uniform(1.0),
        &NoPins,
        &params,
        true,
    ) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("layout failed: {e}");
            return;
        }
    };

    println!(
        "\n{} after {} iterations (delta = {:.4}, energy = {:.4})",
        if report.converged { "Converged" } else { "Stopped" },
        report.iterations,
        report.delta,
        report.energy
    );

    let bounds: Bounds = positions.iter().copied().collect();
    println!(
        "Bounds: ({:.2}, {:.2}) to ({:.2}, {:.2})",
        bounds.lower_left.x, bounds.lower_left.y, bounds.upper_right.x, bounds.upper_right.y
    );

    println!("\nFinal positions (first 5 nodes):");
    for (i, pos) in positions.iter().take(5).enumerate() {
        println!("  Node {}: ({:.2}, {:.2})", i, pos.x, pos.y);
    }
}
