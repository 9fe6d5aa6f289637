//! The SFDP iteration loop.
//!
//! Each iteration builds a fresh quadtree from the current positions,
//! computes one force per unpinned vertex (Barnes-Hut repulsion plus exact
//! edge attraction), moves every vertex `step` units along its force, and
//! lets the cooling schedule pick the next step. The force pass is the only
//! parallel part; moves, sums and the schedule decision are reduced in
//! vertex order so a run does not depend on the thread count.

use rayon::prelude::*;
use tracing::{info, trace};

use crate::force::{attraction, distance, normalize, repulsion, unit_direction_and_distance};
use crate::graph::{EdgeWeights, LayoutGraph, PinMap, VertexId, VertexWeights};
use crate::quadtree::{NodeIndex, QuadTree};
use crate::schedule::StepSchedule;
use crate::{Bounds, LayoutError, LayoutParameters, Point, Result, UpdatePolicy};

/// Current state of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// Bounds not computed yet.
    Initializing,
    /// Iterations are still being run.
    Iterating,
    /// Displacement fell below `epsilon * K` or the iteration cap was hit.
    Converged,
}

/// Summary of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Sum of squared force magnitudes.
    pub energy: f64,
    /// Step size used by this iteration.
    pub step: f64,
    /// Average displacement of the moved vertices.
    pub delta: f64,
    /// Number of unpinned vertices.
    pub moved: usize,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutReport {
    pub iterations: usize,
    /// Energy of the last iteration.
    pub energy: f64,
    /// Step size the next iteration would have used.
    pub step: f64,
    /// Average displacement of the last iteration.
    pub delta: f64,
    /// `false` when the iteration cap stopped the run first.
    pub converged: bool,
}

/// Repulsive force on a body of `weight` at `point` from everything in `tree`.
///
/// Cells whose extent seen from `point` is below `params.theta` are replaced
/// by their centroid; with `theta == 0` every cell is opened and the result
/// is the exact all-pairs sum. Bodies coincident with `point` contribute
/// nothing.
pub fn repulsive_force(
    tree: &QuadTree,
    point: Point,
    weight: f64,
    params: &LayoutParameters,
) -> Point {
    let mut stack = Vec::with_capacity(stack_capacity(params));
    repulsive_force_with(tree, point, weight, params, &mut stack)
}

fn stack_capacity(params: &LayoutParameters) -> usize {
    4 * (params.max_level as usize + 1)
}

fn repulsive_force_with(
    tree: &QuadTree,
    point: Point,
    weight: f64,
    params: &LayoutParameters,
    stack: &mut Vec<NodeIndex>,
) -> Point {
    let (c, k, p) = (params.c, params.k, params.p);
    let mut total = Point::ZERO;

    stack.clear();
    stack.push(tree.root());
    while let Some(idx) = stack.pop() {
        let node = tree.node(idx);

        if node.is_exact_leaf() {
            for &(q, wq) in node.points() {
                if distance(q, point) == 0.0 {
                    continue;
                }
                let (dir, _) = unit_direction_and_distance(q, point);
                total += dir * (repulsion(c, k, p, point, q) * wq * weight);
            }
            continue;
        }

        let Some(cm) = node.center_of_mass() else {
            continue;
        };
        let d = distance(cm, point);
        if node.extent() / d > params.theta {
            if let Some(children) = node.children() {
                stack.extend(
                    children
                        .into_iter()
                        .filter(|&child| tree.node(child).total_weight() > 0.0),
                );
            }
        } else if d > 0.0 {
            let (dir, _) = unit_direction_and_distance(cm, point);
            total += dir * (repulsion(c, k, p, cm, point) * node.total_weight() * weight);
        }
    }

    total
}

/// Spring force pulling `v` toward the targets of its outgoing edges.
///
/// Self-loops are ignored.
pub fn attractive_force<G, VW, EW>(
    graph: &G,
    positions: &[Point],
    vweight: &VW,
    eweight: &EW,
    v: VertexId,
    params: &LayoutParameters,
) -> Point
where
    G: LayoutGraph,
    VW: VertexWeights + ?Sized,
    EW: EdgeWeights + ?Sized,
{
    let pv = positions[v];
    let wv = vweight.weight(v);

    graph
        .out_edges(v)
        .filter(|e| e.target != v)
        .fold(Point::ZERO, |acc, e| {
            let pu = positions[e.target];
            let (dir, _) = unit_direction_and_distance(pu, pv);
            let f = attraction(params.k, pu, pv)
                * eweight.weight(e.id)
                * vweight.weight(e.target)
                * wv;
            acc + dir * f
        })
}

/// Read-only view shared by every per-vertex task of one iteration.
struct ForcePass<'a, G, VW: ?Sized, EW: ?Sized> {
    graph: &'a G,
    vweight: &'a VW,
    eweight: &'a EW,
    params: &'a LayoutParameters,
    tree: &'a QuadTree,
}

impl<G, VW, EW> ForcePass<'_, G, VW, EW>
where
    G: LayoutGraph,
    VW: VertexWeights + ?Sized,
    EW: EdgeWeights + ?Sized,
{
    fn force_on(&self, v: VertexId, positions: &[Point], stack: &mut Vec<NodeIndex>) -> Point {
        let repulsive = repulsive_force_with(
            self.tree,
            positions[v],
            self.vweight.weight(v),
            self.params,
            stack,
        );
        let attractive =
            attractive_force(self.graph, positions, self.vweight, self.eweight, v, self.params);
        repulsive + attractive
    }
}

/// Per-iteration sums, folded in vertex order.
#[derive(Debug, Default)]
struct Reduction {
    energy: f64,
    displacement: f64,
    moved: usize,
}

impl Reduction {
    /// Move `positions[v]` by `step` along `force`. A zero force moves nothing.
    fn apply(&mut self, positions: &mut [Point], v: VertexId, mut force: Point, step: f64) {
        let magnitude = normalize(&mut force);
        self.energy += magnitude * magnitude;
        self.moved += 1;
        if magnitude > 0.0 {
            let shift = force * step;
            positions[v] += shift;
            self.displacement += shift.norm();
        }
    }

    fn delta(&self) -> f64 {
        if self.moved == 0 {
            0.0
        } else {
            self.displacement / self.moved as f64
        }
    }
}

/// Drives an SFDP run over borrowed graph and property stores.
///
/// [`LayoutEngine::iterate`] runs one iteration at a time, which is the
/// place for a caller to stop early; [`LayoutEngine::run`] loops until
/// convergence or the iteration cap.
pub struct LayoutEngine<'a, G, VW: ?Sized, EW: ?Sized, P: ?Sized> {
    graph: &'a G,
    vweight: &'a VW,
    eweight: &'a EW,
    pins: &'a P,
    params: &'a LayoutParameters,
    state: LayoutState,
    bounds: Bounds,
    schedule: StepSchedule,
    delta: f64,
    energy: f64,
    iteration: usize,
    verbose: bool,
}

impl<'a, G, VW, EW, P> LayoutEngine<'a, G, VW, EW, P>
where
    G: LayoutGraph,
    VW: VertexWeights + ?Sized,
    EW: EdgeWeights + ?Sized,
    P: PinMap + ?Sized,
{
    /// Create an engine. Positions are supplied per call.
    pub fn new(
        graph: &'a G,
        vweight: &'a VW,
        eweight: &'a EW,
        pins: &'a P,
        params: &'a LayoutParameters,
    ) -> Self {
        Self {
            graph,
            vweight,
            eweight,
            pins,
            params,
            state: LayoutState::Initializing,
            bounds: Bounds::empty(),
            schedule: StepSchedule::new(params),
            delta: params.convergence_threshold() + 1.0,
            energy: 0.0,
            iteration: 0,
            verbose: false,
        }
    }

    /// Emit one `info` event per iteration instead of `trace`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Iterations run so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Bounding box the next quadtree will cover.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Step size the next iteration will use.
    pub fn step_size(&self) -> f64 {
        self.schedule.step()
    }

    /// Average displacement of the last iteration.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    fn check_stores(&self, positions: &[Point]) -> Result<()> {
        let expected = self.graph.vertex_count();
        if positions.len() != expected {
            return Err(LayoutError::PositionCountMismatch {
                expected,
                actual: positions.len(),
            });
        }

        let edges = self.graph.edge_count();
        let stores = [
            ("vertex weight", self.vweight.stored(), expected),
            ("edge weight", self.eweight.stored(), edges),
            ("pin", self.pins.stored(), expected),
        ];
        for (store, stored, needed) in stores {
            match stored {
                Some(actual) if actual < needed => {
                    return Err(LayoutError::StoreTooShort {
                        store,
                        expected: needed,
                        actual,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn should_continue(&self) -> bool {
        let max_iter = self.params.max_iter;
        self.delta > self.params.convergence_threshold()
            && (max_iter == 0 || self.iteration < max_iter)
    }

    /// Compute the initial bounding box over every vertex, pinned ones included.
    pub fn initialize(&mut self, positions: &[Point]) -> Result<()> {
        self.check_stores(positions)?;
        self.bounds = positions.iter().copied().collect();
        self.schedule = StepSchedule::new(self.params);
        self.delta = self.params.convergence_threshold() + 1.0;
        self.energy = 0.0;
        self.iteration = 0;
        self.state = if self.should_continue() {
            LayoutState::Iterating
        } else {
            LayoutState::Converged
        };
        Ok(())
    }

    /// Run a single iteration.
    ///
    /// Returns `None` once the layout has converged.
    pub fn iterate(&mut self, positions: &mut [Point]) -> Result<Option<IterationStats>> {
        match self.state {
            LayoutState::Initializing => self.initialize(positions)?,
            LayoutState::Iterating => self.check_stores(positions)?,
            LayoutState::Converged => return Ok(None),
        }
        if self.state == LayoutState::Converged {
            return Ok(None);
        }

        let tree = QuadTree::build(
            self.bounds,
            self.params.max_level,
            positions
                .iter()
                .enumerate()
                .map(|(v, &p)| (p, self.vweight.weight(v))),
        );

        let step = self.schedule.step();
        let reduction = match self.params.update {
            UpdatePolicy::Snapshot => self.snapshot_pass(&tree, positions, step),
            UpdatePolicy::InPlace => self.in_place_pass(&tree, positions, step),
        };

        self.iteration += 1;
        self.energy = reduction.energy;
        self.delta = reduction.delta();
        self.bounds = positions.iter().copied().collect();

        let stats = IterationStats {
            iteration: self.iteration,
            energy: self.energy,
            step,
            delta: self.delta,
            moved: reduction.moved,
        };

        if self.verbose {
            info!(
                iteration = stats.iteration,
                energy = stats.energy,
                step = stats.step,
                delta = stats.delta,
                max_level = self.params.max_level,
                "sfdp_iteration"
            );
        } else {
            trace!(
                iteration = stats.iteration,
                energy = stats.energy,
                step = stats.step,
                delta = stats.delta,
                max_level = self.params.max_level,
                "sfdp_iteration"
            );
        }

        self.schedule.update(self.energy);
        if !self.should_continue() {
            self.state = LayoutState::Converged;
        }

        Ok(Some(stats))
    }

    /// Forces against an unchanging snapshot, computed in parallel, then applied in order.
    fn snapshot_pass(&self, tree: &QuadTree, positions: &mut [Point], step: f64) -> Reduction {
        let pass = self.force_pass(tree);
        let pins = self.pins;
        let capacity = stack_capacity(self.params);

        let forces: Vec<Option<Point>> = {
            let snapshot: &[Point] = positions;
            (0..snapshot.len())
                .into_par_iter()
                .map_init(
                    || Vec::with_capacity(capacity),
                    |stack, v| {
                        if pins.is_pinned(v) {
                            None
                        } else {
                            Some(pass.force_on(v, snapshot, stack))
                        }
                    },
                )
                .collect()
        };

        let mut reduction = Reduction::default();
        for (v, force) in forces.into_iter().enumerate() {
            if let Some(force) = force {
                reduction.apply(positions, v, force, step);
            }
        }
        reduction
    }

    /// Vertices in index order, each moved before the next is evaluated.
    fn in_place_pass(&self, tree: &QuadTree, positions: &mut [Point], step: f64) -> Reduction {
        let pass = self.force_pass(tree);
        let mut stack = Vec::with_capacity(stack_capacity(self.params));

        let mut reduction = Reduction::default();
        for v in 0..positions.len() {
            if self.pins.is_pinned(v) {
                continue;
            }
            let force = pass.force_on(v, positions, &mut stack);
            reduction.apply(positions, v, force, step);
        }
        reduction
    }

    fn force_pass<'t>(&'t self, tree: &'t QuadTree) -> ForcePass<'t, G, VW, EW> {
        ForcePass {
            graph: self.graph,
            vweight: self.vweight,
            eweight: self.eweight,
            params: self.params,
            tree,
        }
    }

    /// Iterate until convergence or the iteration cap.
    pub fn run(&mut self, positions: &mut [Point]) -> Result<LayoutReport> {
        if self.state == LayoutState::Initializing {
            self.initialize(positions)?;
        }

        info!(
            vertices = positions.len(),
            max_iter = self.params.max_iter,
            cooling = ?self.params.cooling,
            update = ?self.params.update,
            "sfdp_layout_start"
        );

        while self.iterate(positions)?.is_some() {}

        let report = LayoutReport {
            iterations: self.iteration,
            energy: self.energy,
            step: self.schedule.step(),
            delta: self.delta,
            converged: self.delta <= self.params.convergence_threshold(),
        };

        info!(
            iterations = report.iterations,
            converged = report.converged,
            delta = report.delta,
            "sfdp_layout_complete"
        );

        Ok(report)
    }
}

/// Lay out `graph` in place.
///
/// `positions` must hold one pre-seeded coordinate per vertex and receives
/// the result. Slice and `Vec` stores must cover every vertex (or edge);
/// a short store is rejected before the first iteration. Pinned vertices keep their coordinates bit for bit. With
/// `verbose` set, one `info` event is emitted per iteration.
pub fn sfdp_layout<G, VW, EW, P>(
    graph: &G,
    positions: &mut [Point],
    vweight: &VW,
    eweight: &EW,
    pins: &P,
    params: &LayoutParameters,
    verbose: bool,
) -> Result<LayoutReport>
where
    G: LayoutGraph,
    VW: VertexWeights + ?Sized,
    EW: EdgeWeights + ?Sized,
    P: PinMap + ?Sized,
{
    LayoutEngine::new(graph, vweight, eweight, pins, params)
        .verbose(verbose)
        .run(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoolingSchedule, NoPins, Uniform};
    use petgraph::graph::UnGraph;

    fn path_graph(n: u32) -> UnGraph<(), ()> {
        UnGraph::from_edges((1..n).map(|i| (i - 1, i)))
    }

    #[test]
    fn test_repulsion_pushes_apart() {
        let bounds = Bounds::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        let tree = QuadTree::build(bounds, 4, [(Point::new(1.0, 1.0), 1.0)]);
        let params = LayoutParameters {
            c: 1.0,
            k: 1.0,
            p: 1.0,
            ..Default::default()
        };

        let f = repulsive_force(&tree, Point::new(3.0, 1.0), 1.0, &params);
        // magnitude C K^2 / d = 0.5, pointing away from (1, 1)
        assert!((f.x - 0.5).abs() < 1e-12);
        assert!(f.y.abs() < 1e-12);
    }

    #[test]
    fn test_repulsion_ignores_self() {
        let bounds = Bounds::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let p = Point::new(0.3, 0.3);
        let tree = QuadTree::build(bounds, 3, [(p, 1.0)]);
        assert_eq!(
            repulsive_force(&tree, p, 1.0, &LayoutParameters::default()),
            Point::ZERO
        );
    }

    #[test]
    fn test_attraction_pulls_together() {
        let graph = path_graph(2);
        let positions = [Point::new(0.0, 0.0), Point::new(0.0, 2.0)];
        let params = LayoutParameters::default().with_ideal_length(2.0);

        let f = attractive_force(&graph, &positions, &Uniform(1.0), &Uniform(3.0), 0, &params);
        // d^2 / K * w_e = 4 / 2 * 3
        assert!(f.x.abs() < 1e-12);
        assert!((f.y - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_attraction_skips_self_loops() {
        let graph = UnGraph::<(), ()>::from_edges([(0, 0)]);
        let positions = [Point::new(1.0, 1.0)];
        let f = attractive_force(
            &graph,
            &positions,
            &Uniform(1.0),
            &Uniform(1.0),
            0,
            &LayoutParameters::default(),
        );
        assert_eq!(f, Point::ZERO);
    }

    #[test]
    fn test_position_count_mismatch() {
        let graph = path_graph(3);
        let mut positions = vec![Point::ZERO; 2];
        let err = sfdp_layout(
            &graph,
            &mut positions,
            &Uniform(1.0),
            &Uniform(1.0),
            &NoPins,
            &LayoutParameters::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::PositionCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_state_machine() {
        let graph = path_graph(3);
        let mut positions = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 1.0),
        ];
        let params = LayoutParameters::default()
            .with_max_iter(3)
            .with_cooling(CoolingSchedule::Simple);

        let unit = Uniform(1.0);
        let mut engine = LayoutEngine::new(&graph, &unit, &unit, &NoPins, &params);
        assert_eq!(engine.state(), LayoutState::Initializing);

        let first = engine.iterate(&mut positions).unwrap().unwrap();
        assert_eq!(first.iteration, 1);
        assert_eq!(first.moved, 3);
        assert_eq!(first.step, params.init_step);
        assert_eq!(engine.state(), LayoutState::Iterating);

        engine.iterate(&mut positions).unwrap();
        engine.iterate(&mut positions).unwrap();
        assert_eq!(engine.state(), LayoutState::Converged);
        assert!(engine.iterate(&mut positions).unwrap().is_none());
        assert_eq!(engine.iteration(), 3);
    }

    #[test]
    fn test_all_pinned_converges_immediately() {
        let graph = path_graph(2);
        let mut positions = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)];
        let report = sfdp_layout(
            &graph,
            &mut positions,
            &Uniform(1.0),
            &Uniform(1.0),
            &vec![true, true],
            &LayoutParameters::default(),
            false,
        )
        .unwrap();
        assert_eq!(report.iterations, 1);
        assert_eq!(report.delta, 0.0);
        assert!(report.converged);
    }

    #[test]
    fn test_bounds_track_moves() {
        let graph = path_graph(2);
        let mut positions = vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)];
        let params = LayoutParameters {
            init_step: 1.0,
            ..Default::default()
        };
        let unit = Uniform(1.0);
        let mut engine = LayoutEngine::new(&graph, &unit, &unit, &NoPins, &params);
        engine.iterate(&mut positions).unwrap();

        // both vertices moved one unit toward each other
        let bounds = engine.bounds();
        assert!((bounds.lower_left.y - 1.0).abs() < 1e-12);
        assert!((bounds.upper_right.y - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_pin_store_rejected() {
        let graph = path_graph(3);
        let mut positions = vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let err = sfdp_layout(
            &graph,
            &mut positions,
            &Uniform(1.0),
            &Uniform(1.0),
            &vec![false, true],
            &LayoutParameters::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::StoreTooShort {
                store: "pin",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_short_weight_stores_rejected() {
        let graph = path_graph(3);
        let mut positions = vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let params = LayoutParameters::default();

        let err = sfdp_layout(
            &graph,
            &mut positions,
            &vec![1.0],
            &Uniform(1.0),
            &NoPins,
            &params,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::StoreTooShort {
                store: "vertex weight",
                ..
            }
        ));

        let err = sfdp_layout(
            &graph,
            &mut positions,
            &Uniform(1.0),
            &[1.0][..],
            &NoPins,
            &params,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::StoreTooShort {
                store: "edge weight",
                expected: 2,
                actual: 1
            }
        ));
    }

    /// One iteration by hand, with forces from the tree of `start`.
    /// `sequential` reads neighbours that already moved this iteration.
    fn one_iteration_by_hand(
        graph: &UnGraph<(), ()>,
        start: &[Point],
        params: &LayoutParameters,
        sequential: bool,
    ) -> Vec<Point> {
        let unit = Uniform(1.0);
        let bounds: Bounds = start.iter().copied().collect();
        let tree = QuadTree::build(bounds, params.max_level, start.iter().map(|&p| (p, 1.0)));
        let mut moved = start.to_vec();

        for v in 0..start.len() {
            let read: &[Point] = if sequential { &moved } else { start };
            let mut force = repulsive_force(&tree, read[v], 1.0, params)
                + attractive_force(graph, read, &unit, &unit, v, params);
            if normalize(&mut force) > 0.0 {
                moved[v] += force * params.init_step;
            }
        }
        moved
    }

    #[test]
    fn test_in_place_reads_moved_neighbours() {
        // bent path: vertex 0 moving changes the direction of the pull on 1
        let graph = path_graph(3);
        let start = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(3.0, 4.0)];
        let base = LayoutParameters {
            init_step: 1.0,
            max_iter: 1,
            cooling: CoolingSchedule::Simple,
            ..Default::default()
        };

        let mut results = Vec::new();
        for update in [UpdatePolicy::Snapshot, UpdatePolicy::InPlace] {
            let params = base.clone().with_update_policy(update);
            let unit = Uniform(1.0);
            let mut positions = start.clone();
            let mut engine = LayoutEngine::new(&graph, &unit, &unit, &NoPins, &params);
            engine.iterate(&mut positions).unwrap();

            let expected =
                one_iteration_by_hand(&graph, &start, &params, update == UpdatePolicy::InPlace);
            assert_eq!(positions, expected, "{update:?}");
            results.push(positions);
        }

        // vertex 0 sees untouched neighbours either way; vertex 1 does not
        assert_eq!(results[0][0], results[1][0]);
        assert_ne!(results[0][1], results[1][1]);
    }
}
