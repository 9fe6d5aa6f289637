//! Barnes-Hut quadtree for O(n log n) repulsion.
//!
//! The quadtree recursively subdivides the layout's bounding box and keeps a
//! weighted centroid for each cell. Distant cells can stand in for all of
//! their points; cells at the depth limit keep their points verbatim so the
//! approximation stays exact at the resolution floor.
//!
//! Nodes live in an arena and refer to their children by index. Children are
//! materialised all four at once, on first insertion below a node, by
//! [`QuadTree::ensure_children`]. Building is single-threaded; once built the
//! tree is only read, so the parallel force pass needs no synchronisation.

use crate::{Bounds, Point};

/// Index of a node in the [`QuadTree`] arena.
pub type NodeIndex = usize;

/// A single cell of the tree.
#[derive(Debug, Clone)]
pub struct QuadNode {
    /// Region covered by this cell.
    pub bounds: Bounds,
    /// Sum of `point * weight` over every insertion into the subtree.
    weighted_sum: Point,
    /// Sum of weights over every insertion into the subtree.
    total_weight: f64,
    /// Remaining subdivision budget; `0` means exact leaf.
    max_level: u32,
    /// Quadrant children, indexed `i + 2 * j`.
    children: Option<[NodeIndex; 4]>,
    /// Exact `(point, weight)` list, only filled at `max_level == 0`.
    points: Vec<(Point, f64)>,
}

impl QuadNode {
    fn new(bounds: Bounds, max_level: u32) -> Self {
        Self {
            bounds,
            weighted_sum: Point::ZERO,
            total_weight: 0.0,
            max_level,
            children: None,
            points: Vec::new(),
        }
    }

    /// Accumulated weight of the subtree.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weighted centroid, `None` until some positive weight was inserted.
    pub fn center_of_mass(&self) -> Option<Point> {
        if self.total_weight > 0.0 {
            Some(self.weighted_sum * (1.0 / self.total_weight))
        } else {
            None
        }
    }

    /// The larger side of the cell, used by the accuracy test.
    pub fn extent(&self) -> f64 {
        self.bounds.width().max(self.bounds.height())
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn is_exact_leaf(&self) -> bool {
        self.max_level == 0
    }

    pub fn children(&self) -> Option<[NodeIndex; 4]> {
        self.children
    }

    /// Points stored verbatim at the depth limit.
    pub fn points(&self) -> &[(Point, f64)] {
        &self.points
    }

    /// Index of the quadrant owning `p`: bit 0 is `x > mid.x`, bit 1 is `y > mid.y`.
    fn quadrant(&self, p: Point) -> usize {
        let mid = self.bounds.midpoint();
        let i = usize::from(p.x > mid.x);
        let j = usize::from(p.y > mid.y);
        i + 2 * j
    }

    fn quadrant_bounds(&self, quadrant: usize) -> Bounds {
        let ll = self.bounds.lower_left;
        let ur = self.bounds.upper_right;
        let mid = self.bounds.midpoint();
        let (x0, x1) = if quadrant % 2 == 1 { (mid.x, ur.x) } else { (ll.x, mid.x) };
        let (y0, y1) = if quadrant / 2 == 1 { (mid.y, ur.y) } else { (ll.y, mid.y) };
        Bounds::new(Point::new(x0, y0), Point::new(x1, y1))
    }
}

/// A depth-bounded Barnes-Hut quadtree.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
}

impl QuadTree {
    /// Create an empty tree covering `bounds` with `max_level` levels of subdivision.
    pub fn new(bounds: Bounds, max_level: u32) -> Self {
        Self {
            nodes: vec![QuadNode::new(bounds, max_level)],
        }
    }

    /// Build a tree over `bounds` from `(point, weight)` pairs.
    pub fn build<I>(bounds: Bounds, max_level: u32, points: I) -> Self
    where
        I: IntoIterator<Item = (Point, f64)>,
    {
        let mut tree = Self::new(bounds, max_level);
        for (p, w) in points {
            tree.insert(p, w);
        }
        tree
    }

    pub fn root(&self) -> NodeIndex {
        0
    }

    pub fn node(&self, idx: NodeIndex) -> &QuadNode {
        &self.nodes[idx]
    }

    /// Number of materialised nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_weight() == 0.0
    }

    /// Accumulated weight at the root.
    pub fn total_weight(&self) -> f64 {
        self.nodes[0].total_weight
    }

    /// Weighted centroid of everything inserted.
    pub fn center_of_mass(&self) -> Option<Point> {
        self.nodes[0].center_of_mass()
    }

    /// Insert a weighted point, descending one quadrant per level.
    ///
    /// Returns the index of the node the point came to rest in.
    pub fn insert(&mut self, p: Point, w: f64) -> NodeIndex {
        let mut idx = self.root();
        loop {
            let node = &mut self.nodes[idx];
            node.total_weight += w;
            node.weighted_sum += p * w;

            if node.max_level == 0 {
                node.points.push((p, w));
                return idx;
            }

            let quadrant = node.quadrant(p);
            idx = self.ensure_children(idx)[quadrant];
        }
    }

    /// Materialise the four children of `idx` if needed and return their indices.
    ///
    /// Exact leaves never get children; calling this on one returns the
    /// leaf's own index in every slot.
    pub fn ensure_children(&mut self, idx: NodeIndex) -> [NodeIndex; 4] {
        if let Some(children) = self.nodes[idx].children {
            return children;
        }
        let parent = &self.nodes[idx];
        if parent.max_level == 0 {
            return [idx; 4];
        }

        let level = parent.max_level - 1;
        let quadrants: [Bounds; 4] = std::array::from_fn(|q| parent.quadrant_bounds(q));
        let first = self.nodes.len();
        self.nodes
            .extend(quadrants.into_iter().map(|b| QuadNode::new(b, level)));

        let children = [first, first + 1, first + 2, first + 3];
        self.nodes[idx].children = Some(children);
        children
    }
}
