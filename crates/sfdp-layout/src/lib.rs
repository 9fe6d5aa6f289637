//! Scalable force-directed placement (SFDP) for graph layout.
//!
//! Vertices repel each other over long range and edges pull their endpoints
//! together. Repulsion is approximated with a Barnes-Hut quadtree that is
//! rebuilt every iteration, attraction is evaluated exactly along edges, and
//! the step size follows a cooling schedule until the average displacement
//! drops below `epsilon * K` or the iteration cap is reached.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Per iteration                           │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  Positions  │───▶│  Quadtree   │───▶│ Force pass  │      │
//! │  │ (snapshot)  │    │ (Barnes-Hut)│    │ (rayon map) │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Sequential reduction                       │
//! │  apply moves · energy / displacement sums · new bounds      │
//! │  cooling schedule decides the next step size                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use petgraph::graph::UnGraph;
//! use sfdp_layout::{sfdp_layout, LayoutParameters, NoPins, Point, Uniform};
//!
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0)]);
//! let mut positions = vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(3.0, 0.5),
//!     Point::new(1.0, 4.0),
//! ];
//! let report = sfdp_layout(
//!     &graph,
//!     &mut positions,
//!     &Uniform(1.0),
//!     &Uniform(1.0),
//!     &NoPins,
//!     &LayoutParameters::default(),
//!     false,
//! )?;
//! println!("{} iterations", report.iterations);
//! # Ok::<(), sfdp_layout::LayoutError>(())
//! ```

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

mod config;
mod error;
pub mod force;
mod graph;
mod layout;
mod quadtree;
mod schedule;

pub use config::{CoolingSchedule, LayoutParameters, UpdatePolicy};
pub use error::LayoutError;
pub use graph::{
    average_edge_length, EdgeId, EdgeWeights, LayoutGraph, NoPins, OutEdge, PinMap, Uniform,
    VertexId, VertexWeights,
};
pub use layout::{
    attractive_force, repulsive_force, sfdp_layout, IterationStats, LayoutEngine, LayoutReport,
    LayoutState,
};
pub use quadtree::{NodeIndex, QuadNode, QuadTree};
pub use schedule::StepSchedule;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// A 2D point. Doubles as a force vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower_left: Point,
    pub upper_right: Point,
}

impl Bounds {
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Inverted box that any call to [`Bounds::include`] will snap onto.
    pub fn empty() -> Self {
        Self {
            lower_left: Point::new(f64::MAX, f64::MAX),
            upper_right: Point::new(-f64::MAX, -f64::MAX),
        }
    }

    /// Grow the box to cover `p`.
    pub fn include(&mut self, p: Point) {
        self.lower_left.x = self.lower_left.x.min(p.x);
        self.lower_left.y = self.lower_left.y.min(p.y);
        self.upper_right.x = self.upper_right.x.max(p.x);
        self.upper_right.y = self.upper_right.y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    pub fn midpoint(&self) -> Point {
        Point::new(
            self.lower_left.x + self.width() / 2.0,
            self.lower_left.y + self.height() / 2.0,
        )
    }
}

impl FromIterator<Point> for Bounds {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut bounds = Bounds::empty();
        for p in iter {
            bounds.include(p);
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ops() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(b - a, Point::new(3.0, 4.0));
        assert_eq!((b - a).norm(), 5.0);
        assert_eq!(a * 2.0 + a, Point::new(3.0, 6.0));
    }

    #[test]
    fn test_bounds_from_points() {
        let bounds: Bounds = [Point::new(1.0, -2.0), Point::new(-3.0, 5.0)]
            .into_iter()
            .collect();
        assert_eq!(bounds.lower_left, Point::new(-3.0, -2.0));
        assert_eq!(bounds.upper_right, Point::new(1.0, 5.0));
        assert_eq!(bounds.midpoint(), Point::new(-1.0, 1.5));
    }
}
