//! Pairwise force model.
//!
//! Magnitudes only; the layout engine multiplies them by masses and applies
//! them along a unit direction from [`unit_direction_and_distance`].

use crate::Point;

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a - b).norm()
}

/// Repulsive magnitude `-C * K^(1+p) / d^p`.
///
/// Coincident points do not repel each other: the magnitude is `0` when
/// `d == 0`.
pub fn repulsion(c: f64, k: f64, p: f64, a: Point, b: Point) -> f64 {
    let d = distance(a, b);
    if d == 0.0 {
        return 0.0;
    }
    -c * k.powf(1.0 + p) / d.powf(p)
}

/// Attractive magnitude `d^2 / K`. No rest length.
pub fn attraction(k: f64, a: Point, b: Point) -> f64 {
    distance(a, b).powi(2) / k
}

/// Returns `(a - b)` scaled to unit length, together with the distance.
///
/// When `a == b` the length is taken to be `1`, so the direction stays the
/// zero vector and the returned distance is `1`.
pub fn unit_direction_and_distance(a: Point, b: Point) -> (Point, f64) {
    let diff = a - b;
    let mut abs = diff.x * diff.x + diff.y * diff.y;
    if abs == 0.0 {
        abs = 1.0;
    }
    let len = abs.sqrt();
    (diff * (1.0 / len), len)
}

/// Scales `v` to unit length in place and returns its previous magnitude.
///
/// A zero vector is left untouched and `0` is returned.
pub fn normalize(v: &mut Point) -> f64 {
    let len = v.norm();
    if len > 0.0 {
        *v = *v * (1.0 / len);
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_distance() {
        assert_eq!(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_repulsion_magnitude() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(2.0, 0.0);
        // -0.2 * 1^2 / 2
        assert!((repulsion(0.2, 1.0, 1.0, a, b) + 0.1).abs() < EPS);
        // -1 * 2^3 / 4
        assert!((repulsion(1.0, 2.0, 2.0, a, b) + 2.0).abs() < EPS);
    }

    #[test]
    fn test_repulsion_zero_distance() {
        let a = Point::new(1.5, -2.0);
        assert_eq!(repulsion(1.0, 1.0, 2.0, a, a), 0.0);
    }

    #[test]
    fn test_attraction_grows_quadratically() {
        let a = Point::new(0.0, 0.0);
        assert!((attraction(2.0, a, Point::new(1.0, 0.0)) - 0.5).abs() < EPS);
        assert!((attraction(2.0, a, Point::new(4.0, 0.0)) - 8.0).abs() < EPS);
    }

    #[test]
    fn test_unit_direction() {
        let (dir, d) = unit_direction_and_distance(Point::new(3.0, 4.0), Point::new(0.0, 0.0));
        assert!((d - 5.0).abs() < EPS);
        assert!((dir.x - 0.6).abs() < EPS);
        assert!((dir.y - 0.8).abs() < EPS);
    }

    #[test]
    fn test_unit_direction_coincident() {
        let p = Point::new(7.0, 7.0);
        let (dir, d) = unit_direction_and_distance(p, p);
        assert_eq!(dir, Point::ZERO);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_normalize() {
        let mut v = Point::new(0.0, -3.0);
        assert_eq!(normalize(&mut v), 3.0);
        assert_eq!(v, Point::new(0.0, -1.0));

        let mut zero = Point::ZERO;
        assert_eq!(normalize(&mut zero), 0.0);
        assert_eq!(zero, Point::ZERO);
    }
}
