//! Interpolation helpers for animating a point between two positions

use super::{Coord3D, coord_distance_3d};

/// Maps `(distance, index, count)` to the distance travelled at step `index`
pub type TweenFunction = fn(f64, usize, usize) -> f64;

/// Smoothstep easing
pub fn bezier_tween(distance: f64, index: usize, count: usize) -> f64 {
    let t = index as f64 / count as f64;
    distance * (t * t * (3.0 - 2.0 * t))
}

/// Constant speed
pub fn linear_tween(distance: f64, index: usize, count: usize) -> f64 {
    index as f64 * distance / count as f64
}

/// Parabolic ease-in-out
pub fn parabolic_tween(distance: f64, index: usize, count: usize) -> f64 {
    let t = index as f64 / count as f64;
    let t2 = t * t;
    distance * (t2 / (2.0 * (t2 - t) + 1.0))
}

/// `count` points from `a` to `b` (both included), spaced by `tween`
///
/// Returns an empty list for `count == 0` and `[a]` for `count == 1`.
pub fn tween_coord_3d(a: Coord3D, b: Coord3D, count: usize, tween: TweenFunction) -> Vec<Coord3D> {
    if count < 2 {
        return if count == 1 { vec![a] } else { Vec::new() };
    }
    let direction = b - a;
    let distance = coord_distance_3d(a, b);
    (0..count)
        .map(|i| {
            let mut point = a;
            point.offset(direction, tween(distance, i, count - 1));
            point
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tween_endpoints() {
        let a = Coord3D::new(0.0, 0.0, 0.0);
        let b = Coord3D::new(10.0, 0.0, 0.0);
        for tween in [bezier_tween as TweenFunction, linear_tween, parabolic_tween] {
            let points = tween_coord_3d(a, b, 5, tween);
            assert_eq!(points.len(), 5);
            assert_eq!(points[0], a);
            assert_eq!(points[4], b);
        }
    }

    #[test]
    fn test_linear_spacing() {
        let points = tween_coord_3d(
            Coord3D::new(0.0, 0.0, 0.0),
            Coord3D::new(0.0, 4.0, 0.0),
            5,
            linear_tween,
        );
        assert_eq!(points[1], Coord3D::new(0.0, 1.0, 0.0));
        assert_eq!(points[2], Coord3D::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_midpoint_symmetry() {
        assert!(crate::geometry::is_equal(bezier_tween(10.0, 1, 2), 5.0));
        assert!(crate::geometry::is_equal(parabolic_tween(10.0, 1, 2), 5.0));
    }

    #[test]
    fn test_degenerate_counts() {
        let a = Coord3D::new(1.0, 1.0, 1.0);
        assert!(tween_coord_3d(a, a, 0, linear_tween).is_empty());
        assert_eq!(tween_coord_3d(a, a, 1, linear_tween), vec![a]);
    }
}
