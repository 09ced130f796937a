//! Quadric error accumulators
//!
//! A quadric is a symmetric 4x4 matrix representing accumulated squared
//! distance to a set of planes. Collapsing an edge sums the quadrics of its
//! endpoints; the surviving vertex carries the sum of every vertex merged
//! into it.

use meshops_core::{Matrix4, Point3d, Point3f, Vector4};

#[derive(Debug, Clone, Copy)]
pub struct Quadric(Matrix4<f64>);

impl Quadric {
    pub fn zero() -> Self {
        Self(Matrix4::zeros())
    }

    /// Quadric of the plane `ax + by + cz + d = 0` with unit normal.
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        let (a, b, c, d) = (plane[0], plane[1], plane[2], plane[3]);
        Self(Matrix4::new(
            a * a, a * b, a * c, a * d,
            a * b, b * b, b * c, b * d,
            a * c, b * c, c * c, c * d,
            a * d, b * d, c * d, d * d,
        ))
    }

    /// Quadric of a triangle's supporting plane, or `None` when the
    /// triangle is degenerate and defines no plane.
    pub fn from_triangle(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Option<Self> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let n = e1.cross(&e2);
        let len = n.norm();
        if len <= 1e-12 {
            return None;
        }
        let n = n / len;
        let d = -(n.dot(&v0.coords)) as f64;
        Some(Self::from_plane(&Vector4::new(
            n.x as f64, n.y as f64, n.z as f64, d,
        )))
    }

    pub fn add(&mut self, other: &Quadric) {
        self.0 += other.0;
    }

    pub fn sum(&self, other: &Quadric) -> Quadric {
        Quadric(self.0 + other.0)
    }

    /// Squared-distance cost of placing the merged vertex at `p`.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let v = Vector4::new(p.x, p.y, p.z, 1.0);
        (v.transpose() * self.0 * v)[0].max(0.0)
    }

    /// Position minimizing this quadric's cost, or `None` when the
    /// 3x3 block is singular and the caller must fall back to the
    /// edge midpoint.
    pub fn optimal_position(&self) -> Option<Point3d> {
        let q3 = self.0.fixed_view::<3, 3>(0, 0);
        let q1 = self.0.fixed_view::<3, 1>(0, 3);
        let inv = q3.try_inverse()?;
        let p = -inv * q1;
        if p.iter().all(|x| x.is_finite()) {
            Some(Point3d::new(p[0], p[1], p[2]))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_quadric_is_squared_distance() {
        // Plane z = 0
        let q = Quadric::from_plane(&Vector4::new(0.0, 0.0, 1.0, 0.0));
        assert_relative_eq!(q.evaluate(&Point3d::new(5.0, -3.0, 0.0)), 0.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 0.0, 2.0)), 4.0);
    }

    #[test]
    fn test_summed_quadrics_accumulate() {
        // Planes z = 0 and y = 0
        let mut q = Quadric::from_plane(&Vector4::new(0.0, 0.0, 1.0, 0.0));
        q.add(&Quadric::from_plane(&Vector4::new(0.0, 1.0, 0.0, 0.0)));
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 3.0, 4.0)), 25.0);
    }

    #[test]
    fn test_optimal_position_of_three_planes() {
        // x = 1, y = 2, z = 3 intersect at a single point
        let mut q = Quadric::from_plane(&Vector4::new(1.0, 0.0, 0.0, -1.0));
        q.add(&Quadric::from_plane(&Vector4::new(0.0, 1.0, 0.0, -2.0)));
        q.add(&Quadric::from_plane(&Vector4::new(0.0, 0.0, 1.0, -3.0)));
        let p = q.optimal_position().unwrap();
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_plane_quadric_is_singular() {
        let q = Quadric::from_plane(&Vector4::new(0.0, 0.0, 1.0, 0.0));
        assert!(q.optimal_position().is_none());
    }

    #[test]
    fn test_degenerate_triangle_has_no_plane() {
        let v0 = Point3f::new(0.0, 0.0, 0.0);
        let v1 = Point3f::new(1.0, 0.0, 0.0);
        let v2 = Point3f::new(2.0, 0.0, 0.0);
        assert!(Quadric::from_triangle(&v0, &v1, &v2).is_none());
    }

    #[test]
    fn test_triangle_quadric_vanishes_on_its_plane() {
        let v0 = Point3f::new(0.0, 0.0, 1.0);
        let v1 = Point3f::new(1.0, 0.0, 1.0);
        let v2 = Point3f::new(0.0, 1.0, 1.0);
        let q = Quadric::from_triangle(&v0, &v1, &v2).unwrap();
        assert_relative_eq!(q.evaluate(&Point3d::new(0.3, 0.3, 1.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.3, 0.3, 3.0)), 4.0, epsilon = 1e-9);
    }
}
