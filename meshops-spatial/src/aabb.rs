//! Axis-aligned bounding boxes

use meshops_core::{Point3d, Vector3d};

/// Axis-aligned bounding box in double precision.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3d,
    pub max: Point3d,
}

impl Aabb {
    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Tight box around a triangle.
    pub fn from_triangle(tri: &[Point3d; 3]) -> Self {
        let mut bbox = Self::empty();
        for p in tri {
            bbox.expand_to_include(p);
        }
        bbox
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3d::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn center(&self) -> Point3d {
        Point3d::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn size(&self) -> Vector3d {
        self.max - self.min
    }

    /// Axis with the largest extent (0 = x, 1 = y, 2 = z).
    pub fn longest_axis(&self) -> usize {
        let s = self.size();
        if s.x >= s.y && s.x >= s.z {
            0
        } else if s.y >= s.z {
            1
        } else {
            2
        }
    }

    /// Slab test: does the ray from `origin` along `dir` reach this box?
    pub fn intersects_ray(&self, origin: &Point3d, dir: &Vector3d) -> bool {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-300 {
                // Ray parallel to this slab: must start within it
                if o < self.min[axis] || o > self.max[axis] {
                    return false;
                }
            } else {
                let inv = 1.0 / d;
                let mut t0 = (self.min[axis] - o) * inv;
                let mut t1 = (self.max[axis] - o) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return false;
                }
            }
        }

        t_max >= 0.0
    }

    /// Squared distance from a point to this box (zero if inside).
    pub fn distance_squared_to(&self, p: &Point3d) -> f64 {
        let mut d2 = 0.0;
        for axis in 0..3 {
            let v = p[axis];
            if v < self.min[axis] {
                d2 += (self.min[axis] - v) * (self.min[axis] - v);
            } else if v > self.max[axis] {
                d2 += (v - self.max[axis]) * (v - self.max[axis]);
            }
        }
        d2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb {
            min: Point3d::new(0.0, 0.0, 0.0),
            max: Point3d::new(1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_expand_and_union() {
        let mut bbox = Aabb::empty();
        bbox.expand_to_include(&Point3d::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Point3d::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(bbox.min.x, -1.0);
        assert_relative_eq!(bbox.max.z, 3.0);

        let other = Aabb {
            min: Point3d::new(0.0, -5.0, 0.0),
            max: Point3d::new(0.0, 0.0, 10.0),
        };
        let u = bbox.union(&other);
        assert_relative_eq!(u.min.y, -5.0);
        assert_relative_eq!(u.max.z, 10.0);
    }

    #[test]
    fn test_longest_axis() {
        let bbox = Aabb {
            min: Point3d::new(0.0, 0.0, 0.0),
            max: Point3d::new(1.0, 5.0, 2.0),
        };
        assert_eq!(bbox.longest_axis(), 1);
    }

    #[test]
    fn test_ray_hits_box() {
        let bbox = unit_box();
        let origin = Point3d::new(-1.0, 0.5, 0.5);
        assert!(bbox.intersects_ray(&origin, &Vector3d::new(1.0, 0.0, 0.0)));
        assert!(!bbox.intersects_ray(&origin, &Vector3d::new(-1.0, 0.0, 0.0)));
        assert!(!bbox.intersects_ray(&origin, &Vector3d::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_ray_from_inside() {
        let bbox = unit_box();
        let origin = Point3d::new(0.5, 0.5, 0.5);
        assert!(bbox.intersects_ray(&origin, &Vector3d::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_distance_squared() {
        let bbox = unit_box();
        assert_relative_eq!(bbox.distance_squared_to(&Point3d::new(0.5, 0.5, 0.5)), 0.0);
        assert_relative_eq!(bbox.distance_squared_to(&Point3d::new(2.0, 0.5, 0.5)), 1.0);
        assert_relative_eq!(
            bbox.distance_squared_to(&Point3d::new(2.0, 2.0, 0.5)),
            2.0
        );
    }
}
