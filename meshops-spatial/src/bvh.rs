//! Bounding volume hierarchy over mesh faces

use crate::aabb::Aabb;
use crate::tri::{point_triangle_distance_squared, ray_triangle, RayCast, RayHit, TriangleHit};
use meshops_core::{to_f64, Error, Point3d, Result, TriangleMesh, Vector3d};
use rayon::prelude::*;

const MAX_DEPTH: usize = 32;
const LEAF_SIZE: usize = 4;

#[derive(Debug)]
struct BvhNode {
    bbox: Aabb,
    left: Option<Box<BvhNode>>,
    right: Option<Box<BvhNode>>,
    /// Face indices, populated only for leaves.
    faces: Vec<usize>,
}

impl BvhNode {
    fn leaf(bbox: Aabb, faces: Vec<usize>) -> Self {
        Self {
            bbox,
            left: None,
            right: None,
            faces,
        }
    }

    fn internal(bbox: Aabb, left: Box<BvhNode>, right: Box<BvhNode>) -> Self {
        Self {
            bbox,
            left: Some(left),
            right: Some(right),
            faces: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Bounding volume hierarchy for one mesh.
///
/// Owns a double-precision copy of the face corner positions so queries
/// never reach back into the source mesh.
pub struct Bvh {
    tris: Vec<[Point3d; 3]>,
    root: BvhNode,
    epsilon: f64,
}

impl Bvh {
    /// Build the hierarchy for a mesh. Fails with [`Error::EmptyMesh`]
    /// when the mesh has no faces.
    pub fn build(mesh: &TriangleMesh) -> Result<Self> {
        if mesh.face_count() == 0 {
            return Err(Error::EmptyMesh);
        }

        let tris: Vec<[Point3d; 3]> = mesh
            .faces
            .par_iter()
            .map(|face| {
                [
                    to_f64(&mesh.vertices[face[0]]),
                    to_f64(&mesh.vertices[face[1]]),
                    to_f64(&mesh.vertices[face[2]]),
                ]
            })
            .collect();

        let mut items: Vec<(usize, Aabb)> = tris
            .par_iter()
            .enumerate()
            .map(|(i, tri)| (i, Aabb::from_triangle(tri)))
            .collect();

        let root = Self::build_recursive(&mut items, 0);
        Ok(Self {
            tris,
            root,
            epsilon: mesh.relative_epsilon(),
        })
    }

    fn build_recursive(items: &mut [(usize, Aabb)], depth: usize) -> BvhNode {
        let mut bbox = Aabb::empty();
        for (_, item_box) in items.iter() {
            bbox = bbox.union(item_box);
        }

        if items.len() <= LEAF_SIZE || depth >= MAX_DEPTH {
            let faces = items.iter().map(|(i, _)| *i).collect();
            return BvhNode::leaf(bbox, faces);
        }

        // Median split along the largest extent
        let axis = bbox.longest_axis();
        items.sort_by(|(_, a), (_, b)| {
            a.center()[axis]
                .partial_cmp(&b.center()[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);

        let left = Box::new(Self::build_recursive(left_items, depth + 1));
        let right = Box::new(Self::build_recursive(right_items, depth + 1));
        BvhNode::internal(bbox, left, right)
    }

    /// Number of faces indexed by the hierarchy.
    pub fn face_count(&self) -> usize {
        self.tris.len()
    }

    /// Cast a ray and collect every forward intersection, ordered by
    /// ascending distance. One pass per call; the returned records also
    /// carry barycentric coordinates of each hit.
    pub fn cast_ray(&self, origin: &Point3d, dir: &Vector3d) -> RayCast {
        let mut cast = RayCast {
            hits: Vec::new(),
            suspect: 0,
        };
        self.cast_recursive(&self.root, origin, dir, &mut cast);
        cast.hits
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
        cast
    }

    fn cast_recursive(&self, node: &BvhNode, origin: &Point3d, dir: &Vector3d, out: &mut RayCast) {
        if !node.bbox.intersects_ray(origin, dir) {
            return;
        }

        if node.is_leaf() {
            for &fi in &node.faces {
                match ray_triangle(origin, dir, &self.tris[fi], self.epsilon) {
                    TriangleHit::Hit { t, u, v } => out.hits.push(RayHit {
                        distance: t,
                        face: fi,
                        u,
                        v,
                    }),
                    TriangleHit::Grazing => out.suspect += 1,
                    TriangleHit::Miss => {}
                }
            }
        } else {
            if let Some(ref left) = node.left {
                self.cast_recursive(left, origin, dir, out);
            }
            if let Some(ref right) = node.right {
                self.cast_recursive(right, origin, dir, out);
            }
        }
    }

    /// Nearest face to a query point and the distance to it, found by
    /// branch-and-bound with a running best-distance threshold.
    pub fn closest_point(&self, query: &Point3d) -> (usize, f64) {
        let mut best_face = 0;
        let mut best_d2 = f64::INFINITY;
        self.closest_recursive(&self.root, query, &mut best_face, &mut best_d2);
        (best_face, best_d2.sqrt())
    }

    fn closest_recursive(
        &self,
        node: &BvhNode,
        query: &Point3d,
        best_face: &mut usize,
        best_d2: &mut f64,
    ) {
        if node.bbox.distance_squared_to(query) >= *best_d2 {
            return;
        }

        if node.is_leaf() {
            for &fi in &node.faces {
                let d2 = point_triangle_distance_squared(query, &self.tris[fi]);
                if d2 < *best_d2 {
                    *best_d2 = d2;
                    *best_face = fi;
                }
            }
            return;
        }

        // Descend into the nearer child first so the bound tightens early
        let (near, far) = match (&node.left, &node.right) {
            (Some(l), Some(r)) => {
                if l.bbox.distance_squared_to(query) <= r.bbox.distance_squared_to(query) {
                    (l, r)
                } else {
                    (r, l)
                }
            }
            _ => return,
        };
        self.closest_recursive(near, query, best_face, best_d2);
        self.closest_recursive(far, query, best_face, best_d2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshops_core::Point3f;

    fn make_cube(origin: [f32; 3], size: f32) -> TriangleMesh {
        let [ox, oy, oz] = origin;
        let s = size;
        let vertices = vec![
            Point3f::new(ox, oy, oz),
            Point3f::new(ox + s, oy, oz),
            Point3f::new(ox + s, oy + s, oz),
            Point3f::new(ox, oy + s, oz),
            Point3f::new(ox, oy, oz + s),
            Point3f::new(ox + s, oy, oz + s),
            Point3f::new(ox + s, oy + s, oz + s),
            Point3f::new(ox, oy + s, oz + s),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mesh = TriangleMesh::new();
        assert!(matches!(Bvh::build(&mesh), Err(Error::EmptyMesh)));
    }

    #[test]
    fn test_ray_through_cube_has_two_ordered_crossings() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let origin = Point3d::new(-1.0, 0.4, 0.6);
        let dir = Vector3d::new(1.0, 0.0, 0.0);
        let cast = bvh.cast_ray(&origin, &dir);

        assert!(cast.is_reliable());
        assert_eq!(cast.hits.len(), 2);
        assert!(cast.hits[0].distance < cast.hits[1].distance);
        assert_relative_eq!(cast.hits[0].distance, 1.0, epsilon = 1e-9);
        assert_relative_eq!(cast.hits[1].distance, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ray_from_inside_cube_has_one_crossing() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let origin = Point3d::new(0.4, 0.45, 0.55);
        let cast = bvh.cast_ray(&origin, &Vector3d::new(1.0, 0.0, 0.0));
        assert!(cast.is_reliable());
        assert_eq!(cast.hits.len(), 1);
    }

    #[test]
    fn test_ray_missing_cube() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let origin = Point3d::new(-1.0, 5.0, 5.0);
        let cast = bvh.cast_ray(&origin, &Vector3d::new(1.0, 0.0, 0.0));
        assert!(cast.hits.is_empty());
    }

    #[test]
    fn test_hits_carry_barycentric_coordinates() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let cast = bvh.cast_ray(&Point3d::new(-1.0, 0.4, 0.6), &Vector3d::new(1.0, 0.0, 0.0));
        for hit in &cast.hits {
            assert!(hit.u >= 0.0 && hit.v >= 0.0 && hit.u + hit.v <= 1.0);
        }
    }

    #[test]
    fn test_closest_point_outside_cube() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let (_, d) = bvh.closest_point(&Point3d::new(0.5, 0.5, 3.0));
        assert_relative_eq!(d, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closest_point_on_surface() {
        let mesh = make_cube([0.0, 0.0, 0.0], 1.0);
        let bvh = Bvh::build(&mesh).unwrap();

        let (_, d) = bvh.closest_point(&Point3d::new(0.5, 0.5, 1.0));
        assert_relative_eq!(d, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_large_face_set_builds_internal_nodes() {
        // Grid of tall boxes forces several split levels
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                let base = vertices.len();
                vertices.push(Point3f::new(i as f32, j as f32, 0.0));
                vertices.push(Point3f::new(i as f32 + 0.5, j as f32, 0.0));
                vertices.push(Point3f::new(i as f32, j as f32 + 0.5, 0.0));
                faces.push([base, base + 1, base + 2]);
            }
        }
        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        let bvh = Bvh::build(&mesh).unwrap();
        assert_eq!(bvh.face_count(), 64);

        let cast = bvh.cast_ray(
            &Point3d::new(3.1, 3.1, 5.0),
            &Vector3d::new(0.0, 0.0, -1.0),
        );
        assert_eq!(cast.hits.len(), 1);
        assert_eq!(cast.hits[0].face, 3 * 8 + 3);
    }
}
