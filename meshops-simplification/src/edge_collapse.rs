//! Edge collapse simplification
//!
//! Maintains a per-vertex adjacency map (neighbor vertices and incident
//! faces) that is rewired in place as edges collapse. Candidates live in a
//! priority queue keyed by the undirected edge; entries left behind by a
//! collapse are discarded lazily when popped.

use crate::quadric::Quadric;
use crate::report::SimplifyReport;
use crate::MeshSimplifier;
use meshops_core::{to_f32, to_f64, Error, Point3d, Result, TriangleMesh};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Upper bound on collapse attempts relative to the input face count.
const ATTEMPT_FACTOR: usize = 10;

/// A scored collapse candidate.
///
/// Valid only while both endpoints remain unmerged; staleness is detected
/// on extraction, not insertion.
#[derive(Debug, Clone)]
struct Candidate {
    cost: f64,
    key: (usize, usize),
    position: Point3d,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal && self.key == other.key
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost; ties broken toward the lower index pair so
        // extraction order is deterministic.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Mutable topology state during simplification.
struct CollapseMesh {
    positions: Vec<Point3d>,
    quadrics: Vec<Quadric>,
    alive: Vec<bool>,
    /// Opposite vertices of every incident edge, per vertex.
    neighbors: Vec<HashSet<usize>>,
    /// Incident face ids, per vertex.
    vertex_faces: Vec<HashSet<usize>>,
    /// Faces by id; collapsed faces become `None`.
    faces: Vec<Option<[usize; 3]>>,
    active_faces: usize,
    /// Vertices on an unpaired or over-shared edge; frozen when boundary
    /// preservation is on.
    boundary: Vec<bool>,
}

impl CollapseMesh {
    fn build(mesh: &TriangleMesh) -> Self {
        let nv = mesh.vertex_count();
        let positions: Vec<Point3d> = mesh.vertices.iter().map(to_f64).collect();

        let mut neighbors = vec![HashSet::new(); nv];
        let mut vertex_faces = vec![HashSet::new(); nv];
        let mut quadrics = vec![Quadric::zero(); nv];

        for (fi, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].insert(fi);
            }
            for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
                neighbors[a].insert(b);
                neighbors[b].insert(a);
            }
            // Degenerate faces define no plane and contribute no quadric
            if let Some(q) = Quadric::from_triangle(
                &mesh.vertices[face[0]],
                &mesh.vertices[face[1]],
                &mesh.vertices[face[2]],
            ) {
                for &v in face {
                    quadrics[v].add(&q);
                }
            }
        }

        let mut boundary = vec![false; nv];
        for ((a, b), count) in mesh.edge_face_counts() {
            if count != 2 {
                boundary[a] = true;
                boundary[b] = true;
            }
        }

        Self {
            positions,
            quadrics,
            alive: vec![true; nv],
            neighbors,
            vertex_faces,
            faces: mesh.faces.iter().map(|f| Some(*f)).collect(),
            active_faces: mesh.face_count(),
            boundary,
        }
    }

    fn shared_face_count(&self, v1: usize, v2: usize) -> usize {
        self.vertex_faces[v1]
            .intersection(&self.vertex_faces[v2])
            .count()
    }

    /// Link condition: the common neighbors of the endpoints must be
    /// exactly the apex vertices of the faces along the edge. Anything
    /// more would pinch the surface into a non-manifold vertex.
    fn link_condition(&self, v1: usize, v2: usize) -> bool {
        let expected = match self.shared_face_count(v1, v2) {
            1 => 1,
            2 => 2,
            _ => return false,
        };
        let common = self.neighbors[v1]
            .intersection(&self.neighbors[v2])
            .count();
        common == expected
    }

    /// Score the collapse of edge (v1, v2): optimal merged position from
    /// the summed quadric, midpoint when the quadric is singular.
    fn candidate(&self, v1: usize, v2: usize) -> Candidate {
        let q = self.quadrics[v1].sum(&self.quadrics[v2]);
        let position = q.optimal_position().unwrap_or_else(|| {
            Point3d::from((self.positions[v1].coords + self.positions[v2].coords) * 0.5)
        });
        let cost = q.evaluate(&position);
        Candidate {
            cost,
            key: (v1.min(v2), v1.max(v2)),
            position,
        }
    }

    /// Merge v2 into v1 at `position`.
    fn collapse(&mut self, v1: usize, v2: usize, position: Point3d) {
        // Faces along the collapsed edge lose two of their corners and
        // are removed.
        let shared: Vec<usize> = self.vertex_faces[v1]
            .intersection(&self.vertex_faces[v2])
            .copied()
            .collect();
        for fi in shared {
            if let Some(face) = self.faces[fi].take() {
                for &v in &face {
                    self.vertex_faces[v].remove(&fi);
                }
                self.active_faces -= 1;
            }
        }

        // Surviving faces of v2 are rewired to v1
        let v2_faces: Vec<usize> = self.vertex_faces[v2].iter().copied().collect();
        for fi in v2_faces {
            if let Some(ref mut face) = self.faces[fi] {
                for v in face.iter_mut() {
                    if *v == v2 {
                        *v = v1;
                    }
                }
                self.vertex_faces[v1].insert(fi);
            }
        }
        self.vertex_faces[v2].clear();

        // Adjacency reflects the surviving topology only
        let v2_neighbors: Vec<usize> = self.neighbors[v2].iter().copied().collect();
        for w in v2_neighbors {
            self.neighbors[w].remove(&v2);
            if w != v1 {
                self.neighbors[w].insert(v1);
                self.neighbors[v1].insert(w);
            }
        }
        self.neighbors[v1].remove(&v2);
        self.neighbors[v2].clear();

        self.alive[v2] = false;
        self.positions[v1] = position;
        let merged = self.quadrics[v2];
        self.quadrics[v1].add(&merged);
    }

    /// Compact the surviving topology into a fresh mesh.
    fn to_mesh(&self) -> TriangleMesh {
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut vertices = Vec::new();

        for (vi, alive) in self.alive.iter().enumerate() {
            if *alive && !self.vertex_faces[vi].is_empty() {
                remap.insert(vi, vertices.len());
                vertices.push(to_f32(&self.positions[vi]));
            }
        }

        let mut faces = Vec::new();
        for face in self.faces.iter().flatten() {
            let (Some(&a), Some(&b), Some(&c)) = (
                remap.get(&face[0]),
                remap.get(&face[1]),
                remap.get(&face[2]),
            ) else {
                continue;
            };
            if a != b && b != c && c != a {
                faces.push([a, b, c]);
            }
        }

        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }
}

/// Quadric error metric edge collapse simplifier.
pub struct QuadricSimplifier {
    /// Exclude edges touching a boundary vertex from candidacy, keeping
    /// open meshes from shrinking at their rim.
    pub preserve_boundary: bool,
}

impl Default for QuadricSimplifier {
    fn default() -> Self {
        Self {
            preserve_boundary: true,
        }
    }
}

impl QuadricSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(preserve_boundary: bool) -> Self {
        Self { preserve_boundary }
    }

    fn edge_allowed(&self, cm: &CollapseMesh, v1: usize, v2: usize) -> bool {
        !self.preserve_boundary || (!cm.boundary[v1] && !cm.boundary[v2])
    }
}

impl MeshSimplifier for QuadricSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, rate: f32) -> Result<SimplifyReport> {
        mesh.validate()?;
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(Error::InvalidRate(rate));
        }

        let original = mesh.face_count();
        let target = ((rate as f64) * original as f64).ceil() as usize;

        if target >= original {
            return Ok(SimplifyReport {
                mesh: mesh.clone(),
                original_faces: original,
                target_faces: target,
                final_faces: original,
                collapses: 0,
                rejected: 0,
                reached_target: true,
            });
        }

        let mut cm = CollapseMesh::build(mesh);

        let mut queue: PriorityQueue<(usize, usize), Candidate> = PriorityQueue::new();
        for v1 in 0..cm.positions.len() {
            for &v2 in &cm.neighbors[v1] {
                if v2 <= v1 || !self.edge_allowed(&cm, v1, v2) {
                    continue;
                }
                let cand = cm.candidate(v1, v2);
                queue.push(cand.key, cand);
            }
        }

        let cap = original * ATTEMPT_FACTOR;
        let mut attempts = 0usize;
        let mut collapses = 0usize;
        let mut rejected = 0usize;

        while cm.active_faces > target && attempts < cap {
            let ((v1, v2), cand) = match queue.pop() {
                Some(entry) => entry,
                None => break, // no valid collapses remain
            };
            attempts += 1;

            // Stale entry: an endpoint was merged away since queuing
            if !cm.alive[v1] || !cm.alive[v2] || !cm.neighbors[v1].contains(&v2) {
                continue;
            }

            if !cm.link_condition(v1, v2) {
                rejected += 1;
                continue;
            }

            cm.collapse(v1, v2, cand.position);
            collapses += 1;

            // Every edge at the surviving vertex changed cost; re-score
            let affected: Vec<usize> = cm.neighbors[v1].iter().copied().collect();
            for w in affected {
                if !self.edge_allowed(&cm, v1, w) {
                    continue;
                }
                let fresh = cm.candidate(v1, w);
                queue.push(fresh.key, fresh);
            }
        }

        let reached_target = cm.active_faces <= target;
        if !reached_target {
            log::debug!(
                "simplification stopped at {} faces (target {}): no valid collapses left",
                cm.active_faces,
                target
            );
        }

        let out = cm.to_mesh();
        let final_faces = out.face_count();
        Ok(SimplifyReport {
            mesh: out,
            original_faces: original,
            target_faces: target,
            final_faces,
            collapses,
            rejected,
            reached_target,
        })
    }
}

/// Simplify with the default configuration.
pub fn simplify(mesh: &TriangleMesh, rate: f32) -> Result<SimplifyReport> {
    QuadricSimplifier::new().simplify(mesh, rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshops_core::Point3f;
    use std::f32::consts::PI;

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn make_plane_grid(size: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn make_sphere(rings: usize, segments: usize) -> TriangleMesh {
        let mut vertices = vec![Point3f::new(0.0, 0.0, 1.0)];
        for r in 1..rings {
            let phi = PI * r as f32 / rings as f32;
            for s in 0..segments {
                let theta = 2.0 * PI * s as f32 / segments as f32;
                vertices.push(Point3f::new(
                    phi.sin() * theta.cos(),
                    phi.sin() * theta.sin(),
                    phi.cos(),
                ));
            }
        }
        vertices.push(Point3f::new(0.0, 0.0, -1.0));
        let bottom = vertices.len() - 1;

        let mut faces = Vec::new();
        for s in 0..segments {
            faces.push([0, 1 + s, 1 + (s + 1) % segments]);
        }
        for r in 0..(rings - 2) {
            let a = 1 + r * segments;
            let b = 1 + (r + 1) * segments;
            for s in 0..segments {
                let s1 = (s + 1) % segments;
                faces.push([a + s, b + s, b + s1]);
                faces.push([a + s, b + s1, a + s1]);
            }
        }
        let last = 1 + (rings - 2) * segments;
        for s in 0..segments {
            faces.push([bottom, last + (s + 1) % segments, last + s]);
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    // ---- Validation tests ----

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(simplify(&TriangleMesh::new(), 0.5).is_err());
    }

    #[test]
    fn test_invalid_rates_rejected() {
        let mesh = make_tetrahedron();
        assert!(matches!(
            simplify(&mesh, 0.0),
            Err(Error::InvalidRate(_))
        ));
        assert!(matches!(
            simplify(&mesh, -0.3),
            Err(Error::InvalidRate(_))
        ));
        assert!(matches!(
            simplify(&mesh, 1.5),
            Err(Error::InvalidRate(_))
        ));
        assert!(matches!(
            simplify(&mesh, f32::NAN),
            Err(Error::InvalidRate(_))
        ));
    }

    #[test]
    fn test_rate_one_is_identity() {
        let mesh = make_plane_grid(5);
        let report = simplify(&mesh, 1.0).unwrap();
        assert_eq!(report.final_faces, mesh.face_count());
        assert_eq!(report.collapses, 0);
        assert!(report.reached_target);
    }

    // ---- Reduction tests ----

    #[test]
    fn test_sphere_reaches_modest_target() {
        let mesh = make_sphere(6, 8);
        assert_eq!(mesh.face_count(), 80);
        assert_eq!(mesh.unpaired_edge_count(), 0);

        let report = simplify(&mesh, 0.8).unwrap();
        assert!(report.reached_target, "{}", report);
        assert!(report.final_faces <= report.target_faces);
        assert!(report.final_faces > 0);
    }

    #[test]
    fn test_sphere_stays_closed() {
        let mesh = make_sphere(8, 10);
        let report = simplify(&mesh, 0.5).unwrap();
        assert_eq!(report.mesh.unpaired_edge_count(), 0);
        assert!(report.final_faces < mesh.face_count());
    }

    #[test]
    fn test_grid_reduces_under_boundary_preservation() {
        let mesh = make_plane_grid(6);
        assert_eq!(mesh.face_count(), 50);
        let report = simplify(&mesh, 0.6).unwrap();
        assert!(report.final_faces < 50);
        assert!(report.final_faces > 0);
        assert_eq!(report.original_faces, 50);
    }

    #[test]
    fn test_repeated_simplification_is_monotone() {
        let mesh = make_sphere(8, 10);
        let first = simplify(&mesh, 0.8).unwrap();
        let second = simplify(&first.mesh, 0.6).unwrap();
        let third = simplify(&second.mesh, 0.5).unwrap();
        assert!(first.final_faces <= mesh.face_count());
        assert!(second.final_faces <= first.final_faces);
        assert!(third.final_faces <= second.final_faces);
    }

    #[test]
    fn test_output_face_count_never_exceeds_input() {
        let mesh = make_sphere(6, 8);
        for rate in [0.2, 0.5, 0.9, 1.0] {
            let report = simplify(&mesh, rate).unwrap();
            assert!(report.final_faces <= mesh.face_count());
        }
    }

    // ---- Manifold constraint tests ----

    #[test]
    fn test_tetrahedron_target_is_unreachable() {
        let mesh = make_tetrahedron();
        let report = simplify(&mesh, 0.25).unwrap();
        // One collapse leaves a two-face pillow that no valid collapse
        // can reduce further.
        assert!(!report.reached_target);
        assert!(report.final_faces >= 2);
        assert!(report.rejected > 0 || report.collapses > 0);
    }

    #[test]
    fn test_grid_corner_faces_block_extreme_targets() {
        let mesh = make_plane_grid(6);
        let report = simplify(&mesh, 0.05).unwrap();
        assert!(!report.reached_target);
        assert!(report.final_faces > report.target_faces);
        // The best-effort mesh is still returned
        assert!(report.mesh.face_count() == report.final_faces);
    }

    #[test]
    fn test_boundary_vertices_survive() {
        let mesh = make_plane_grid(5);
        let report = simplify(&mesh, 0.5).unwrap();

        let corners = [
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(4.0, 0.0, 0.0),
            Point3f::new(0.0, 4.0, 0.0),
            Point3f::new(4.0, 4.0, 0.0),
        ];
        for corner in &corners {
            assert!(
                report
                    .mesh
                    .vertices
                    .iter()
                    .any(|v| (v - corner).norm() < 1e-5),
                "corner {:?} was moved or removed",
                corner
            );
        }
    }

    #[test]
    fn test_simplified_mesh_is_valid() {
        let mesh = make_sphere(8, 10);
        let report = simplify(&mesh, 0.4).unwrap();
        assert!(report.mesh.validate().is_ok());
    }

    // ---- Determinism ----

    #[test]
    fn test_same_input_gives_same_output() {
        let mesh = make_sphere(6, 8);
        let a = simplify(&mesh, 0.5).unwrap();
        let b = simplify(&mesh, 0.5).unwrap();
        assert_eq!(a.final_faces, b.final_faces);
        assert_eq!(a.collapses, b.collapses);
        assert_eq!(a.mesh.vertex_count(), b.mesh.vertex_count());
    }
}
