//! Incremental convex hull construction
//!
//! Builds the convex hull of a mesh's vertex set: an initial tetrahedron
//! from extremal points, then farthest-first insertion of the remaining
//! points with visible-face removal and horizon re-triangulation.

use meshops_core::{to_f64, Error, Point3d, Result, TriangleMesh, Vector3d};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Hard cap on insertion iterations for pathological input.
const MAX_ITERATIONS: usize = 100_000;

/// Attempts at random simplex selection when the extremal-coordinate
/// search lands on a coplanar configuration.
const FALLBACK_ATTEMPTS: usize = 32;

/// One face of the hull under construction.
#[derive(Debug, Clone)]
struct HullFace {
    vertices: [usize; 3],
    normal: Vector3d,
    /// Plane constant `normal . v0`, cached for distance tests.
    d: f64,
    outside: Vec<usize>,
    furthest: Option<(usize, f64)>,
    deleted: bool,
}

impl HullFace {
    fn new(v0: usize, v1: usize, v2: usize, points: &[Point3d]) -> Self {
        let e1 = points[v1] - points[v0];
        let e2 = points[v2] - points[v0];
        let n = e1.cross(&e2);
        let len = n.norm();
        let normal = if len > 1e-300 {
            n / len
        } else {
            Vector3d::new(0.0, 0.0, 1.0)
        };
        let d = normal.dot(&points[v0].coords);
        Self {
            vertices: [v0, v1, v2],
            normal,
            d,
            outside: Vec::new(),
            furthest: None,
            deleted: false,
        }
    }

    #[inline]
    fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&p.coords) - self.d
    }

    #[inline]
    fn is_visible_from(&self, p: &Point3d, eps: f64) -> bool {
        self.signed_distance(p) > eps
    }

    fn assign(&mut self, point: usize, distance: f64) {
        self.outside.push(point);
        match self.furthest {
            Some((_, best)) if best >= distance => {}
            _ => self.furthest = Some((point, distance)),
        }
    }

    fn recompute_furthest(&mut self, points: &[Point3d]) {
        self.furthest = None;
        for &pi in &self.outside {
            let dist = self.normal.dot(&points[pi].coords) - self.d;
            match self.furthest {
                Some((_, best)) if best >= dist => {}
                _ => self.furthest = Some((pi, dist)),
            }
        }
    }

    /// Flip winding so the normal points away from `interior`.
    fn orient_outward(&mut self, interior: &Point3d) {
        if self.signed_distance(interior) > 0.0 {
            self.vertices.swap(1, 2);
            self.normal = -self.normal;
            self.d = -self.d;
        }
    }
}

/// Compute the convex hull of the input's vertex positions.
///
/// Fails with [`Error::DegenerateInput`] when fewer than four well-spread
/// points exist (all points collinear or coplanar); a coplanar point set is
/// rejected rather than flattened to a 2D hull.
pub fn convex_hull(mesh: &TriangleMesh) -> Result<TriangleMesh> {
    mesh.validate()?;
    let eps = mesh.relative_epsilon();

    // Deduplicate in sorted-by-coordinate order so insertion is
    // reproducible regardless of input vertex order.
    let points = dedup_sorted(mesh, eps);
    if points.len() < 4 {
        return Err(Error::DegenerateInput(
            "convex hull needs at least 4 distinct points".to_string(),
        ));
    }

    let simplex = initial_simplex(&points, eps)?;
    let interior = simplex_centroid(&simplex, &points);

    let mut faces = vec![
        HullFace::new(simplex[0], simplex[1], simplex[2], &points),
        HullFace::new(simplex[0], simplex[2], simplex[3], &points),
        HullFace::new(simplex[0], simplex[3], simplex[1], &points),
        HullFace::new(simplex[1], simplex[3], simplex[2], &points),
    ];
    for face in &mut faces {
        face.orient_outward(&interior);
    }

    // Initial assignment: every point outside the simplex goes to the
    // first face it is visible from.
    for (pi, p) in points.iter().enumerate() {
        if simplex.contains(&pi) {
            continue;
        }
        for face in &mut faces {
            if face.is_visible_from(p, eps) {
                let dist = face.signed_distance(p);
                face.assign(pi, dist);
                break;
            }
        }
    }

    let cap = MAX_ITERATIONS.min(points.len() * 8 + 10_000);
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        if iterations > cap {
            log::error!("convex hull exceeded {} iterations, giving up", cap);
            return Err(Error::DegenerateInput(
                "convex hull iteration cap exceeded".to_string(),
            ));
        }

        // Face holding the globally furthest outside point
        let mut apex = None;
        let mut apex_dist = 0.0;
        for (fi, face) in faces.iter().enumerate() {
            if face.deleted {
                continue;
            }
            if let Some((pi, dist)) = face.furthest {
                if dist > apex_dist {
                    apex_dist = dist;
                    apex = Some((fi, pi));
                }
            }
        }
        let (_, apex_point) = match apex {
            Some(a) => a,
            None => break, // nothing left outside: the hull is complete
        };
        let p = points[apex_point];

        let visible: Vec<usize> = faces
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.deleted && f.is_visible_from(&p, eps))
            .map(|(fi, _)| fi)
            .collect();
        if visible.is_empty() {
            // Numerical disagreement between assignment and visibility;
            // drop the point rather than loop on it.
            for face in &mut faces {
                if face.deleted {
                    continue;
                }
                face.outside.retain(|&pi| pi != apex_point);
                face.recompute_furthest(&points);
            }
            continue;
        }

        let horizon = horizon_edges(&faces, &visible);

        // Reclaim points from removed faces
        let mut orphans: Vec<usize> = Vec::new();
        for &fi in &visible {
            orphans.extend(faces[fi].outside.iter().copied());
            faces[fi].deleted = true;
            faces[fi].outside.clear();
            faces[fi].furthest = None;
        }
        orphans.retain(|&pi| pi != apex_point);
        orphans.sort_unstable();
        orphans.dedup();

        // Triangulate the horizon loop toward the new point
        let mut new_faces: Vec<HullFace> = horizon
            .iter()
            .map(|&(v0, v1)| {
                let mut face = HullFace::new(v0, v1, apex_point, &points);
                face.orient_outward(&interior);
                face
            })
            .collect();

        for &pi in &orphans {
            let q = points[pi];
            let mut assigned = false;
            for face in &mut new_faces {
                if face.is_visible_from(&q, eps) {
                    let dist = face.signed_distance(&q);
                    face.assign(pi, dist);
                    assigned = true;
                    break;
                }
            }
            if !assigned {
                for face in faces.iter_mut().filter(|f| !f.deleted) {
                    if face.is_visible_from(&q, eps) {
                        let dist = face.signed_distance(&q);
                        face.assign(pi, dist);
                        break;
                    }
                }
            }
        }

        faces.append(&mut new_faces);
    }

    log::debug!(
        "convex hull finished after {} iterations with {} faces",
        iterations,
        faces.iter().filter(|f| !f.deleted).count()
    );

    build_hull_mesh(&faces, &points)
}

/// Sort vertices lexicographically and drop near-duplicates.
fn dedup_sorted(mesh: &TriangleMesh, eps: f64) -> Vec<Point3d> {
    let mut points: Vec<Point3d> = mesh.vertices.iter().map(to_f64).collect();
    points.sort_by(|a, b| {
        a.x.total_cmp(&b.x)
            .then(a.y.total_cmp(&b.y))
            .then(a.z.total_cmp(&b.z))
    });
    let mut unique: Vec<Point3d> = Vec::with_capacity(points.len());
    for p in points {
        if unique
            .last()
            .map_or(true, |last| (p - last).norm() > eps)
        {
            unique.push(p);
        }
    }
    unique
}

fn simplex_centroid(simplex: &[usize; 4], points: &[Point3d]) -> Point3d {
    let mut c = Vector3d::zeros();
    for &i in simplex {
        c += points[i].coords;
    }
    Point3d::from(c / 4.0)
}

/// Pick four non-coplanar points: extremal-coordinate search first, then
/// seeded random sampling, then reject as degenerate.
fn initial_simplex(points: &[Point3d], eps: f64) -> Result<[usize; 4]> {
    if let Some(simplex) = extremal_simplex(points, eps) {
        return Ok(simplex);
    }

    log::debug!("extremal simplex degenerate, falling back to random sampling");
    let mut rng = StdRng::seed_from_u64(0x6d65_7368);
    for _ in 0..FALLBACK_ATTEMPTS {
        let mut pick = [0usize; 4];
        for slot in &mut pick {
            *slot = rng.gen_range(0..points.len());
        }
        if pick[0] != pick[1]
            && pick[0] != pick[2]
            && pick[0] != pick[3]
            && pick[1] != pick[2]
            && pick[1] != pick[3]
            && pick[2] != pick[3]
            && tetra_volume(points, pick) > eps
        {
            return Ok(pick);
        }
    }

    Err(Error::DegenerateInput(
        "vertex set is coplanar or collinear".to_string(),
    ))
}

fn tetra_volume(points: &[Point3d], idx: [usize; 4]) -> f64 {
    let a = points[idx[1]] - points[idx[0]];
    let b = points[idx[2]] - points[idx[0]];
    let c = points[idx[3]] - points[idx[0]];
    a.cross(&b).dot(&c).abs()
}

fn extremal_simplex(points: &[Point3d], eps: f64) -> Option<[usize; 4]> {
    // The six axis extremes
    let mut extremes = [0usize; 6];
    for (pi, p) in points.iter().enumerate() {
        if p.x < points[extremes[0]].x {
            extremes[0] = pi;
        }
        if p.x > points[extremes[1]].x {
            extremes[1] = pi;
        }
        if p.y < points[extremes[2]].y {
            extremes[2] = pi;
        }
        if p.y > points[extremes[3]].y {
            extremes[3] = pi;
        }
        if p.z < points[extremes[4]].z {
            extremes[4] = pi;
        }
        if p.z > points[extremes[5]].z {
            extremes[5] = pi;
        }
    }

    // Farthest pair among the extremes
    let (mut v0, mut v1, mut best) = (0, 0, 0.0);
    for i in 0..6 {
        for j in (i + 1)..6 {
            let d = (points[extremes[i]] - points[extremes[j]]).norm();
            if d > best {
                best = d;
                v0 = extremes[i];
                v1 = extremes[j];
            }
        }
    }
    if best < eps {
        return None;
    }

    // Farthest point from the v0-v1 line
    let line = (points[v1] - points[v0]).normalize();
    let (mut v2, mut best) = (0, 0.0);
    for (pi, p) in points.iter().enumerate() {
        if pi == v0 || pi == v1 {
            continue;
        }
        let rel = p - points[v0];
        let d = (rel - line * rel.dot(&line)).norm();
        if d > best {
            best = d;
            v2 = pi;
        }
    }
    if best < eps {
        return None;
    }

    // Farthest point from the v0-v1-v2 plane, on either side
    let n = (points[v1] - points[v0])
        .cross(&(points[v2] - points[v0]))
        .normalize();
    let (mut v3, mut best) = (0, 0.0);
    for (pi, p) in points.iter().enumerate() {
        if pi == v0 || pi == v1 || pi == v2 {
            continue;
        }
        let d = n.dot(&(p - points[v0])).abs();
        if d > best {
            best = d;
            v3 = pi;
        }
    }
    if best < eps {
        return None;
    }

    Some([v0, v1, v2, v3])
}

/// Boundary loop of the visible region: edges appearing in exactly one
/// visible face, with the orientation they carry in that face.
fn horizon_edges(faces: &[HullFace], visible: &[usize]) -> Vec<(usize, usize)> {
    let mut edge_owner: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    for &fi in visible {
        let [a, b, c] = faces[fi].vertices;
        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            let key = (v0.min(v1), v0.max(v1));
            match edge_owner.entry(key) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert((v0, v1));
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    // Shared by two visible faces: interior, not horizon
                    e.remove();
                }
            }
        }
    }

    let mut horizon: Vec<(usize, usize)> = edge_owner.into_values().collect();
    // HashMap order is arbitrary; sort for reproducible face ordering
    horizon.sort_unstable();
    horizon
}

/// Compact the surviving faces into a mesh holding only referenced vertices.
fn build_hull_mesh(faces: &[HullFace], points: &[Point3d]) -> Result<TriangleMesh> {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut out_faces = Vec::new();

    for face in faces.iter().filter(|f| !f.deleted) {
        let mut mapped = [0usize; 3];
        for (slot, &vi) in mapped.iter_mut().zip(face.vertices.iter()) {
            let next = remap.len();
            let idx = *remap.entry(vi).or_insert(next);
            if idx == vertices.len() {
                vertices.push(meshops_core::to_f32(&points[vi]));
            }
            *slot = idx;
        }
        out_faces.push(mapped);
    }

    TriangleMesh::validated(vertices, out_faces)
}
