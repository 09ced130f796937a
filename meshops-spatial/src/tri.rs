//! Per-triangle geometric predicates
//!
//! Ray-triangle intersection and point-triangle distance, computed in
//! double precision regardless of mesh storage precision.

use meshops_core::{Point3d, Vector3d};

/// A single ray-mesh intersection record.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Parametric distance along the ray direction.
    pub distance: f64,
    /// Index of the intersected face.
    pub face: usize,
    /// Barycentric coordinate of the hit toward the face's second vertex.
    pub u: f64,
    /// Barycentric coordinate of the hit toward the face's third vertex.
    pub v: f64,
}

/// Result of casting one ray against a mesh.
///
/// `suspect` counts reached triangles whose intersection test was
/// numerically unstable (near-parallel plane or a hit grazing a triangle
/// edge); callers that rely on crossing parity must treat any suspect
/// cast as unreliable and retry with a perturbed direction.
#[derive(Debug, Clone)]
pub struct RayCast {
    pub hits: Vec<RayHit>,
    pub suspect: usize,
}

impl RayCast {
    pub fn is_reliable(&self) -> bool {
        self.suspect == 0
    }
}

pub(crate) enum TriangleHit {
    Miss,
    Hit { t: f64, u: f64, v: f64 },
    Grazing,
}

// Barycentric margin below which a hit counts as grazing an edge
const BARY_EPS: f64 = 1e-9;

/// Möller–Trumbore intersection of a forward ray with one triangle.
///
/// `parallel_eps` is the scale-relative threshold under which the
/// denominator is considered degenerate.
pub(crate) fn ray_triangle(
    origin: &Point3d,
    dir: &Vector3d,
    tri: &[Point3d; 3],
    parallel_eps: f64,
) -> TriangleHit {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);

    if det.abs() < parallel_eps {
        // Parallel ray: only degenerate when the origin is near the
        // triangle's plane; otherwise it is a clean miss.
        let n = edge1.cross(&edge2);
        let n_len = n.norm();
        if n_len < 1e-300 {
            return TriangleHit::Miss; // zero-area face never intersects
        }
        let plane_dist = n.dot(&(origin - tri[0])) / n_len;
        if plane_dist.abs() < parallel_eps {
            return TriangleHit::Grazing;
        }
        return TriangleHit::Miss;
    }

    let inv_det = 1.0 / det;
    let s = origin - tri[0];
    let u = inv_det * s.dot(&h);
    if !(-BARY_EPS..=1.0 + BARY_EPS).contains(&u) {
        return TriangleHit::Miss;
    }

    let q = s.cross(&edge1);
    let v = inv_det * dir.dot(&q);
    if v < -BARY_EPS || u + v > 1.0 + BARY_EPS {
        return TriangleHit::Miss;
    }

    let t = inv_det * edge2.dot(&q);
    if t <= 0.0 {
        return TriangleHit::Miss;
    }

    // A hit that grazes an edge or corner would be double counted by the
    // adjacent face; report it as unstable instead of guessing.
    if u < BARY_EPS || v < BARY_EPS || u + v > 1.0 - BARY_EPS {
        return TriangleHit::Grazing;
    }

    TriangleHit::Hit { t, u, v }
}

/// Squared distance from a point to a triangle (Ericson, Real-Time
/// Collision Detection, closest-point-on-triangle).
pub(crate) fn point_triangle_distance_squared(p: &Point3d, tri: &[Point3d; 3]) -> f64 {
    let [a, b, c] = *tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ap.norm_squared(); // vertex a
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return bp.norm_squared(); // vertex b
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return (ap - ab * t).norm_squared(); // edge ab
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return cp.norm_squared(); // vertex c
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return (ap - ac * t).norm_squared(); // edge ac
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        let closest = b + (c - b) * t;
        return (p - closest).norm_squared(); // edge bc
    }

    // Interior: project onto the triangle plane
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let closest = a + ab * v + ac * w;
    (p - closest).norm_squared()
}
