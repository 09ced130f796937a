//! Mesh containment testing
//!
//! Decides whether one closed mesh encloses another by casting a fixed
//! direction ray from sample points of the inner mesh against the outer
//! mesh and counting crossings (parity rule). Points on the outer surface
//! count as inside.

use meshops_core::{to_f64, Error, Point3d, Result, TriangleMesh, Vector3d};
use meshops_spatial::Bvh;
use rayon::prelude::*;

/// Bounded number of deterministic direction perturbations applied when a
/// cast grazes a face edge or a coplanar face.
const MAX_RETRIES: usize = 4;

/// Fixed primary cast direction. Deliberately not axis aligned so that
/// axis-aligned geometry does not produce coplanar casts on the first try.
fn cast_direction(retry: usize) -> Vector3d {
    let k = retry as f64;
    Vector3d::new(1.0 + 0.37 * k, 2.0 - 0.21 * k, 3.0 + 0.45 * k).normalize()
}

/// Classify one sample against the outer mesh.
///
/// Boundary (within `eps` of the surface) is treated as inside, which makes
/// a mesh trivially contained in itself. Crossings closer than `eps` to the
/// sample are self-touch artifacts and are discarded.
fn sample_is_inside(bvh: &Bvh, sample: &Point3d, eps: f64) -> Result<bool> {
    let (_, surface_dist) = bvh.closest_point(sample);
    if surface_dist <= eps {
        return Ok(true);
    }

    for retry in 0..=MAX_RETRIES {
        let dir = cast_direction(retry);
        let cast = bvh.cast_ray(sample, &dir);
        if !cast.is_reliable() {
            log::debug!(
                "degenerate cast at {:?} (retry {}), perturbing direction",
                sample,
                retry
            );
            continue;
        }
        let crossings = cast.hits.iter().filter(|h| h.distance > eps).count();
        return Ok(crossings % 2 == 1);
    }

    Err(Error::DegenerateQuery(MAX_RETRIES))
}

/// Decide whether every point of `inner` lies inside the closed volume
/// bounded by `outer`.
///
/// Samples the inner mesh at its vertices and face centroids and requires
/// all samples to be inside. Fails with [`Error::NonClosedMesh`] when the
/// outer mesh has unpaired edges (no consistent inside/outside split
/// exists), and with [`Error::DegenerateQuery`] when a cast stays
/// numerically unstable through all perturbation retries.
pub fn is_inside(outer: &TriangleMesh, inner: &TriangleMesh) -> Result<bool> {
    outer.validate()?;
    inner.validate()?;

    let unpaired = outer.unpaired_edge_count();
    if unpaired > 0 {
        return Err(Error::NonClosedMesh(unpaired));
    }

    let bvh = Bvh::build(outer)?;
    let eps = outer.relative_epsilon();

    let samples: Vec<Point3d> = inner
        .vertices
        .iter()
        .map(to_f64)
        .chain((0..inner.face_count()).map(|fi| to_f64(&inner.face_centroid(fi))))
        .collect();

    log::debug!(
        "containment test: {} samples against {} outer faces",
        samples.len(),
        outer.face_count()
    );

    // Per-sample parity is independent, so the casts fan out in parallel.
    samples
        .par_iter()
        .map(|sample| sample_is_inside(&bvh, sample, eps))
        .try_reduce(|| true, |a, b| Ok(a && b))
}
