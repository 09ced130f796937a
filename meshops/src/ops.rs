//! File-path entry points
//!
//! The operations exposed to host applications: each reads its inputs,
//! runs the kernel, and (for hull and simplify) writes the result through
//! the atomic mesh writer, so no partial output survives a failure.

use meshops_core::Result;
use meshops_simplification::SimplifyReport;
use std::path::Path;

/// Decide whether the mesh stored at `path_b` lies entirely inside the
/// closed mesh stored at `path_a`.
pub fn mesh_b_inside_mesh_a<P, Q>(path_a: P, path_b: Q) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mesh_a = meshops_io::read_mesh(path_a)?;
    let mesh_b = meshops_io::read_mesh(path_b)?;
    let inside = meshops_algorithms::is_inside(&mesh_a, &mesh_b)?;
    log::info!("containment test finished: inside = {}", inside);
    Ok(inside)
}

/// Compute the convex hull of the mesh at `input` and write it to
/// `output`.
pub fn convex_hull_of_mesh<P, Q>(input: P, output: Q) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mesh = meshops_io::read_mesh(input)?;
    let hull = meshops_algorithms::convex_hull(&mesh)?;
    log::info!(
        "hull of {} vertices has {} vertices / {} faces",
        mesh.vertex_count(),
        hull.vertex_count(),
        hull.face_count()
    );
    meshops_io::write_mesh(&hull, output)
}

/// Simplify the mesh at `input` to `rate` times its original face count
/// and write the result to `output`.
///
/// The returned report carries the achieved face count; when manifold
/// constraints stop the reduction short of the target, the best-effort
/// mesh is still written and `reached_target` is false.
pub fn simplify_mesh<P, Q>(input: P, output: Q, rate: f32) -> Result<SimplifyReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mesh = meshops_io::read_mesh(input)?;
    let report = meshops_simplification::simplify(&mesh, rate)?;
    log::info!("{}", report);
    meshops_io::write_mesh(&report.mesh, output)?;
    Ok(report)
}
