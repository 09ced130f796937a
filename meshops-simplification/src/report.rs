//! Simplification outcome reporting

use meshops_core::TriangleMesh;
use std::fmt;

/// Result of a simplification run.
///
/// Falling short of the target is not an error: manifold constraints can
/// make further collapses impossible, in which case the best-effort mesh is
/// returned with `reached_target` set to false.
#[derive(Debug, Clone)]
pub struct SimplifyReport {
    /// The simplified mesh.
    pub mesh: TriangleMesh,
    /// Face count of the input.
    pub original_faces: usize,
    /// Requested face count (`ceil(rate * original_faces)`).
    pub target_faces: usize,
    /// Face count of the output.
    pub final_faces: usize,
    /// Number of edge collapses performed.
    pub collapses: usize,
    /// Number of candidate collapses rejected by the manifold check.
    pub rejected: usize,
    /// Whether the output reached the target face count.
    pub reached_target: bool,
}

impl fmt::Display for SimplifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "simplified {} -> {} faces (target {}, {} collapses, {} rejected{})",
            self.original_faces,
            self.final_faces,
            self.target_faces,
            self.collapses,
            self.rejected,
            if self.reached_target {
                ""
            } else {
                ", target unreachable"
            }
        )
    }
}
