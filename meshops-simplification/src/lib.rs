//! Mesh simplification
//!
//! Iterative edge collapse driven by quadric error metrics. Collapses are
//! ordered by ascending cost, stale candidates are discarded lazily, and a
//! link-condition check rejects collapses that would create non-manifold
//! topology.

pub mod edge_collapse;
pub mod quadric;
pub mod report;

pub use edge_collapse::{simplify, QuadricSimplifier};
pub use report::SimplifyReport;

use meshops_core::{Result, TriangleMesh};

/// Simplify a mesh toward a target fraction of its original face count.
pub trait MeshSimplifier {
    /// `rate` is the fraction of the original face count to retain,
    /// in (0, 1].
    fn simplify(&self, mesh: &TriangleMesh, rate: f32) -> Result<SimplifyReport>;
}
