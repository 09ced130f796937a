//! # meshops
//!
//! Triangle mesh operations behind a small, typed API: containment
//! testing, convex hull construction, and quadric-error simplification.
//!
//! This is the umbrella crate providing the file-path entry points plus
//! convenient access to the underlying crates. Use the individual crates
//! (`meshops-core`, `meshops-spatial`, `meshops-algorithms`,
//! `meshops-simplification`, `meshops-io`) for more granular control over
//! dependencies.
//!
//! ## Quick start
//!
//! ```no_run
//! use meshops::prelude::*;
//!
//! fn main() -> meshops::Result<()> {
//!     // Is the mesh in b.off entirely inside the mesh in a.off?
//!     let inside = meshops::mesh_b_inside_mesh_a("a.off", "b.off")?;
//!     println!("inside: {}", inside);
//!
//!     // Write the convex hull of a mesh
//!     meshops::convex_hull_of_mesh("a.off", "hull.off")?;
//!
//!     // Keep roughly a quarter of the triangles
//!     let report = meshops::simplify_mesh("a.off", "simple.off", 0.25)?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

mod ops;

pub use ops::{convex_hull_of_mesh, mesh_b_inside_mesh_a, simplify_mesh};

// Re-export core functionality
pub use meshops_core::*;

// Re-export sub-crates
pub use meshops_algorithms as algorithms;
pub use meshops_io as io;
pub use meshops_simplification as simplification;
pub use meshops_spatial as spatial;

/// Commonly used items in one import
pub mod prelude {
    pub use crate::{convex_hull_of_mesh, mesh_b_inside_mesh_a, simplify_mesh};
    pub use meshops_algorithms::{convex_hull, is_inside};
    pub use meshops_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
    pub use meshops_io::{read_mesh, write_mesh};
    pub use meshops_simplification::{simplify, SimplifyReport};
    pub use meshops_spatial::Bvh;
}
