//! # meshops algorithms
//!
//! Geometric algorithms over triangle meshes: containment testing by
//! parity ray casting, and incremental convex hull construction.

pub mod containment;
pub mod hull;

pub use containment::is_inside;
pub use hull::convex_hull;
