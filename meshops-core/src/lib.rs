//! Core data structures for meshops
//!
//! This crate provides the triangle mesh representation shared by all
//! meshops algorithms, together with the common error taxonomy.

pub mod error;
pub mod mesh;
pub mod point;

pub use error::*;
pub use mesh::*;
pub use point::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Common result type for meshops operations
pub type Result<T> = std::result::Result<T, Error>;

// Type alias for easier imports
pub type Mesh = TriangleMesh;
