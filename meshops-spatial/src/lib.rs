//! Spatial queries over triangle meshes
//!
//! This crate provides the bounding volume hierarchy used to accelerate
//! ray-mesh intersection and closest-point queries. The hierarchy is built
//! once per mesh and is read-only afterwards.

pub mod aabb;
pub mod bvh;
pub mod tri;

pub use aabb::Aabb;
pub use bvh::Bvh;
pub use tri::{RayCast, RayHit};
