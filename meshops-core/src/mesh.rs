//! Mesh data structures and functionality

use crate::point::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Create a mesh from vertices and faces, rejecting malformed input.
    ///
    /// Fails with [`Error::InvalidMesh`] when the vertex or face sequence is
    /// empty or any face references an out-of-range vertex.
    pub fn validated(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Result<Self> {
        let mesh = Self::from_vertices_and_faces(vertices, faces);
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check the mesh invariants without consuming it.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() || self.faces.is_empty() {
            return Err(Error::InvalidMesh(
                "mesh must have at least one vertex and one face".to_string(),
            ));
        }
        for (fi, face) in self.faces.iter().enumerate() {
            for &vi in face {
                if vi >= self.vertices.len() {
                    return Err(Error::InvalidMesh(format!(
                        "face {} references vertex {} but mesh has {} vertices",
                        fi,
                        vi,
                        self.vertices.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Corner positions of a face.
    pub fn face_points(&self, face_index: usize) -> [Point3f; 3] {
        let [a, b, c] = self.faces[face_index];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Unit normal of a face from its winding order.
    ///
    /// Degenerate (zero-area) faces return the zero vector; callers that
    /// weight by area must skip them via [`TriangleMesh::is_degenerate_face`].
    pub fn face_normal(&self, face_index: usize) -> Vector3f {
        let [v0, v1, v2] = self.face_points(face_index);
        let n = (v1 - v0).cross(&(v2 - v0));
        let len = n.norm();
        if len > 1e-12 {
            n / len
        } else {
            Vector3f::zeros()
        }
    }

    /// Whether a face has (numerically) zero area.
    pub fn is_degenerate_face(&self, face_index: usize) -> bool {
        let [v0, v1, v2] = self.face_points(face_index);
        (v1 - v0).cross(&(v2 - v0)).norm() <= 1e-12
    }

    /// Centroid of a face.
    pub fn face_centroid(&self, face_index: usize) -> Point3f {
        let [v0, v1, v2] = self.face_points(face_index);
        Point3f::new(
            (v0.x + v1.x + v2.x) / 3.0,
            (v0.y + v1.y + v2.y) / 3.0,
            (v0.z + v1.z + v2.z) / 3.0,
        )
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.vertices.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for vertex in &self.vertices {
            min.x = min.x.min(vertex.x);
            min.y = min.y.min(vertex.y);
            min.z = min.z.min(vertex.z);

            max.x = max.x.max(vertex.x);
            max.y = max.y.max(vertex.y);
            max.z = max.z.max(vertex.z);
        }

        (min, max)
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }

    /// Length of the bounding-box diagonal.
    pub fn bounding_diagonal(&self) -> f64 {
        let (min, max) = self.bounding_box();
        let d = max - min;
        ((d.x as f64).powi(2) + (d.y as f64).powi(2) + (d.z as f64).powi(2)).sqrt()
    }

    /// Scale-relative tolerance for geometric predicates over this mesh.
    ///
    /// All coplanarity, visibility and intersection tests derive their
    /// epsilon from here so behavior stays uniform across mesh scales.
    pub fn relative_epsilon(&self) -> f64 {
        self.bounding_diagonal().max(1.0) * 1e-7
    }

    /// Count how many faces border each undirected edge.
    pub fn edge_face_counts(&self) -> HashMap<(usize, usize), usize> {
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for face in &self.faces {
            let edges = [
                (face[0].min(face[1]), face[0].max(face[1])),
                (face[1].min(face[2]), face[1].max(face[2])),
                (face[2].min(face[0]), face[2].max(face[0])),
            ];
            for &e in &edges {
                *counts.entry(e).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of edges not shared by exactly two faces.
    ///
    /// Zero for a closed manifold surface; used as the opportunistic
    /// closure check before containment testing.
    pub fn unpaired_edge_count(&self) -> usize {
        self.edge_face_counts()
            .values()
            .filter(|&&c| c != 2)
            .count()
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
