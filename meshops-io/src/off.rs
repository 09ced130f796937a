//! OFF format support
//!
//! ASCII Object File Format: an `OFF` header, counts, vertex lines, then
//! polygon lines which are fan-triangulated on read.

use crate::{persist_atomically, MeshReader, MeshWriter};
use meshops_core::{Error, Point3f, Result, TriangleMesh};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub struct OffReader;
pub struct OffWriter;

impl MeshReader for OffReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let text = fs::read_to_string(path)?;
        parse_off(&text)
    }
}

impl MeshWriter for OffWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        mesh.validate()?;
        let mut out = String::new();
        out.push_str("OFF\n");
        let _ = writeln!(out, "{} {} 0", mesh.vertex_count(), mesh.face_count());
        for v in &mesh.vertices {
            let _ = writeln!(out, "{} {} {}", v.x, v.y, v.z);
        }
        for face in &mesh.faces {
            let _ = writeln!(out, "3 {} {} {}", face[0], face[1], face[2]);
        }
        persist_atomically(path.as_ref(), out.as_bytes())
    }
}

fn parse_off(text: &str) -> Result<TriangleMesh> {
    // Strip comments and blank lines up front
    let mut lines = text.lines().filter_map(|line| {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    });

    let header = lines
        .next()
        .ok_or_else(|| Error::Parse("empty OFF file".to_string()))?;

    // Counts may share the header line or follow on the next one
    let counts_line = if header == "OFF" {
        lines
            .next()
            .ok_or_else(|| Error::Parse("missing OFF counts line".to_string()))?
    } else if let Some(rest) = header.strip_prefix("OFF") {
        rest.trim()
    } else {
        return Err(Error::Parse("missing OFF header".to_string()));
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| Error::Parse(format!("bad OFF count: {}", t)))
        })
        .collect::<Result<_>>()?;
    if counts.len() < 2 {
        return Err(Error::Parse(format!(
            "expected vertex/face counts, got {:?}",
            counts_line
        )));
    }
    let (nv, nf) = (counts[0], counts[1]);

    let mut vertices = Vec::with_capacity(nv);
    for _ in 0..nv {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("unexpected end of vertex list".to_string()))?;
        let coords: Vec<f32> = line
            .split_whitespace()
            .take(3)
            .map(|t| {
                t.parse::<f32>()
                    .map_err(|_| Error::Parse(format!("bad vertex coordinate: {}", t)))
            })
            .collect::<Result<_>>()?;
        if coords.len() != 3 {
            return Err(Error::Parse(format!("short vertex line: {}", line)));
        }
        vertices.push(Point3f::new(coords[0], coords[1], coords[2]));
    }

    let mut faces = Vec::with_capacity(nf);
    for _ in 0..nf {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("unexpected end of face list".to_string()))?;
        let mut tokens = line.split_whitespace();
        let k: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::Parse(format!("bad face line: {}", line)))?;
        if k < 3 {
            return Err(Error::Parse(format!(
                "face with {} vertices is not a polygon",
                k
            )));
        }
        let indices: Vec<usize> = tokens
            .by_ref()
            .take(k)
            .map(|t| {
                t.parse::<usize>()
                    .map_err(|_| Error::Parse(format!("bad face index: {}", t)))
            })
            .collect::<Result<_>>()?;
        if indices.len() != k {
            return Err(Error::Parse(format!("short face line: {}", line)));
        }
        // Fan triangulation for polygons beyond triangles
        for i in 1..(k - 1) {
            faces.push([indices[0], indices[i], indices[i + 1]]);
        }
    }

    TriangleMesh::validated(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tetra.off");
        let mesh = make_tetrahedron();

        OffWriter::write_mesh(&mesh, &path).unwrap();
        let loaded = OffReader::read_mesh(&path).unwrap();

        assert_eq!(mesh.vertex_count(), loaded.vertex_count());
        assert_eq!(mesh.face_count(), loaded.face_count());
        for (a, b) in mesh.vertices.iter().zip(loaded.vertices.iter()) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
            assert_relative_eq!(a.z, b.z, epsilon = 1e-6);
        }
        assert_eq!(mesh.faces, loaded.faces);
    }

    #[test]
    fn test_parse_counts_on_header_line() {
        let text = "OFF 3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";
        let mesh = parse_off(text).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_parse_with_comments_and_blank_lines() {
        let text = "# a comment\nOFF\n\n3 1 0\n0 0 0 # origin\n1 0 0\n0 1 0\n3 0 1 2\n";
        let mesh = parse_off(text).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_quad_faces_are_fan_triangulated() {
        let text = "OFF\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n";
        let mesh = parse_off(text).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.faces[0], [0, 1, 2]);
        assert_eq!(mesh.faces[1], [0, 2, 3]);
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(matches!(
            parse_off("3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_truncated_vertex_list_rejected() {
        assert!(matches!(
            parse_off("OFF\n3 1 0\n0 0 0\n1 0 0\n"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_out_of_range_face_index_rejected() {
        let text = "OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 7\n";
        assert!(matches!(parse_off(text), Err(Error::InvalidMesh(_))));
    }

    #[test]
    fn test_invalid_mesh_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.off");
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3f::new(0.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert!(OffWriter::write_mesh(&mesh, &path).is_err());
        assert!(!path.exists(), "failed write must leave nothing behind");
    }
}
