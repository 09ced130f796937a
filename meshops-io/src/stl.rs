//! STL format support
//!
//! Reads both binary and ASCII STL (auto-detected) and writes binary STL.
//! STL stores bare triangle soup, so identical corner positions are merged
//! on read to rebuild shared connectivity.

use crate::{persist_atomically, MeshReader, MeshWriter};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use meshops_core::{Error, Point3f, Result, TriangleMesh};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

pub struct StlReader;
pub struct StlWriter;

const BINARY_HEADER_LEN: usize = 80;
const BINARY_TRIANGLE_LEN: usize = 50;

impl MeshReader for StlReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let bytes = fs::read(path)?;
        let triangles = if looks_binary(&bytes) {
            parse_binary(&bytes)?
        } else {
            parse_ascii(&bytes)?
        };
        soup_to_mesh(&triangles)
    }
}

impl MeshWriter for StlWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        mesh.validate()?;

        let mut out: Vec<u8> = Vec::with_capacity(
            BINARY_HEADER_LEN + 4 + mesh.face_count() * BINARY_TRIANGLE_LEN,
        );
        let mut header = [0u8; BINARY_HEADER_LEN];
        let tag = b"meshops binary STL";
        header[..tag.len()].copy_from_slice(tag);
        out.extend_from_slice(&header);
        out.write_u32::<LittleEndian>(mesh.face_count() as u32)?;

        for fi in 0..mesh.face_count() {
            let n = mesh.face_normal(fi);
            for c in [n.x, n.y, n.z] {
                out.write_f32::<LittleEndian>(c)?;
            }
            for p in mesh.face_points(fi) {
                for c in [p.x, p.y, p.z] {
                    out.write_f32::<LittleEndian>(c)?;
                }
            }
            out.write_u16::<LittleEndian>(0)?;
        }

        persist_atomically(path.as_ref(), &out)
    }
}

/// Binary STL is unambiguous about its own length; use that before
/// trusting a leading "solid" keyword.
fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.len() < BINARY_HEADER_LEN + 4 {
        return false;
    }
    let mut cursor = Cursor::new(&bytes[BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4]);
    let count = cursor.read_u32::<LittleEndian>().unwrap_or(0) as usize;
    bytes.len() == BINARY_HEADER_LEN + 4 + count * BINARY_TRIANGLE_LEN
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[Point3f; 3]>> {
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(BINARY_HEADER_LEN as u64);
    let count = cursor.read_u32::<LittleEndian>()? as usize;

    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        // Stored normal is ignored; winding order defines orientation
        for _ in 0..3 {
            cursor.read_f32::<LittleEndian>()?;
        }
        let mut corners = [Point3f::origin(); 3];
        for corner in &mut corners {
            let x = cursor.read_f32::<LittleEndian>()?;
            let y = cursor.read_f32::<LittleEndian>()?;
            let z = cursor.read_f32::<LittleEndian>()?;
            *corner = Point3f::new(x, y, z);
        }
        cursor.read_u16::<LittleEndian>()?;
        triangles.push(corners);
    }
    Ok(triangles)
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<[Point3f; 3]>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::Parse("STL file is neither valid binary nor ASCII".to_string()))?;
    if !text.trim_start().starts_with("solid") {
        return Err(Error::Parse("missing 'solid' keyword".to_string()));
    }

    let mut corners: Vec<Point3f> = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "vertex" {
            continue;
        }
        let mut coords = [0.0f32; 3];
        for c in &mut coords {
            let t = tokens
                .next()
                .ok_or_else(|| Error::Parse("truncated vertex".to_string()))?;
            *c = t
                .parse()
                .map_err(|_| Error::Parse(format!("bad vertex coordinate: {}", t)))?;
        }
        corners.push(Point3f::new(coords[0], coords[1], coords[2]));
    }

    if corners.is_empty() || corners.len() % 3 != 0 {
        return Err(Error::Parse(format!(
            "ASCII STL has {} vertices, expected a multiple of three",
            corners.len()
        )));
    }

    Ok(corners
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Merge exactly-equal corner positions back into shared vertices.
fn soup_to_mesh(triangles: &[[Point3f; 3]]) -> Result<TriangleMesh> {
    let mut index_of: HashMap<[u32; 3], usize> = HashMap::new();
    let mut vertices: Vec<Point3f> = Vec::new();
    let mut faces = Vec::with_capacity(triangles.len());

    for tri in triangles {
        let mut face = [0usize; 3];
        for (slot, p) in face.iter_mut().zip(tri.iter()) {
            let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
            let next = vertices.len();
            let idx = *index_of.entry(key).or_insert(next);
            if idx == vertices.len() {
                vertices.push(*p);
            }
            *slot = idx;
        }
        faces.push(face);
    }

    TriangleMesh::validated(vertices, faces)
}
