//! I/O operations for meshes
//!
//! Readers and writers for the OFF and STL formats behind common traits,
//! with extension-based dispatch. Writers stage output in a temporary file
//! and persist it atomically, so a failed call never leaves a partial mesh
//! behind.

pub mod off;
pub mod stl;

pub use off::{OffReader, OffWriter};
pub use stl::{StlReader, StlWriter};

use meshops_core::{Result, TriangleMesh};
use std::io::Write;
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Auto-detect format from the extension and read a mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match extension_of(path).as_deref() {
        Some("off") => off::OffReader::read_mesh(path),
        Some("stl") => stl::StlReader::read_mesh(path),
        _ => Err(meshops_core::Error::UnsupportedFormat(format!(
            "unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format from the extension and write a mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension_of(path).as_deref() {
        Some("off") => off::OffWriter::write_mesh(mesh, path),
        Some("stl") => stl::StlWriter::write_mesh(mesh, path),
        _ => Err(meshops_core::Error::UnsupportedFormat(format!(
            "unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Stage `contents` next to `path` and rename into place only on success.
pub(crate) fn persist_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
