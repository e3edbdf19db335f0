//! Assembled model data and the host handoff boundary
//!
//! The importer itself builds no scene objects. It hands [`MeshRecord`]s to
//! whatever [`HostScene`] it was given; [`ObjDirectory`] is the built-in
//! collaborator that writes Wavefront OBJ files, one per placement.

use glam::{Mat4, Vec2, Vec3};
use log::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use wayfarer_utils::AnyResult;

/// One sub-object's reconstructed geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRecord {
    pub vertices: Vec<Vec3>,
    /// UV pairs, indexed by *vertex* index. The game's meshes keep UVs
    /// vertex-unique, so no per-face-corner storage exists anywhere in the
    /// pipeline. Meshes that would need duplicate UVs at a shared vertex
    /// come out wrong, and that is the compatible behavior.
    pub uvs: Vec<Vec2>,
    pub faces: Vec<[u64; 3]>,
}

impl MeshRecord {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }
}

/// Source of parsed geometry, keyed by mesh description file path.
///
/// Implemented by the native parser; tests substitute their own.
pub trait ModelSource {
    fn parse_models(&self, path: &Path) -> AnyResult<Vec<MeshRecord>>;
}

/// The external collaborator that places assembled models into a scene.
pub trait HostScene {
    /// Places one resolved decoration. `records` is never empty and contains
    /// no empty sub-objects; `texture` is the resolved image file, if any.
    fn place_model(
        &mut self,
        name: &str,
        records: &[MeshRecord],
        transform: Mat4,
        texture: Option<&Path>,
    ) -> AnyResult;
}

/// [`HostScene`] that writes each placement as Wavefront OBJ files in one
/// output directory, world transform baked into the vertices.
pub struct ObjDirectory {
    root: PathBuf,
}

impl ObjDirectory {
    pub fn new(root: impl Into<PathBuf>) -> AnyResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl HostScene for ObjDirectory {
    fn place_model(
        &mut self,
        name: &str,
        records: &[MeshRecord],
        transform: Mat4,
        texture: Option<&Path>,
    ) -> AnyResult {
        if let Some(texture) = texture {
            debug!("{name}: texture {}", texture.display());
        }

        for (i, record) in records.iter().enumerate() {
            let file_name = if records.len() == 1 {
                format!("{name}.obj")
            } else {
                format!("{name}-{}.obj", i + 1)
            };

            let path = self.root.join(file_name);
            fs::write(&path, record_to_obj(record, transform))?;
            trace!("Wrote {}", path.display());
        }
        wayfarer_utils::ok()
    }
}

fn record_to_obj(record: &MeshRecord, transform: Mat4) -> String {
    let mut obj = String::new();
    let _ = writeln!(obj, "# Vertices: {}", record.vertices.len());
    for vertex in &record.vertices {
        let v = transform.transform_point3(*vertex);
        let _ = writeln!(obj, "v {} {} {}", v.x, v.y, v.z);
    }

    let _ = writeln!(obj, "\n# UVs: {}", record.uvs.len());
    for uv in &record.uvs {
        let _ = writeln!(obj, "vt {} {}", uv.x, uv.y);
    }

    let _ = writeln!(obj, "\n# Faces: {}", record.faces.len());
    for face in &record.faces {
        if record.uvs.is_empty() {
            let _ = writeln!(obj, "f {} {} {}", face[0] + 1, face[1] + 1, face[2] + 1);
        } else {
            // UV index equals vertex index, per the layout contract above.
            let _ = writeln!(
                obj,
                "f {0}/{0} {1}/{1} {2}/{2}",
                face[0] + 1,
                face[1] + 1,
                face[2] + 1
            );
        }
    }
    obj
}
