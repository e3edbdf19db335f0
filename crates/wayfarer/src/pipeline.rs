//! The import pipeline: resolve names, parse geometry, dispatch placements
//!
//! Setup failures (bad caches, untrusted library) abort before anything is
//! dispatched. Once traversal starts, every failure is contained at the
//! entry boundary: the entry is logged and skipped, the run continues.

use crate::assets::{texture_key, AssetIndex};
use crate::model::{HostScene, ModelSource};
use ahash::AHashSet;
use log::*;
use std::path::PathBuf;
use wayfarer_dmi::{DecorationEntry, SceneDoc, TextureChoice};
use wayfarer_utils::{strip_placement_prefix, AnyResult};

/// Everything one import run reads. Built by the caller, immutable during
/// traversal; no ambient state.
pub struct ImportContext<'a> {
    pub meshes: &'a AssetIndex,
    pub textures: &'a AssetIndex,
    pub source: &'a dyn ModelSource,
    /// `P_`-stripped mesh names to skip without any resolution attempt.
    pub excluded: &'a AHashSet<String>,
    /// Raw texture name applied when an entry has empty `ShaderParams`.
    pub fallback_texture: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub placed: usize,
    pub excluded: usize,
    pub dropped: usize,
    pub parse_failures: usize,
}

/// Walks the decoded scene and dispatches every resolvable placement.
pub fn import_scene(
    doc: &SceneDoc,
    ctx: &ImportContext,
    host: &mut dyn HostScene,
) -> AnyResult<ImportStats> {
    let mut stats = ImportStats::default();

    for slot in &doc.entries {
        let entry = match &slot.entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping entry `{}`: {e}", slot.key);
                stats.dropped += 1;
                continue;
            }
        };

        if ctx.excluded.contains(strip_placement_prefix(&entry.mesh)) {
            debug!("Excluded {}", entry.mesh);
            stats.excluded += 1;
            continue;
        }

        let Some(mesh_path) = ctx.meshes.lookup(&entry.mesh) else {
            warn!("No mesh description for `{}`", entry.mesh);
            stats.dropped += 1;
            continue;
        };

        let texture = resolve_texture(ctx, entry);

        let records = match ctx.source.parse_models(mesh_path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Parse failed for {}: {e:#}", mesh_path.display());
                stats.parse_failures += 1;
                continue;
            }
        };
        if records.is_empty() {
            warn!("No geometry for `{}` ({})", entry.mesh, mesh_path.display());
            stats.parse_failures += 1;
            continue;
        }

        info!("Spawning {} for {}", mesh_path.display(), entry.mesh);
        host.place_model(&entry.mesh, &records, entry.transform, texture.as_deref())?;
        stats.placed += 1;
    }

    info!(
        "Import finished: {} placed, {} excluded, {} dropped, {} parse failures",
        stats.placed, stats.excluded, stats.dropped, stats.parse_failures
    );
    Ok(stats)
}

fn resolve_texture(ctx: &ImportContext, entry: &DecorationEntry) -> Option<PathBuf> {
    let raw = match &entry.texture {
        TextureChoice::Named(raw) => raw.as_str(),
        TextureChoice::Fallback => ctx.fallback_texture,
        TextureChoice::Missing => {
            debug!("{}: no texture parameter", entry.mesh);
            return None;
        }
    };

    let key = texture_key(raw);
    match ctx.textures.lookup(&key) {
        Some(path) => Some(path.to_owned()),
        None => {
            // Not fatal; the mesh is placed untextured.
            warn!("No texture `{key}` (from `{raw}`) for {}", entry.mesh);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HostScene, MeshRecord, ModelSource};
    use anyhow::bail;
    use glam::{vec3, Mat4};
    use std::fs::File;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use wayfarer_dmi::{EntryError, SceneSlot};

    struct FnSource<F: Fn(&Path) -> AnyResult<Vec<MeshRecord>>>(F);

    impl<F: Fn(&Path) -> AnyResult<Vec<MeshRecord>>> ModelSource for FnSource<F> {
        fn parse_models(&self, path: &Path) -> AnyResult<Vec<MeshRecord>> {
            (self.0)(path)
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        placements: Vec<(String, usize, Option<PathBuf>)>,
    }

    impl HostScene for RecordingHost {
        fn place_model(
            &mut self,
            name: &str,
            records: &[MeshRecord],
            _transform: Mat4,
            texture: Option<&Path>,
        ) -> AnyResult {
            self.placements
                .push((name.to_owned(), records.len(), texture.map(Path::to_owned)));
            wayfarer_utils::ok()
        }
    }

    fn triangle() -> MeshRecord {
        MeshRecord {
            vertices: vec![vec3(0.0, 0.0, 0.0); 3],
            uvs: vec![],
            faces: vec![[0, 1, 2]],
        }
    }

    fn entry(mesh: &str, texture: TextureChoice) -> SceneSlot {
        SceneSlot {
            key: mesh.to_owned(),
            entry: Ok(DecorationEntry {
                mesh: mesh.to_owned(),
                transform: Mat4::IDENTITY,
                texture,
            }),
        }
    }

    fn index_of(names: &[&str], extension: &str) -> (TempDir, AssetIndex) {
        let dir = tempdir().unwrap();
        for name in names {
            File::create(dir.path().join(format!("{name}.{extension}"))).unwrap();
        }
        let index = AssetIndex::build(dir.path(), extension).unwrap();
        (dir, index)
    }

    #[test]
    fn empty_shader_params_resolve_the_fallback_texture() {
        let (_m, meshes) = index_of(&["Crate01"], "xml");
        let (_t, textures) = index_of(&["ClothAtlasClothAtlas"], "dds");
        let source = FnSource(|_| Ok(vec![triangle()]));
        let mut host = RecordingHost::default();

        let doc = SceneDoc {
            entries: vec![entry("Crate01", TextureChoice::Fallback)],
        };
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &source,
            excluded: &AHashSet::new(),
            fallback_texture: "ClothAtlas",
        };

        let stats = import_scene(&doc, &ctx, &mut host).unwrap();
        assert_eq!(stats.placed, 1);

        let (name, records, texture) = &host.placements[0];
        assert_eq!(name, "Crate01");
        assert_eq!(*records, 1);
        let texture = texture.as_ref().unwrap();
        assert!(texture.ends_with("ClothAtlasClothAtlas.dds"));
    }

    #[test]
    fn excluded_entries_skip_before_any_lookup() {
        // The mesh *is* in the cache; exclusion must win without touching it.
        let (_m, meshes) = index_of(&["P_Crate01"], "xml");
        let (_t, textures) = index_of(&[], "dds");
        let source = FnSource(|_| panic!("excluded entries must not be parsed"));
        let mut host = RecordingHost::default();

        let doc = SceneDoc {
            entries: vec![entry("P_Crate01", TextureChoice::Missing)],
        };
        let excluded = ["Crate01".to_owned()].into_iter().collect();
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &source,
            excluded: &excluded,
            fallback_texture: "ClothAtlas",
        };

        let stats = import_scene(&doc, &ctx, &mut host).unwrap();
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.dropped, 0);
        assert!(host.placements.is_empty());
    }

    #[test]
    fn parse_failures_skip_the_entry_and_continue() {
        let (_m, meshes) = index_of(&["Broken", "Fine"], "xml");
        let (_t, textures) = index_of(&[], "dds");
        let source = FnSource(|path: &Path| {
            if path.to_string_lossy().contains("Broken") {
                bail!("native parser returned null");
            }
            Ok(vec![triangle()])
        });
        let mut host = RecordingHost::default();

        let doc = SceneDoc {
            entries: vec![
                entry("Broken", TextureChoice::Missing),
                entry("Fine", TextureChoice::Missing),
            ],
        };
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &source,
            excluded: &AHashSet::new(),
            fallback_texture: "ClothAtlas",
        };

        let stats = import_scene(&doc, &ctx, &mut host).unwrap();
        assert_eq!(stats.parse_failures, 1);
        assert_eq!(stats.placed, 1);
        assert_eq!(host.placements[0].0, "Fine");
    }

    #[test]
    fn unresolved_meshes_drop_unresolved_textures_do_not() {
        let (_m, meshes) = index_of(&["Known"], "xml");
        let (_t, textures) = index_of(&[], "dds");
        let source = FnSource(|_| Ok(vec![triangle()]));
        let mut host = RecordingHost::default();

        let doc = SceneDoc {
            entries: vec![
                entry("Unknown", TextureChoice::Missing),
                entry("Known", TextureChoice::Named("P_Nowhere".to_owned())),
            ],
        };
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &source,
            excluded: &AHashSet::new(),
            fallback_texture: "ClothAtlas",
        };

        let stats = import_scene(&doc, &ctx, &mut host).unwrap();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.placed, 1);
        // Placed untextured.
        assert_eq!(host.placements[0].2, None);
    }

    #[test]
    fn malformed_entries_are_dropped_with_stats() {
        let (_m, meshes) = index_of(&[], "xml");
        let (_t, textures) = index_of(&[], "dds");
        let source = FnSource(|_| Ok(vec![triangle()]));
        let mut host = RecordingHost::default();

        let doc = SceneDoc {
            entries: vec![SceneSlot {
                key: "17".to_owned(),
                entry: Err(EntryError::TransformNotTable),
            }],
        };
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &source,
            excluded: &AHashSet::new(),
            fallback_texture: "ClothAtlas",
        };

        let stats = import_scene(&doc, &ctx, &mut host).unwrap();
        assert_eq!(stats.dropped, 1);
        assert!(host.placements.is_empty());
    }
}
