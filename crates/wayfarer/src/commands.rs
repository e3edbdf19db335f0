//! CLI command implementations

use crate::assets::AssetIndex;
use crate::config::ImportProfile;
use crate::model::ObjDirectory;
use crate::native::{NativeParser, TrustPolicy};
use crate::pipeline::{import_scene, ImportContext};
use crate::trust::HttpKeyVerifier;
use clap::Args;
use log::*;
use std::path::PathBuf;
use wayfarer_dmi::SceneDoc;
use wayfarer_utils::{ok, AnyResult};

/// Imports one decoration scene into a directory of OBJ files.
#[derive(Args)]
pub struct ImportCommand {
    /// Path to the import profile (TOML).
    pub profile: PathBuf,

    /// Directory that receives the generated OBJ files.
    #[arg(long, short = 'o', default_value = "wayfarer-out")]
    pub out_dir: PathBuf,

    /// Skip signature verification of the parser library. Refused unless
    /// WAYFARER_ALLOW_UNVERIFIED=1 is also set in the environment.
    #[arg(long)]
    pub unverified_library: bool,
}

impl crate::Command for ImportCommand {
    fn run(self) -> AnyResult {
        let profile = ImportProfile::load(&self.profile)?;

        let meshes = AssetIndex::build(&profile.mesh_dir, &profile.mesh_extension)?;
        let textures = AssetIndex::build(&profile.texture_dir, &profile.texture_extension)?;

        let verifier = HttpKeyVerifier::default();
        let policy = if self.unverified_library || !profile.verify_signature {
            TrustPolicy::DangerouslyUnverified
        } else {
            TrustPolicy::Verify(&verifier)
        };
        let parser = NativeParser::load(&profile.library_dir, &profile.library_version, policy)?;

        let doc = SceneDoc::evaluate(&profile.scene_script)?;
        info!("Scene script holds {} entries", doc.entries.len());

        let mut host = ObjDirectory::new(&self.out_dir)?;
        let excluded = profile.excluded_set();
        let ctx = ImportContext {
            meshes: &meshes,
            textures: &textures,
            source: &parser,
            excluded: &excluded,
            fallback_texture: &profile.fallback_texture,
        };
        import_scene(&doc, &ctx, &mut host)?;
        ok()
    }
}
