//! Import profile configuration
//!
//! One TOML file describes everything a run needs: where the game data
//! lives, which parser version to insist on, and what to skip. Profiles are
//! per-level, so paths are kept absolute by convention.

use ahash::AHashSet;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use wayfarer_utils::{strip_placement_prefix, AnyResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ImportProfile {
    /// The decoration scene script to import.
    pub scene_script: PathBuf,

    /// Directory holding the parser binary and its detached signature.
    pub library_dir: PathBuf,
    /// Exact version string the parser must report.
    pub library_version: String,

    pub mesh_dir: PathBuf,
    #[serde(default = "default_mesh_extension")]
    pub mesh_extension: String,

    pub texture_dir: PathBuf,
    #[serde(default = "default_texture_extension")]
    pub texture_extension: String,

    /// Mesh names to skip, compared `P_`-stripped.
    #[serde(default)]
    pub excluded_meshes: Vec<String>,

    /// Raw texture name for entries with empty `ShaderParams`.
    #[serde(default = "default_fallback_texture")]
    pub fallback_texture: String,

    /// Turning this off alone does nothing; see
    /// [`crate::native::UNVERIFIED_ENV`].
    #[serde(default = "default_verify_signature")]
    pub verify_signature: bool,
}

fn default_mesh_extension() -> String {
    "xml".to_owned()
}

fn default_texture_extension() -> String {
    "dds".to_owned()
}

fn default_fallback_texture() -> String {
    wayfarer_dmi::FALLBACK_TEXTURE.to_owned()
}

fn default_verify_signature() -> bool {
    true
}

impl ImportProfile {
    pub fn load(path: &Path) -> AnyResult<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("couldn't read import profile {}", path.display()))?;
        toml::from_str(&text).context("invalid import profile")
    }

    /// Exclusion set with the `P_` prefix normalized away, so profiles may
    /// list names in either spelling.
    pub fn excluded_set(&self) -> AHashSet<String> {
        self.excluded_meshes
            .iter()
            .map(|name| strip_placement_prefix(name).to_owned())
            .collect()
    }
}
