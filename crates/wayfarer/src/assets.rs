//! Name-indexed asset caches
//!
//! The game ships mesh descriptions and textures as loose directory trees.
//! Scene scripts refer to them by logical name, so the importer scans each
//! tree once up front and resolves names through the resulting index.

use ahash::AHashMap;
use anyhow::Context;
use log::*;
use std::fs;
use std::path::{Path, PathBuf};
use wayfarer_utils::{strip_placement_prefix, AnyResult};

/// Immutable name → path cache for one asset kind.
///
/// Keys are filename stems. Lookups are exact; a mesh named `Foo` does not
/// resolve to a file named `FooBar`. (Substring matching used to cross-match
/// similarly named assets and is intentionally gone.)
pub struct AssetIndex {
    extension: String,
    entries: AHashMap<String, PathBuf>,
}

impl AssetIndex {
    /// Recursively scans `dir` for `*.extension` files. On stem collisions
    /// the last file seen wins.
    pub fn build(dir: &Path, extension: &str) -> AnyResult<Self> {
        let mut entries = AHashMap::new();
        scan(dir, extension, &mut entries)
            .with_context(|| format!("couldn't scan asset directory {}", dir.display()))?;

        info!("Cached {} .{extension} files from {}", entries.len(), dir.display());
        Ok(Self {
            extension: extension.to_owned(),
            entries,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

fn scan(dir: &Path, extension: &str, entries: &mut AHashMap<String, PathBuf>) -> AnyResult {
    for item in fs::read_dir(dir)? {
        let path = item?.path();
        if path.is_dir() {
            scan(&path, extension, entries)?;
        } else if path.extension().is_some_and(|e| e == extension) {
            if let Some(stem) = path.file_stem() {
                entries.insert(stem.to_string_lossy().into_owned(), path);
            }
        }
    }
    wayfarer_utils::ok()
}

/// Derives the texture cache key for a raw shader parameter value.
///
/// The asset pack names texture files by doubling the `P_`-stripped
/// parameter name. This is a quirk of the pack's export tooling, not a
/// general rule.
///
/// ## Example
/// ```
/// use wayfarer::assets::texture_key;
/// assert_eq!(texture_key("P_Wood"), "WoodWood");
/// assert_eq!(texture_key("Cloth"), "ClothCloth");
/// ```
pub fn texture_key(raw: &str) -> String {
    let stripped = strip_placement_prefix(raw);
    format!("{stripped}{stripped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};
    use tempfile::tempdir;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn build_scans_recursively_and_strips_extensions() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("props/wood");
        create_dir_all(&nested).unwrap();
        touch(&dir.path().join("Crate01.xml"));
        touch(&nested.join("Plank.xml"));
        touch(&nested.join("Plank.txt"));

        let index = AssetIndex::build(dir.path(), "xml").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("Plank").unwrap(), nested.join("Plank.xml"));
    }

    #[test]
    fn lookup_is_exact_not_substring() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("FooBar.xml"));

        let index = AssetIndex::build(dir.path(), "xml").unwrap();
        assert!(index.lookup("Foo").is_none());
        assert!(index.lookup("FooBar").is_some());
    }

    #[test]
    fn duplicate_stems_keep_the_last_scanned_path() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        create_dir_all(&a).unwrap();
        create_dir_all(&b).unwrap();
        touch(&a.join("Crate01.xml"));
        touch(&b.join("Crate01.xml"));

        let index = AssetIndex::build(dir.path(), "xml").unwrap();
        assert_eq!(index.len(), 1);
        // Which one survives depends on scan order, but exactly one does.
        assert!(index.lookup("Crate01").is_some());
    }

    #[test]
    fn texture_key_doubles_the_stripped_name() {
        assert_eq!(texture_key("P_Wood"), "WoodWood");
        assert_eq!(texture_key("P_"), "");
    }
}
