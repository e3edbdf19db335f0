//! Reader for the game's scripted decoration scene
//!
//! Level decoration is described by a Lua script that assigns one global
//! table, [`SCENE_GLOBAL`], mapping opaque keys to placement entries. This
//! crate evaluates the script in an embedded Lua runtime and decodes every
//! entry into a typed record, keeping malformed entries around as tagged
//! errors so the importer can report and skip them individually.

use anyhow::{bail, Context};
use mlua::{Lua, Table, Value};
use std::fs;
use std::path::Path;
use wayfarer_utils::AnyResult;

#[doc(inline)]
pub use entry::*;
pub mod entry;
#[doc(inline)]
pub use transform::remap_basis;
pub mod transform;

/// Name of the global table the scene script assigns.
pub const SCENE_GLOBAL: &str = "DecorationMeshInstances";

/// Texture applied when an entry carries an empty `ShaderParams` table.
/// A naming convention of the asset pack, like the `P_` prefix.
pub const FALLBACK_TEXTURE: &str = "ClothAtlas";

/// A fully decoded scene document. Entry order follows script table order.
#[derive(Debug)]
pub struct SceneDoc {
    pub entries: Vec<SceneSlot>,
}

/// One slot of the scene table: its key (stringified for diagnostics) and
/// the decode outcome of its entry.
#[derive(Debug)]
pub struct SceneSlot {
    pub key: String,
    pub entry: Result<DecorationEntry, EntryError>,
}

impl SceneDoc {
    /// Runs the scene script at `path` and decodes the resulting global.
    pub fn evaluate(path: &Path) -> AnyResult<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("couldn't read scene script {}", path.display()))?;

        let lua = Lua::new();
        lua.load(&source)
            .set_name(path.to_string_lossy())
            .exec()
            .context("scene script failed to run")?;

        let root = lua.globals().get::<_, Value>(SCENE_GLOBAL)?;
        let Value::Table(root) = root else {
            bail!("scene script did not assign a `{SCENE_GLOBAL}` table");
        };

        Self::from_table(&root)
    }

    /// Decodes an already evaluated scene table.
    pub fn from_table(root: &Table) -> AnyResult<Self> {
        let mut entries = Vec::new();
        for pair in root.clone().pairs::<Value, Value>() {
            let (key, value) = pair?;

            // Only nested tables are placements; scalar slots are ignored.
            let Value::Table(table) = value else {
                continue;
            };

            entries.push(SceneSlot {
                key: key_string(&key),
                entry: decode_entry(&table),
            });
        }
        Ok(Self { entries })
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.to_string_lossy().into_owned(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}
