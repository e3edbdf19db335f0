//! Strict schema decoding of decoration placement entries
//!
//! Scene scripts are externally authored and inconsistently shaped, so each
//! entry is validated up front and decodes into either a [`DecorationEntry`]
//! or a tagged [`EntryError`] naming what was wrong with it. The importer
//! drops malformed entries one by one instead of aborting the whole run.

use crate::transform::remap_basis;
use ahash::AHashMap;
use glam::Mat4;
use mlua::{Table, Value};

/// Shader parameter names that can carry a texture reference, highest
/// priority first. Priority wins over table order.
pub const TEXTURE_PARAM_PRIORITY: [&str; 3] = ["texColor", "texCham", "tex"];

/// One well-formed decoration placement.
#[derive(Debug, Clone)]
pub struct DecorationEntry {
    /// Logical mesh name, as written in the script (`P_` prefix included).
    pub mesh: String,
    /// World transform, already permuted into the importer's basis.
    pub transform: Mat4,
    pub texture: TextureChoice,
}

/// Outcome of scanning an entry's `ShaderParams` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureChoice {
    /// `ShaderParams` was present but empty; the asset pack's fallback
    /// texture applies.
    Fallback,
    /// A prioritized parameter carried this raw texture name.
    Named(String),
    /// No texture reference; the mesh is still placed, untextured.
    Missing,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EntryError {
    #[error("entry has no usable Mesh name")]
    MissingMesh,
    #[error("Transformation is not a nested table")]
    TransformNotTable,
    #[error("Transformation flattens to {0} numbers, expected 16")]
    TransformShape(usize),
    #[error("scene table access failed: {0}")]
    Script(String),
}

impl From<mlua::Error> for EntryError {
    fn from(e: mlua::Error) -> Self {
        EntryError::Script(e.to_string())
    }
}

/// Decodes one nested entry table into a [`DecorationEntry`].
pub fn decode_entry(entry: &Table) -> Result<DecorationEntry, EntryError> {
    let mesh = match entry.get::<_, Value>("Mesh")? {
        Value::String(s) => s.to_str()?.to_owned(),
        _ => return Err(EntryError::MissingMesh),
    };

    let transform = decode_transform(entry)?;

    let texture = match entry.get::<_, Value>("ShaderParams")? {
        Value::Table(params) => select_texture(params)?,
        _ => TextureChoice::Missing,
    };

    Ok(DecorationEntry {
        mesh,
        transform,
        texture,
    })
}

fn decode_transform(entry: &Table) -> Result<Mat4, EntryError> {
    let Value::Table(rows) = entry.get::<_, Value>("Transformation")? else {
        return Err(EntryError::TransformNotTable);
    };

    // Flatten rows-of-columns in table traversal order.
    let mut numbers = Vec::with_capacity(16);
    for row in rows.pairs::<Value, Value>() {
        let (_, row) = row?;
        let Value::Table(columns) = row else {
            return Err(EntryError::TransformNotTable);
        };
        for column in columns.pairs::<Value, Value>() {
            match column?.1 {
                Value::Number(n) => numbers.push(n as f32),
                Value::Integer(i) => numbers.push(i as f32),
                _ => return Err(EntryError::TransformNotTable),
            }
        }
    }

    match <[f32; 16]>::try_from(numbers.as_slice()) {
        Ok(flat) => Ok(remap_basis(&flat)),
        Err(_) => Err(EntryError::TransformShape(numbers.len())),
    }
}

fn select_texture(params: Table) -> Result<TextureChoice, EntryError> {
    let mut total = 0usize;
    let mut named = AHashMap::new();
    for pair in params.pairs::<Value, Value>() {
        let (key, value) = pair?;
        total += 1;
        if let (Value::String(key), Value::String(value)) = (key, value) {
            named.insert(key.to_str()?.to_owned(), value.to_str()?.to_owned());
        }
    }

    if total == 0 {
        return Ok(TextureChoice::Fallback);
    }

    Ok(TEXTURE_PARAM_PRIORITY
        .iter()
        .find_map(|name| named.get(*name))
        .map(|raw| TextureChoice::Named(raw.clone()))
        .unwrap_or(TextureChoice::Missing))
}
