//! Transform reconstruction from flattened scene script tables

use glam::Mat4;

/// Rebuilds a world transform from the 16 numbers of a flattened
/// `Transformation` table.
///
/// Scene scripts store transforms in the game engine's coordinate basis. The
/// index shuffle below is the fixed permutation into the importer's basis and
/// must be kept exactly as-is; it is part of the scene format, not a choice.
pub fn remap_basis(n: &[f32; 16]) -> Mat4 {
    let rows = [
        [n[2], n[6], n[10], n[14]],
        [n[0], n[4], n[8], n[12]],
        [n[1], n[5], n[9], n[13]],
        [n[3], n[7], n[11], n[15]],
    ];

    // glam matrices are column-major, the rows above are rows.
    Mat4::from_cols_array_2d(&rows).transpose()
}
