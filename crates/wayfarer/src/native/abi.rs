//! Call contract of the native parser library
//!
//! The layout below is fixed by the parser's release line and gated by its
//! version string; see [`crate::native::NativeParser::load`]. All pointers in
//! [`RawModelData`] are owned by the library and stay valid until the
//! structure is passed back through [`FREE_SYMBOL`].

use std::os::raw::{c_char, c_float, c_ulonglong};

/// Parse result for one mesh description file.
///
/// Geometry for all sub-objects is concatenated into three flat buffers;
/// the `*_lens_ptr` arrays hold `object_count` per-object element counts, so
/// sub-object boundaries fall out of prefix sums over them.
#[repr(C)]
pub struct RawModelData {
    pub object_count: usize,
    /// 3 floats per vertex.
    pub vertices_ptr: *const c_float,
    pub vertex_lens_ptr: *const usize,
    /// 2 floats per vertex.
    pub uvs_ptr: *const c_float,
    pub uv_lens_ptr: *const usize,
    /// 3 indices per triangle.
    pub faces_ptr: *const c_ulonglong,
    pub face_lens_ptr: *const usize,
}

/// Takes a NUL-terminated UTF-8 path; returns null on failure.
pub type ParseFn = unsafe extern "C" fn(*const c_char) -> *mut RawModelData;

/// Releases a [`RawModelData`] and every buffer it owns. Must be called
/// exactly once per successful parse.
pub type FreeFn = unsafe extern "C" fn(*mut RawModelData);

/// Returns the library's semantic version as a static NUL-terminated string.
pub type VersionFn = unsafe extern "C" fn() -> *const c_char;

pub const PARSE_SYMBOL: &[u8] = b"ffi_parse\0";
pub const FREE_SYMBOL: &[u8] = b"ffi_free\0";
pub const VERSION_SYMBOL: &[u8] = b"ffi_version\0";
