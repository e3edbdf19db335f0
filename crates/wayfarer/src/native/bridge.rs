//! Decoding of the parser's flattened multi-object buffers

use super::abi::RawModelData;
use crate::model::MeshRecord;
use glam::{vec2, vec3};
use log::*;
use std::slice;
use wayfarer_utils::round_places;

/// Vertex and UV components get rounded to this many decimal places to
/// normalize floating point noise between parser builds.
const GEOMETRY_DECIMALS: u32 = 4;

/// Safe view over one [`RawModelData`], with every buffer materialized as a
/// slice. Length arrays always have exactly one entry per sub-object.
pub(crate) struct RawBuffers<'a> {
    pub vertices: &'a [f32],
    pub vertex_lens: &'a [usize],
    pub uvs: &'a [f32],
    pub uv_lens: &'a [usize],
    pub faces: &'a [u64],
    pub face_lens: &'a [usize],
}

/// Builds the slice view of a parse result.
///
/// ## Safety
/// `data` must be a live, untouched parse result; all pointers must honor
/// the ABI ownership rules described in [`super::abi`].
pub(crate) unsafe fn view(data: &RawModelData) -> RawBuffers<'_> {
    let vertex_lens = lens(data.vertex_lens_ptr, data.object_count);
    let uv_lens = lens(data.uv_lens_ptr, data.object_count);
    let face_lens = lens(data.face_lens_ptr, data.object_count);

    RawBuffers {
        vertices: flat(data.vertices_ptr, vertex_lens),
        vertex_lens,
        uvs: flat(data.uvs_ptr, uv_lens),
        uv_lens,
        faces: flat(data.faces_ptr as *const u64, face_lens),
        face_lens,
    }
}

unsafe fn lens<'a>(ptr: *const usize, count: usize) -> &'a [usize] {
    if ptr.is_null() {
        &[]
    } else {
        slice::from_raw_parts(ptr, count)
    }
}

unsafe fn flat<'a, T>(ptr: *const T, lens: &[usize]) -> &'a [T] {
    let total = lens.iter().sum();
    if ptr.is_null() {
        &[]
    } else {
        slice::from_raw_parts(ptr, total)
    }
}

/// Splits the flat buffers into per-object [`MeshRecord`]s.
///
/// Offsets are prefix sums over the length arrays, so the sub-object slices
/// partition each buffer exactly. Sub-objects with no vertices or no faces
/// are reported and skipped.
pub(crate) fn decode_objects(raw: &RawBuffers, label: &str) -> Vec<MeshRecord> {
    let mut records = Vec::with_capacity(raw.vertex_lens.len());
    let mut vertex_offset = 0;
    let mut uv_offset = 0;
    let mut face_offset = 0;

    for i in 0..raw.vertex_lens.len() {
        let vertices = take(raw.vertices, &mut vertex_offset, raw.vertex_lens[i], label);
        let uvs = take(raw.uvs, &mut uv_offset, raw.uv_lens.get(i).copied().unwrap_or(0), label);
        let faces = take(raw.faces, &mut face_offset, raw.face_lens.get(i).copied().unwrap_or(0), label);

        let record = MeshRecord {
            vertices: vertices
                .chunks_exact(3)
                .map(|c| {
                    vec3(
                        round_places(c[0], GEOMETRY_DECIMALS),
                        round_places(c[1], GEOMETRY_DECIMALS),
                        round_places(c[2], GEOMETRY_DECIMALS),
                    )
                })
                .collect(),
            uvs: uvs
                .chunks_exact(2)
                .map(|c| {
                    vec2(
                        round_places(c[0], GEOMETRY_DECIMALS),
                        round_places(c[1], GEOMETRY_DECIMALS),
                    )
                })
                .collect(),
            faces: faces.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        };

        if record.is_empty() {
            warn!(
                "Skipping empty sub-object {i} of {label} (V:{} F:{})",
                record.vertices.len(),
                record.faces.len()
            );
            continue;
        }
        records.push(record);
    }
    records
}

fn take<'a, T>(buffer: &'a [T], offset: &mut usize, len: usize, label: &str) -> &'a [T] {
    let start = *offset;
    match start.checked_add(len).and_then(|end| buffer.get(start..end)) {
        Some(sliced) => {
            *offset = start + len;
            sliced
        }
        None => {
            warn!(
                "{label}: sub-object slice {start}..{start}+{len} runs past the buffer ({} elements)",
                buffer.len()
            );
            *offset = buffer.len();
            &[]
        }
    }
}

/// Runs its closure exactly once, on drop or unwind, whichever comes first.
/// Keeps the native free call paired with its parse call on every exit path.
pub(crate) struct ReleaseGuard<F: FnOnce()> {
    release: Option<F>,
}

impl<F: FnOnce()> ReleaseGuard<F> {
    pub fn new(release: F) -> Self {
        Self {
            release: Some(release),
        }
    }
}

impl<F: FnOnce()> Drop for ReleaseGuard<F> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buffers<'a>(
        vertices: &'a [f32],
        vertex_lens: &'a [usize],
        uvs: &'a [f32],
        uv_lens: &'a [usize],
        faces: &'a [u64],
        face_lens: &'a [usize],
    ) -> RawBuffers<'a> {
        RawBuffers {
            vertices,
            vertex_lens,
            uvs,
            uv_lens,
            faces,
            face_lens,
        }
    }

    #[test]
    fn sub_object_slices_partition_the_buffers() {
        // Two objects: 1 triangle then 2 triangles' worth of vertices.
        let vertices: Vec<f32> = (0..18).map(|i| i as f32).collect();
        let uvs: Vec<f32> = (0..12).map(|i| i as f32 / 2.0).collect();
        let faces: Vec<u64> = vec![0, 1, 2, 0, 1, 2, 0, 2, 1];

        let raw = buffers(&vertices, &[9, 9], &uvs, &[6, 6], &faces, &[3, 6]);
        let records = decode_objects(&raw, "test");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vertices.len(), 3);
        assert_eq!(records[1].vertices.len(), 3);
        assert_eq!(records[0].faces.len(), 1);
        assert_eq!(records[1].faces.len(), 2);

        // Second object starts where the first ended; no overlap, no gap.
        assert_eq!(records[0].vertices[0], vec3(0.0, 1.0, 2.0));
        assert_eq!(records[1].vertices[0], vec3(9.0, 10.0, 11.0));
        let total: usize = records.iter().map(|r| r.vertices.len() * 3).sum();
        assert_eq!(total, vertices.len());
    }

    #[test]
    fn components_are_rounded_to_four_places() {
        let vertices = [0.123456f32, 1.000049, -2.999951];
        let faces = [0u64, 0, 0];
        let raw = buffers(&vertices, &[3], &[], &[0], &faces, &[3]);

        let records = decode_objects(&raw, "test");
        assert_eq!(records[0].vertices[0], vec3(0.1235, 1.0, -3.0));
    }

    #[test]
    fn empty_sub_objects_are_skipped_not_fatal() {
        let vertices = [0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0];
        let faces = [0u64, 0, 0];
        // First object has vertices but no faces, second is complete.
        let raw = buffers(&vertices, &[3, 3], &[], &[0, 0], &faces, &[0, 3]);

        let records = decode_objects(&raw, "test");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].faces, vec![[0, 0, 0]]);
    }

    #[test]
    fn oversized_length_arrays_do_not_read_past_buffers() {
        let vertices = [0.0f32, 0.0, 0.0];
        let faces = [0u64, 0, 0];
        // Length array claims more data than the buffer holds.
        let raw = buffers(&vertices, &[3, 9], &[], &[0, 0], &faces, &[3, 3]);

        let records = decode_objects(&raw, "test");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn release_guard_fires_exactly_once() {
        let count = AtomicUsize::new(0);
        {
            let _guard = ReleaseGuard::new(|| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_guard_fires_on_unwind() {
        let count = AtomicUsize::new(0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = ReleaseGuard::new(|| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            panic!("mid-decode failure");
        }));
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
