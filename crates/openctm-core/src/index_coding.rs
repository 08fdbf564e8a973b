//! Triangle index preparation shared by MG1 and MG2.
//!
//! Triangles are rotated so that their smallest index comes first, sorted,
//! and then delta coded against the previous triangle. All arithmetic wraps
//! on 32 bits, so `restore_indices(make_index_deltas(t)) == t` for any input.

use crate::status::{CtmError, CtmResult, Status};
use crate::vertex_coding::SortVertex;

pub type Triangle = [u32; 3];

/// Maps triangle indices into the sorted vertex order.
pub fn reindex_triangles(indices: &[Triangle], sorted: &[SortVertex]) -> CtmResult<Vec<Triangle>> {
    let mut lut = vec![u32::MAX; sorted.len()];
    for (new_index, sv) in sorted.iter().enumerate() {
        lut[sv.original_index as usize] = new_index as u32;
    }

    indices
        .iter()
        .map(|tri| {
            let mut out = [0u32; 3];
            for (slot, &old) in out.iter_mut().zip(tri) {
                *slot = lut.get(old as usize).copied().filter(|&i| i != u32::MAX).ok_or_else(|| {
                    CtmError::InvalidMesh(format!("triangle index {} is out of range", old))
                })?;
            }
            Ok(out)
        })
        .collect()
}

/// Rotates each triangle so its smallest index comes first (winding is kept),
/// then sorts triangles by first and second index.
pub fn rearrange_triangles(indices: &mut [Triangle]) {
    for tri in indices.iter_mut() {
        if tri[1] < tri[0] && tri[1] < tri[2] {
            tri.rotate_left(1);
        } else if tri[2] < tri[0] && tri[2] < tri[1] {
            tri.rotate_right(1);
        }
    }
    indices.sort_by(|a, b| a[0].cmp(&b[0]).then(a[1].cmp(&b[1])));
}

/// Delta codes sorted triangles in place. Runs back to front so every
/// triangle is coded against the still unmodified previous triangle.
pub fn make_index_deltas(indices: &mut [Triangle]) {
    for i in (0..indices.len()).rev() {
        let prev = if i >= 1 { Some(indices[i - 1]) } else { None };
        let tri = &mut indices[i];

        match prev {
            Some(p) if p[0] == tri[0] => tri[1] = tri[1].wrapping_sub(p[1]),
            _ => tri[1] = tri[1].wrapping_sub(tri[0]),
        }
        tri[2] = tri[2].wrapping_sub(tri[0]);
        if let Some(p) = prev {
            tri[0] = tri[0].wrapping_sub(p[0]);
        }
    }
}

/// Inverse of [`make_index_deltas`].
pub fn restore_indices(indices: &mut [Triangle]) {
    for i in 0..indices.len() {
        let prev = if i >= 1 { Some(indices[i - 1]) } else { None };
        let tri = &mut indices[i];

        if let Some(p) = prev {
            tri[0] = tri[0].wrapping_add(p[0]);
        }
        tri[2] = tri[2].wrapping_add(tri[0]);
        match prev {
            Some(p) if p[0] == tri[0] => tri[1] = tri[1].wrapping_add(p[1]),
            _ => tri[1] = tri[1].wrapping_add(tri[0]),
        }
    }
}

/// Rejects decoded triangles that reference a vertex outside `0..vertex_count`.
pub fn check_indices(indices: &[Triangle], vertex_count: usize) -> Status {
    match indices.iter().flatten().find(|&&i| i as usize >= vertex_count) {
        Some(i) => Err(CtmError::InvalidMesh(format!(
            "decoded index {} is outside 0..{}",
            i, vertex_count
        ))),
        None => Ok(()),
    }
}
