//! MG2 vertex ordering and fixed-point vertex deltas.
//!
//! Vertices are ordered by grid cell and then by X, which makes the X offsets
//! inside a cell monotonic. Each coordinate is stored as a rounded offset from
//! its cell origin; X is additionally stored as the difference to the previous
//! vertex when both share a cell.

use std::cmp::Ordering;

use crate::grid::Grid;
use crate::math_utils::{quantize, Vec3};
use crate::status::{CtmError, CtmResult};

/// Sort key of one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortVertex {
    pub x: f32,
    pub grid_index: u32,
    pub original_index: u32,
}

/// Orders vertices by `(grid_index, x)`. The sort is stable, so vertices with
/// equal X inside one cell keep their original relative order.
pub fn sort_vertices(vertices: &[Vec3], grid: &Grid) -> Vec<SortVertex> {
    let mut sorted: Vec<SortVertex> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| SortVertex {
            x: v[0],
            grid_index: grid.point_to_index(*v),
            original_index: i as u32,
        })
        .collect();
    sorted.sort_by(|a, b| {
        a.grid_index
            .cmp(&b.grid_index)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });
    sorted
}

/// Quantizes vertices (in sorted order) relative to their cell origins.
/// Returns `3 * V` integers, or `InvalidArgument` when an offset needs more
/// than 32 bits at this precision.
pub fn make_vertex_deltas(
    vertices: &[Vec3],
    sorted: &[SortVertex],
    grid: &Grid,
    precision: f32,
) -> CtmResult<Vec<i32>> {
    let scale = 1.0 / precision;
    let mut deltas = Vec::with_capacity(sorted.len() * 3);
    let mut prev_grid_index = None;
    let mut prev_delta_x = 0i32;

    for sv in sorted {
        let origin = grid.index_to_point(sv.grid_index);
        let v = vertices[sv.original_index as usize];

        let delta_x = quantize(scale * (v[0] - origin[0]))?;
        if prev_grid_index == Some(sv.grid_index) {
            deltas.push(delta_x.wrapping_sub(prev_delta_x));
        } else {
            deltas.push(delta_x);
        }
        deltas.push(quantize(scale * (v[1] - origin[1]))?);
        deltas.push(quantize(scale * (v[2] - origin[2]))?);

        prev_grid_index = Some(sv.grid_index);
        prev_delta_x = delta_x;
    }
    Ok(deltas)
}

/// Reconstructs vertex positions from deltas and absolute grid indices.
pub fn restore_vertices(deltas: &[i32], grid_indices: &[u32], grid: &Grid, precision: f32) -> Vec<Vec3> {
    let mut vertices = Vec::with_capacity(grid_indices.len());
    let mut prev_grid_index = None;
    let mut prev_delta_x = 0i32;

    for (delta, &grid_index) in deltas.chunks_exact(3).zip(grid_indices) {
        let origin = grid.index_to_point(grid_index);
        let mut delta_x = delta[0];
        if prev_grid_index == Some(grid_index) {
            delta_x = delta_x.wrapping_add(prev_delta_x);
        }
        vertices.push([
            precision * delta_x as f32 + origin[0],
            precision * delta[1] as f32 + origin[1],
            precision * delta[2] as f32 + origin[2],
        ]);
        prev_grid_index = Some(grid_index);
        prev_delta_x = delta_x;
    }
    vertices
}

/// First-order differences of the sorted grid indices; the first entry is
/// absolute. All entries are non-negative because the indices are sorted.
pub fn grid_index_deltas(sorted: &[SortVertex]) -> Vec<u32> {
    let mut deltas = Vec::with_capacity(sorted.len());
    let mut prev = 0u32;
    for sv in sorted {
        deltas.push(sv.grid_index.wrapping_sub(prev));
        prev = sv.grid_index;
    }
    deltas
}

/// Prefix sum that turns grid index deltas back into absolute indices, checking
/// that every index names a cell of `grid`.
pub fn restore_grid_indices(deltas: &mut [u32], grid: &Grid) -> CtmResult<()> {
    let cells = grid.cell_count();
    let mut prev = 0u32;
    for (i, value) in deltas.iter_mut().enumerate() {
        *value = value.wrapping_add(prev);
        if *value >= cells {
            return Err(CtmError::BadFormat(format!(
                "vertex {} lies in grid cell {}, grid has {} cells",
                i, *value, cells
            )));
        }
        prev = *value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vertices() -> Vec<Vec3> {
        vec![
            [0.9, 0.1, 0.1],
            [0.1, 0.1, 0.1],
            [0.5, 0.9, 0.9],
            [0.2, 0.15, 0.05],
            [0.95, 0.95, 0.95],
            [0.15, 0.12, 0.1],
        ]
    }

    #[test]
    fn test_sort_order() {
        let vertices = sample_vertices();
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let sorted = sort_vertices(&vertices, &grid);

        let order: Vec<u32> = sorted.iter().map(|s| s.original_index).collect();
        assert_eq!(order, vec![1, 5, 3, 0, 2, 4]);
        assert!(sorted.windows(2).all(|w| w[0].grid_index <= w[1].grid_index));
    }

    #[test]
    fn test_equal_x_keeps_original_order() {
        let vertices = vec![[0.5, 0.3, 0.0], [0.5, 0.1, 0.0], [0.5, 0.2, 0.0]];
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [1, 1, 1]).unwrap();
        let order: Vec<u32> = sort_vertices(&vertices, &grid).iter().map(|s| s.original_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_vertex_round_trip() {
        let vertices = sample_vertices();
        let grid = Grid::from_vertices(&vertices);
        let precision = 1.0 / 1024.0;
        let sorted = sort_vertices(&vertices, &grid);
        let deltas = make_vertex_deltas(&vertices, &sorted, &grid, precision).unwrap();
        let grid_indices: Vec<u32> = sorted.iter().map(|s| s.grid_index).collect();
        let restored = restore_vertices(&deltas, &grid_indices, &grid, precision);

        for (sv, r) in sorted.iter().zip(&restored) {
            let original = vertices[sv.original_index as usize];
            for axis in 0..3 {
                assert!((original[axis] - r[axis]).abs() <= precision * 0.5 + 1e-6);
            }
        }
    }

    #[test]
    fn test_x_delta_chain_within_cell() {
        let vertices = vec![[0.0, 0.0, 0.0], [0.25, 0.0, 0.0], [0.5, 0.0, 0.0]];
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [1, 1, 1]).unwrap();
        let sorted = sort_vertices(&vertices, &grid);
        let deltas = make_vertex_deltas(&vertices, &sorted, &grid, 0.25).unwrap();
        assert_eq!(deltas, vec![0, 0, 0, 1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_offset_beyond_32_bits_is_rejected() {
        let vertices = vec![[0.0, 0.0, 0.0], [1000.0, 0.0, 0.0], [0.0, 1000.0, 0.0]];
        let grid = Grid::from_parts([0.0; 3], [1000.0; 3], [1, 1, 1]).unwrap();
        let sorted = sort_vertices(&vertices, &grid);
        let err = make_vertex_deltas(&vertices, &sorted, &grid, 1.0e-7).unwrap_err();
        assert_eq!(err.kind(), crate::status::ErrorKind::InvalidArgument);
        assert!(make_vertex_deltas(&vertices, &sorted, &grid, 1.0e-6).is_ok());
    }

    #[test]
    fn test_grid_index_deltas() {
        let vertices = sample_vertices();
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let sorted = sort_vertices(&vertices, &grid);
        let mut deltas = grid_index_deltas(&sorted);
        assert_eq!(deltas[0], sorted[0].grid_index);
        restore_grid_indices(&mut deltas, &grid).unwrap();
        let expected: Vec<u32> = sorted.iter().map(|s| s.grid_index).collect();
        assert_eq!(deltas, expected);
    }

    #[test]
    fn test_grid_index_out_of_range() {
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let mut deltas = vec![3, 4, 1];
        assert!(restore_grid_indices(&mut deltas, &grid).is_err());
    }
}
