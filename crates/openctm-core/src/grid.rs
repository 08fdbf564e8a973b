//! Spatial subdivision grid used by MG2 to sort vertices and store them
//! relative to their cell.

use log::debug;

use crate::math_utils::Vec3;
use crate::status::{CtmError, CtmResult};

/// Axis aligned grid over the mesh bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    min: Vec3,
    max: Vec3,
    division: [u32; 3],
    size: Vec3,
}

impl Grid {
    /// Builds the grid for a vertex set. The number of cells grows with the
    /// cube root of `100 * V`, distributed over the axes in proportion to the
    /// bounding box extents. A degenerate (point sized) box falls back to
    /// 4 x 4 x 4 cells.
    pub fn from_vertices(vertices: &[Vec3]) -> Self {
        let (min, max) = bounding_box(vertices);

        let mut factor = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        let sum = factor[0] + factor[1] + factor[2];
        let mut division = [4u32; 3];
        if sum > 1e-30 {
            let inv = 1.0 / sum;
            let wanted = (100.0 * vertices.len() as f32).powf(1.0 / 3.0);
            for axis in 0..3 {
                factor[axis] *= inv;
                division[axis] = ((wanted * factor[axis]).ceil() as u32).max(1);
            }
        }

        let grid = Self::with_division(min, max, division);
        debug!(
            "grid: {} vertices, division {:?}, min {:?}, max {:?}",
            vertices.len(),
            grid.division,
            grid.min,
            grid.max
        );
        grid
    }

    /// Rebuilds a grid read from a stream, rejecting inverted bounds,
    /// non-finite coordinates and empty or oversized divisions.
    pub fn from_parts(min: Vec3, max: Vec3, division: [u32; 3]) -> CtmResult<Self> {
        for axis in 0..3 {
            if !min[axis].is_finite() || !max[axis].is_finite() {
                return Err(CtmError::bad_format("grid bounds are not finite"));
            }
            if max[axis] < min[axis] {
                return Err(CtmError::bad_format(format!(
                    "grid max {} is below min {} on axis {}",
                    max[axis], min[axis], axis
                )));
            }
            if division[axis] < 1 {
                return Err(CtmError::bad_format(format!("grid division on axis {} is zero", axis)));
            }
        }
        let cells = division.iter().map(|&d| d as u64).product::<u64>();
        if cells > u32::MAX as u64 {
            return Err(CtmError::bad_format(format!("grid has too many cells ({})", cells)));
        }
        Ok(Self::with_division(min, max, division))
    }

    fn with_division(min: Vec3, max: Vec3, division: [u32; 3]) -> Self {
        let mut size = [0.0f32; 3];
        for axis in 0..3 {
            size[axis] = (max[axis] - min[axis]) / division[axis] as f32;
        }
        Self { min, max, division, size }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn division(&self) -> [u32; 3] {
        self.division
    }

    pub fn cell_size(&self) -> Vec3 {
        self.size
    }

    pub fn cell_count(&self) -> u32 {
        self.division[0]
            .saturating_mul(self.division[1])
            .saturating_mul(self.division[2])
    }

    /// Index of the cell containing `point`. Points on the max boundary are
    /// clamped into the last cell; a zero sized axis always maps to cell 0.
    pub fn point_to_index(&self, point: Vec3) -> u32 {
        let mut idx = [0u32; 3];
        for axis in 0..3 {
            if self.size[axis] > 0.0 {
                let cell = ((point[axis] - self.min[axis]) / self.size[axis]).floor();
                idx[axis] = if cell <= 0.0 { 0 } else { (cell as u32).min(self.division[axis] - 1) };
            }
        }
        idx[0] + self.division[0] * (idx[1] + self.division[1] * idx[2])
    }

    /// Origin (minimum corner) of the cell with the given index.
    pub fn index_to_point(&self, index: u32) -> Vec3 {
        let ydiv = self.division[0];
        let zdiv = self.division[0] * self.division[1];
        let mut rest = index;
        let iz = rest / zdiv;
        rest -= iz * zdiv;
        let iy = rest / ydiv;
        rest -= iy * ydiv;
        let ix = rest;

        let cell = [ix, iy, iz];
        let mut point = [0.0f32; 3];
        for axis in 0..3 {
            point[axis] = cell[axis] as f32 * self.size[axis] + self.min[axis];
        }
        point
    }
}

fn bounding_box(vertices: &[Vec3]) -> (Vec3, Vec3) {
    let Some(first) = vertices.first() else {
        return ([0.0; 3], [0.0; 3]);
    };
    let mut min = *first;
    let mut max = *first;
    for v in &vertices[1..] {
        for axis in 0..3 {
            if v[axis] < min[axis] {
                min[axis] = v[axis];
            } else if v[axis] > max[axis] {
                max[axis] = v[axis];
            }
        }
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_follows_aspect_ratio() {
        let vertices: Vec<Vec3> = (0..1000)
            .map(|i| [(i % 10) as f32 * 2.0, ((i / 10) % 10) as f32, (i / 100) as f32 * 0.1])
            .collect();
        let grid = Grid::from_vertices(&vertices);
        let d = grid.division();
        assert!(d[0] > d[1] && d[1] > d[2], "division {:?}", d);
        assert!(d.iter().all(|&x| x >= 1));
        assert_eq!(grid.min(), [0.0, 0.0, 0.0]);
        assert_eq!(grid.max(), [18.0, 9.0, 9.0 * 0.1]);
    }

    #[test]
    fn test_flat_triangle() {
        let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let grid = Grid::from_vertices(&vertices);
        assert_eq!(grid.division()[2], 1);
        assert_eq!(grid.cell_size()[2], 0.0);
        for v in vertices {
            assert!(grid.point_to_index(v) < grid.cell_count());
        }
    }

    #[test]
    fn test_point_mesh_fallback() {
        let vertices = [[2.0, 2.0, 2.0]; 3];
        let grid = Grid::from_vertices(&vertices);
        assert_eq!(grid.division(), [4, 4, 4]);
        assert_eq!(grid.point_to_index([2.0, 2.0, 2.0]), 0);
        assert_eq!(grid.index_to_point(0), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_max_boundary_is_clamped() {
        let grid = Grid::from_parts([0.0; 3], [1.0; 3], [4, 4, 4]).unwrap();
        assert_eq!(grid.point_to_index([1.0, 1.0, 1.0]), grid.cell_count() - 1);
        assert_eq!(grid.point_to_index([0.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn test_index_to_point_inverts_cell_index() {
        let grid = Grid::from_parts([-1.0, 0.0, 10.0], [3.0, 6.0, 12.0], [4, 3, 2]).unwrap();
        for index in 0..grid.cell_count() {
            let origin = grid.index_to_point(index);
            let size = grid.cell_size();
            let center = [origin[0] + size[0] * 0.5, origin[1] + size[1] * 0.5, origin[2] + size[2] * 0.5];
            assert_eq!(grid.point_to_index(center), index);
        }
    }

    #[test]
    fn test_from_parts_rejects_bad_grids() {
        assert!(Grid::from_parts([0.0; 3], [1.0, -1.0, 1.0], [1, 1, 1]).is_err());
        assert!(Grid::from_parts([0.0; 3], [1.0; 3], [1, 0, 1]).is_err());
        assert!(Grid::from_parts([f32::NAN, 0.0, 0.0], [1.0; 3], [1, 1, 1]).is_err());
        assert!(Grid::from_parts([0.0; 3], [1.0; 3], [65536, 65536, 2]).is_err());
    }
}
