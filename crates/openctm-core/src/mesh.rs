//! In-memory triangle mesh with optional normals, UV maps and custom
//! attribute maps.

use crate::compression_config::{DEFAULT_ATTRIB_PRECISION, DEFAULT_UV_PRECISION};
use crate::status::{CtmError, Status};

/// Handle of a UV map: index into [`Mesh::uv_maps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UvMapId(pub usize);

/// Handle of a custom attribute map: index into [`Mesh::attrib_maps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttribMapId(pub usize);

/// Per-vertex texture coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UvMap {
    pub name: String,
    /// Optional reference to the texture image.
    pub file_name: Option<String>,
    /// Fixed-point step used by MG2.
    pub precision: f32,
    pub coords: Vec<[f32; 2]>,
}

impl UvMap {
    pub fn new(name: impl Into<String>, coords: Vec<[f32; 2]>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            precision: DEFAULT_UV_PRECISION,
            coords,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Per-vertex custom attribute with four components.
#[derive(Debug, Clone, PartialEq)]
pub struct AttribMap {
    pub name: String,
    pub precision: f32,
    pub values: Vec<[f32; 4]>,
}

impl AttribMap {
    pub fn new(name: impl Into<String>, values: Vec<[f32; 4]>) -> Self {
        Self {
            name: name.into(),
            precision: DEFAULT_ATTRIB_PRECISION,
            values,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub(crate) vertices: Vec<[f32; 3]>,
    pub(crate) indices: Vec<[u32; 3]>,
    pub(crate) normals: Option<Vec<[f32; 3]>>,
    pub(crate) uv_maps: Vec<UvMap>,
    pub(crate) attrib_maps: Vec<AttribMap>,
}

impl Mesh {
    pub fn new(vertices: Vec<[f32; 3]>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            indices,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    pub fn set_normals(&mut self, normals: Option<Vec<[f32; 3]>>) {
        self.normals = normals;
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn uv_maps(&self) -> &[UvMap] {
        &self.uv_maps
    }

    pub fn attrib_maps(&self) -> &[AttribMap] {
        &self.attrib_maps
    }

    pub fn uv_map(&self, id: UvMapId) -> Option<&UvMap> {
        self.uv_maps.get(id.0)
    }

    pub fn uv_map_mut(&mut self, id: UvMapId) -> Option<&mut UvMap> {
        self.uv_maps.get_mut(id.0)
    }

    pub fn attrib_map(&self, id: AttribMapId) -> Option<&AttribMap> {
        self.attrib_maps.get(id.0)
    }

    pub fn attrib_map_mut(&mut self, id: AttribMapId) -> Option<&mut AttribMap> {
        self.attrib_maps.get_mut(id.0)
    }

    pub fn add_uv_map(&mut self, map: UvMap) -> UvMapId {
        self.uv_maps.push(map);
        UvMapId(self.uv_maps.len() - 1)
    }

    pub fn add_attrib_map(&mut self, map: AttribMap) -> AttribMapId {
        self.attrib_maps.push(map);
        AttribMapId(self.attrib_maps.len() - 1)
    }

    pub fn uv_map_by_name(&self, name: &str) -> Option<UvMapId> {
        self.uv_maps.iter().position(|m| m.name == name).map(UvMapId)
    }

    pub fn attrib_map_by_name(&self, name: &str) -> Option<AttribMapId> {
        self.attrib_maps.iter().position(|m| m.name == name).map(AttribMapId)
    }

    /// Mean length of all triangle edges (shared edges count once per triangle).
    /// Returns `None` for a mesh without triangles.
    pub fn average_edge_length(&self) -> Option<f32> {
        if self.indices.is_empty() {
            return None;
        }
        let mut sum = 0.0f64;
        for tri in &self.indices {
            let mut p1 = self.vertices.get(tri[2] as usize)?;
            for &corner in tri {
                let p2 = self.vertices.get(corner as usize)?;
                let d = [p2[0] - p1[0], p2[1] - p1[1], p2[2] - p1[2]];
                sum += ((d[0] * d[0] + d[1] * d[1] + d[2] * d[2]) as f64).sqrt();
                p1 = p2;
            }
        }
        Some((sum / (self.indices.len() * 3) as f64) as f32)
    }

    /// Verifies topology and numeric sanity: at least one vertex and one
    /// triangle, every index in range, every float finite and every per-vertex
    /// array exactly one entry per vertex.
    pub fn check_integrity(&self) -> Status {
        let vertex_count = self.vertices.len();
        if vertex_count == 0 || self.indices.is_empty() {
            return Err(CtmError::InvalidMesh("mesh has no vertices or no triangles".into()));
        }
        if u32::try_from(vertex_count).is_err() || u32::try_from(self.indices.len()).is_err() {
            return Err(CtmError::InvalidMesh("mesh is too large for the format".into()));
        }
        if let Some((t, tri)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, tri)| tri.iter().any(|&i| i as usize >= vertex_count))
        {
            return Err(CtmError::InvalidMesh(format!(
                "triangle {} {:?} references a vertex outside 0..{}",
                t, tri, vertex_count
            )));
        }
        check_finite("vertices", self.vertices.iter().flatten())?;

        if let Some(normals) = &self.normals {
            check_len("normals", normals.len(), vertex_count)?;
            check_finite("normals", normals.iter().flatten())?;
        }
        for map in &self.uv_maps {
            check_len(&map.name, map.coords.len(), vertex_count)?;
            check_finite(&map.name, map.coords.iter().flatten())?;
        }
        for map in &self.attrib_maps {
            check_len(&map.name, map.values.len(), vertex_count)?;
            check_finite(&map.name, map.values.iter().flatten())?;
        }
        Ok(())
    }
}

fn check_len(what: &str, len: usize, vertex_count: usize) -> Status {
    if len != vertex_count {
        return Err(CtmError::InvalidMesh(format!(
            "{} has {} entries for {} vertices",
            what, len, vertex_count
        )));
    }
    Ok(())
}

fn check_finite<'a>(what: &str, mut values: impl Iterator<Item = &'a f32>) -> Status {
    if values.any(|v| !v.is_finite()) {
        return Err(CtmError::InvalidMesh(format!("{} contain a non-finite value", what)));
    }
    Ok(())
}
