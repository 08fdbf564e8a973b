//! Import/export context: the public entry point of the codec.
//!
//! A context is created for either importing or exporting. Export contexts
//! hold the mesh and compression settings and write `.ctm` streams; import
//! contexts parse a stream into a mesh. Every failing call also records its
//! [`ErrorKind`] in a last-error register, which [`Context::take_error`]
//! returns and clears.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::compression_config::{validate_precision, CompressionMethod, CompressionOptions, MAX_COMPRESSION_LEVEL};
use crate::compressor::{Compressor, LzmaCompressor};
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::header::FileHeader;
use crate::mesh::{AttribMap, AttribMapId, Mesh, UvMap, UvMapId};
use crate::mg1::{decode_mg1, encode_mg1};
use crate::mg2::{decode_mg2, encode_mg2};
use crate::packed_stream::{PackedReader, PackedWriter};
use crate::status::{CtmError, CtmResult, ErrorKind, Status};
use crate::version::HAS_NORMALS_BIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    Import,
    Export,
}

pub struct Context {
    mode: ContextMode,
    mesh: Option<Mesh>,
    options: CompressionOptions,
    comment: Option<String>,
    last_error: Option<ErrorKind>,
    compressor: Box<dyn Compressor>,
}

impl Context {
    pub fn new(mode: ContextMode) -> Self {
        Self::with_compressor(mode, Box::new(LzmaCompressor::new()))
    }

    /// Creates a context that packs its sections with `compressor` instead of
    /// the built-in LZMA backend.
    pub fn with_compressor(mode: ContextMode, compressor: Box<dyn Compressor>) -> Self {
        Self {
            mode,
            mesh: None,
            options: CompressionOptions::default(),
            comment: None,
            last_error: None,
            compressor,
        }
    }

    pub fn mode(&self) -> ContextMode {
        self.mode
    }

    /// Returns the last recorded error kind and clears it.
    pub fn take_error(&mut self) -> Option<ErrorKind> {
        self.last_error.take()
    }

    fn record<T>(&mut self, result: CtmResult<T>) -> CtmResult<T> {
        if let Err(err) = &result {
            debug!("context call failed: {}", err);
            self.last_error = Some(err.kind());
        }
        result
    }

    fn require_mode(&self, mode: ContextMode) -> Status {
        if self.mode != mode {
            return Err(CtmError::InvalidOperation(format!(
                "operation requires {:?} mode, context is in {:?} mode",
                mode, self.mode
            )));
        }
        Ok(())
    }

    fn require_mesh(&self) -> CtmResult<&Mesh> {
        self.mesh
            .as_ref()
            .ok_or_else(|| CtmError::InvalidMesh("no mesh has been defined".into()))
    }

    fn require_mesh_mut(&mut self) -> CtmResult<&mut Mesh> {
        self.mesh
            .as_mut()
            .ok_or_else(|| CtmError::InvalidMesh("no mesh has been defined".into()))
    }

    // ===================================================================
    // Export configuration
    // ===================================================================

    pub fn set_compression_method(&mut self, method: CompressionMethod) -> Status {
        let result = self.require_mode(ContextMode::Export).map(|()| {
            self.options.method = method;
        });
        self.record(result)
    }

    pub fn set_compression_level(&mut self, level: u32) -> Status {
        let result = self.require_mode(ContextMode::Export).and_then(|()| {
            if level > MAX_COMPRESSION_LEVEL {
                return Err(CtmError::invalid_argument(format!(
                    "compression level {} is outside 0..={}",
                    level, MAX_COMPRESSION_LEVEL
                )));
            }
            self.options.level = level;
            Ok(())
        });
        self.record(result)
    }

    pub fn set_vertex_precision(&mut self, precision: f32) -> Status {
        let result = self
            .require_mode(ContextMode::Export)
            .and_then(|()| validate_precision(precision))
            .map(|p| self.options.vertex_precision = p);
        self.record(result)
    }

    /// Sets the vertex precision to `relative` times the average triangle
    /// edge length of the defined mesh.
    pub fn set_vertex_precision_rel(&mut self, relative: f32) -> Status {
        let result = self.vertex_precision_rel(relative);
        self.record(result)
    }

    fn vertex_precision_rel(&mut self, relative: f32) -> Status {
        self.require_mode(ContextMode::Export)?;
        validate_precision(relative)?;
        let average = self
            .require_mesh()?
            .average_edge_length()
            .ok_or_else(|| CtmError::InvalidMesh("mesh has no measurable edges".into()))?;
        let precision = relative * average;
        if !precision.is_finite() || precision <= 0.0 {
            return Err(CtmError::InvalidMesh(format!(
                "average edge length {} gives no usable precision",
                average
            )));
        }
        debug!("relative precision {} of edge length {} -> {}", relative, average, precision);
        self.options.vertex_precision = precision;
        Ok(())
    }

    pub fn set_normal_precision(&mut self, precision: f32) -> Status {
        let result = self
            .require_mode(ContextMode::Export)
            .and_then(|()| validate_precision(precision))
            .map(|p| self.options.normal_precision = p);
        self.record(result)
    }

    pub fn set_uv_coord_precision(&mut self, id: UvMapId, precision: f32) -> Status {
        let result = self.update_uv_map(id, precision);
        self.record(result)
    }

    fn update_uv_map(&mut self, id: UvMapId, precision: f32) -> Status {
        self.require_mode(ContextMode::Export)?;
        let precision = validate_precision(precision)?;
        let map = self
            .require_mesh_mut()?
            .uv_map_mut(id)
            .ok_or_else(|| CtmError::invalid_argument(format!("no UV map with id {}", id.0)))?;
        map.precision = precision;
        Ok(())
    }

    pub fn set_attrib_precision(&mut self, id: AttribMapId, precision: f32) -> Status {
        let result = self.update_attrib_map(id, precision);
        self.record(result)
    }

    fn update_attrib_map(&mut self, id: AttribMapId, precision: f32) -> Status {
        self.require_mode(ContextMode::Export)?;
        let precision = validate_precision(precision)?;
        let map = self
            .require_mesh_mut()?
            .attrib_map_mut(id)
            .ok_or_else(|| CtmError::invalid_argument(format!("no attribute map with id {}", id.0)))?;
        map.precision = precision;
        Ok(())
    }

    pub fn set_file_comment(&mut self, comment: Option<&str>) -> Status {
        let result = self.require_mode(ContextMode::Export).map(|()| {
            self.comment = comment.filter(|c| !c.is_empty()).map(str::to_owned);
        });
        self.record(result)
    }

    /// Defines the mesh to export, replacing any previous mesh and its maps.
    pub fn define_mesh(
        &mut self,
        vertices: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
    ) -> Status {
        let result = self.define_mesh_inner(vertices, indices, normals);
        self.record(result)
    }

    fn define_mesh_inner(
        &mut self,
        vertices: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
    ) -> Status {
        self.require_mode(ContextMode::Export)?;
        if vertices.is_empty() || indices.is_empty() {
            return Err(CtmError::invalid_argument("a mesh needs at least one vertex and one triangle"));
        }
        if let Some(n) = &normals {
            if n.len() != vertices.len() {
                return Err(CtmError::invalid_argument(format!(
                    "{} normals given for {} vertices",
                    n.len(),
                    vertices.len()
                )));
            }
        }
        let mut mesh = Mesh::new(vertices, indices);
        mesh.set_normals(normals);
        self.mesh = Some(mesh);
        Ok(())
    }

    pub fn add_uv_map(&mut self, coords: Vec<[f32; 2]>, name: &str, file_name: Option<&str>) -> CtmResult<UvMapId> {
        let result = self.add_uv_map_inner(coords, name, file_name);
        self.record(result)
    }

    fn add_uv_map_inner(&mut self, coords: Vec<[f32; 2]>, name: &str, file_name: Option<&str>) -> CtmResult<UvMapId> {
        self.require_mode(ContextMode::Export)?;
        let mesh = self.require_mesh_mut()?;
        check_map(name, coords.len(), mesh.vertex_count())?;
        let mut map = UvMap::new(name, coords);
        map.file_name = file_name.filter(|f| !f.is_empty()).map(str::to_owned);
        Ok(mesh.add_uv_map(map))
    }

    pub fn add_attrib_map(&mut self, values: Vec<[f32; 4]>, name: &str) -> CtmResult<AttribMapId> {
        let result = self.add_attrib_map_inner(values, name);
        self.record(result)
    }

    fn add_attrib_map_inner(&mut self, values: Vec<[f32; 4]>, name: &str) -> CtmResult<AttribMapId> {
        self.require_mode(ContextMode::Export)?;
        let mesh = self.require_mesh_mut()?;
        check_map(name, values.len(), mesh.vertex_count())?;
        Ok(mesh.add_attrib_map(AttribMap::new(name, values)))
    }

    // ===================================================================
    // Saving
    // ===================================================================

    /// Encodes the defined mesh into a complete `.ctm` byte stream.
    pub fn save_to_vec(&mut self) -> CtmResult<Vec<u8>> {
        let result = self.encode();
        self.record(result)
    }

    pub fn save<W: Write>(&mut self, writer: &mut W) -> Status {
        let result = self.encode().and_then(|data| {
            writer.write_all(&data)?;
            writer.flush()?;
            Ok(())
        });
        self.record(result)
    }

    pub fn save_file<P: AsRef<Path>>(&mut self, path: P) -> Status {
        let path = path.as_ref();
        let result = self.encode().and_then(|data| {
            let file = File::create(path).map_err(|e| CtmError::FileError(format!("{}: {}", path.display(), e)))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&data)?;
            writer.flush()?;
            Ok(())
        });
        if result.is_ok() {
            info!("wrote {}", path.display());
        }
        self.record(result)
    }

    fn encode(&self) -> CtmResult<Vec<u8>> {
        self.require_mode(ContextMode::Export)?;
        let mesh = self.require_mesh()?;
        mesh.check_integrity()?;

        let header = FileHeader {
            method: self.options.method,
            vertex_count: mesh.vertex_count() as u32,
            triangle_count: mesh.triangle_count() as u32,
            uv_map_count: mesh.uv_maps().len() as u32,
            attrib_map_count: mesh.attrib_maps().len() as u32,
            flags: if mesh.has_normals() { HAS_NORMALS_BIT } else { 0 },
            comment: self.comment.clone(),
        };

        let mut out = EncoderBuffer::new();
        header.encode(&mut out);
        let writer = PackedWriter::new(self.compressor.as_ref(), self.options.level);
        match self.options.method {
            CompressionMethod::Mg1 => encode_mg1(mesh, &writer, &mut out)?,
            CompressionMethod::Mg2 => encode_mg2(mesh, &self.options, &writer, &mut out)?,
        }
        debug!(
            "encoded {} vertices, {} triangles with {} into {} bytes",
            header.vertex_count,
            header.triangle_count,
            self.options.method.name(),
            out.size()
        );
        Ok(out.into_inner())
    }

    // ===================================================================
    // Loading
    // ===================================================================

    /// Parses a complete `.ctm` stream. On failure no mesh is kept.
    pub fn load_from_slice(&mut self, data: &[u8]) -> Status {
        let result = self.require_mode(ContextMode::Import).and_then(|()| {
            self.mesh = None;
            self.comment = None;
            self.decode(data)
        });
        let result = result.map(|(mesh, options, comment)| {
            self.mesh = Some(mesh);
            self.options = options;
            self.comment = comment;
        });
        self.record(result)
    }

    pub fn load<R: Read>(&mut self, reader: &mut R) -> Status {
        let result = self.require_mode(ContextMode::Import).and_then(|()| {
            let mut data = Vec::new();
            reader.read_to_end(&mut data)?;
            Ok(data)
        });
        match result {
            Ok(data) => self.load_from_slice(&data),
            Err(err) => {
                self.mesh = None;
                self.record(Err(err))
            }
        }
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Status {
        let path = path.as_ref();
        let result = self.require_mode(ContextMode::Import).and_then(|()| {
            let mut file =
                File::open(path).map_err(|e| CtmError::FileError(format!("{}: {}", path.display(), e)))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| CtmError::FileError(format!("{}: {}", path.display(), e)))?;
            Ok(data)
        });
        match result {
            Ok(data) => {
                self.load_from_slice(&data)?;
                info!("read {}", path.display());
                Ok(())
            }
            Err(err) => {
                self.mesh = None;
                self.record(Err(err))
            }
        }
    }

    fn decode(&self, data: &[u8]) -> CtmResult<(Mesh, CompressionOptions, Option<String>)> {
        let mut buffer = DecoderBuffer::new(data);
        let header = FileHeader::decode(&mut buffer)?;
        debug!(
            "{} stream: {} vertices, {} triangles, {} UV maps, {} attribute maps",
            header.method.name(),
            header.vertex_count,
            header.triangle_count,
            header.uv_map_count,
            header.attrib_map_count
        );

        let reader = PackedReader::new(self.compressor.as_ref());
        let mut options = CompressionOptions {
            method: header.method,
            ..CompressionOptions::default()
        };
        let mesh = match header.method {
            CompressionMethod::Mg1 => decode_mg1(&header, &reader, &mut buffer)?,
            CompressionMethod::Mg2 => decode_mg2(&header, &reader, &mut buffer, &mut options)?,
        };
        mesh.check_integrity()?;
        Ok((mesh, options, header.comment))
    }

    // ===================================================================
    // Queries
    // ===================================================================

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Takes the mesh out of the context.
    pub fn into_mesh(self) -> Option<Mesh> {
        self.mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, Mesh::vertex_count)
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, Mesh::triangle_count)
    }

    pub fn has_normals(&self) -> bool {
        self.mesh.as_ref().is_some_and(Mesh::has_normals)
    }

    pub fn uv_map_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.uv_maps().len())
    }

    pub fn attrib_map_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.attrib_maps().len())
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.options.method
    }

    pub fn compression_level(&self) -> u32 {
        self.options.level
    }

    pub fn vertex_precision(&self) -> f32 {
        self.options.vertex_precision
    }

    pub fn normal_precision(&self) -> f32 {
        self.options.normal_precision
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    pub fn file_comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn uv_map(&self, id: UvMapId) -> Option<&UvMap> {
        self.mesh.as_ref()?.uv_map(id)
    }

    pub fn attrib_map(&self, id: AttribMapId) -> Option<&AttribMap> {
        self.mesh.as_ref()?.attrib_map(id)
    }

    pub fn uv_map_by_name(&self, name: &str) -> Option<UvMapId> {
        self.mesh.as_ref()?.uv_map_by_name(name)
    }

    pub fn attrib_map_by_name(&self, name: &str) -> Option<AttribMapId> {
        self.mesh.as_ref()?.attrib_map_by_name(name)
    }
}

fn check_map(name: &str, len: usize, vertex_count: usize) -> Status {
    if name.is_empty() {
        return Err(CtmError::invalid_argument("map name must not be empty"));
    }
    if len != vertex_count {
        return Err(CtmError::invalid_argument(format!(
            "map {:?} has {} entries for {} vertices",
            name, len, vertex_count
        )));
    }
    Ok(())
}
