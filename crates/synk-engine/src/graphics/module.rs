use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::SlotMap;

use crate::error::{ContextError, Error, ResourceError, Result, UsageError};
use crate::platform::SurfaceTarget;

use super::binding::{BindTarget, BindingTable, Bound, BoundResource};
use super::device::{BufferDesc, DrawCall, HeadlessDevice, LinkStage, RenderDevice, WgpuDevice};
use super::init::GraphicsInit;
use super::kind::ModuleKind;
use super::resources::{
    Buffer, BufferId, BufferTarget, IndexBuffer, ProgramId, Resource, ShaderProgram, VertexArray,
    VertexArrayId, VertexBuffer, VertexLayout,
};
use super::shader::{self, ShaderStage};
use super::types::{
    BufferUsage, ClearMask, ColorRgba, IndexType, PrimitiveKind, ScalarType, Viewport,
};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Running counters since the module was bound.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub draw_calls: u64,
    pub clears: u64,
}

struct BufferRecord {
    target: BufferTarget,
    size: u64,
    /// CPU copy of index data, used to range-check indices before drawing.
    shadow: Option<Vec<u8>>,
}

#[derive(Default)]
struct VertexArrayRecord {
    vertex_buffer: Option<BufferId>,
    layout: Option<VertexLayout>,
}

struct ProgramRecord {
    base_path: PathBuf,
}

/// Graphics context bound to one window surface.
///
/// Holds the context state (clear color, vsync, viewport), the binding table and the
/// bookkeeping for every resource it created. Rendering work is forwarded to a
/// [`RenderDevice`]; a window exposing a native surface gets the wgpu device, an offscreen
/// target gets the headless one.
///
/// A module extracted before its window is built stays *unbound* until `build` attaches it;
/// until then device work fails with `ContextError::Unbound`. Once the owning window is
/// dropped (or the device reports a fatal error) the module is *lost*: every further call
/// fails with `ContextError::Lost`.
pub struct GraphicsModule {
    context: u64,
    device: Option<Box<dyn RenderDevice>>,
    /// Creation parameters kept until the surface exists.
    pending: Option<GraphicsInit>,
    backend: &'static str,

    clear_color: ColorRgba,
    vsync: bool,
    viewport: Viewport,

    buffers: SlotMap<BufferId, BufferRecord>,
    arrays: SlotMap<VertexArrayId, VertexArrayRecord>,
    programs: SlotMap<ProgramId, ProgramRecord>,
    bindings: BindingTable,

    stats: FrameStats,
}

impl ModuleKind for GraphicsModule {
    type Init = GraphicsInit;
    const NAME: &'static str = "GraphicsModule";

    fn unbound(init: GraphicsInit) -> Self {
        let context = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
        log::debug!("graphics context {context} created, waiting for a surface");

        let mut module = Self::new(context, None, "unbound", init.vsync, Viewport::default());
        module.pending = Some(init);
        module
    }

    fn attach(&mut self, target: &SurfaceTarget) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }
        let Some(init) = self.pending.as_ref() else {
            return Err(ContextError::Lost.into());
        };

        let device: Box<dyn RenderDevice> = match target {
            SurfaceTarget::Window {
                handle,
                width,
                height,
            } => {
                let device =
                    pollster::block_on(WgpuDevice::new(handle.clone(), *width, *height, init))
                        .map_err(|e| ContextError::Creation(format!("{e:#}")))?;
                Box::new(device)
            }
            SurfaceTarget::Offscreen { width, height } => Box::new(HeadlessDevice::new(
                *width,
                *height,
                init.vsync,
                init.required_limits.max_buffer_size,
            )),
        };

        let (width, height) = device.surface_size();
        self.backend = device.backend();
        self.vsync = init.vsync;
        self.viewport = Viewport::full(width, height);
        self.device = Some(device);
        self.pending = None;

        log::info!(
            "graphics context {} bound ({}, {width}x{height})",
            self.context,
            self.backend
        );
        Ok(())
    }

    fn surface_resized(&mut self, width: u32, height: u32) {
        if let Some(device) = self.device.as_deref_mut() {
            device.resize_surface(width, height);
        }
    }

    fn invalidate(&mut self) {
        self.pending = None;
        if self.device.take().is_some() {
            log::info!("graphics context {} released with its window", self.context);
        }
    }
}

impl GraphicsModule {
    /// Binds a module to an arbitrary device.
    pub fn with_device(device: Box<dyn RenderDevice>, vsync: bool) -> Self {
        let context = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
        let backend = device.backend();
        let (width, height) = device.surface_size();

        log::info!("graphics context {context} bound ({backend}, {width}x{height})");

        Self::new(
            context,
            Some(device),
            backend,
            vsync,
            Viewport::full(width, height),
        )
    }

    fn new(
        context: u64,
        device: Option<Box<dyn RenderDevice>>,
        backend: &'static str,
        vsync: bool,
        viewport: Viewport,
    ) -> Self {
        Self {
            context,
            device,
            pending: None,
            backend,
            clear_color: ColorRgba::black(),
            vsync,
            viewport,
            buffers: SlotMap::with_key(),
            arrays: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            bindings: BindingTable::default(),
            stats: FrameStats::default(),
        }
    }

    /// Module over an in-memory device with default settings.
    pub fn headless(width: u32, height: u32) -> Self {
        let init = GraphicsInit::default();
        let device = HeadlessDevice::new(
            width,
            height,
            init.vsync,
            init.required_limits.max_buffer_size,
        );
        Self::with_device(Box::new(device), init.vsync)
    }

    // ── context state ──────────────────────────────────────────────────────

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn is_lost(&self) -> bool {
        self.device.is_none() && self.pending.is_none()
    }

    /// True while the module waits for its window to be built.
    pub fn is_unbound(&self) -> bool {
        self.pending.is_some()
    }

    /// Current surface size, or `None` while unbound or lost.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.device.as_deref().map(|d| d.surface_size())
    }

    pub fn clear_color(&self) -> ColorRgba {
        self.clear_color
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Sets the color used by `clear_buffers`. Channels are clamped to `0.0..=1.0`.
    pub fn set_clear_color(&mut self, color: ColorRgba) {
        let clamped = color.clamped();
        if clamped != color {
            log::debug!("clear color {color:?} clamped to {clamped:?}");
        }
        self.clear_color = clamped;
    }

    /// Requests vsync on or off.
    ///
    /// Returns whether the request took effect. An unsupported mode is logged and the previous
    /// setting kept.
    pub fn set_vsync(&mut self, enabled: bool) -> bool {
        if let Some(init) = self.pending.as_mut() {
            init.vsync = enabled;
            self.vsync = enabled;
            return true;
        }
        let Some(device) = self.device.as_deref_mut() else {
            log::warn!("set_vsync({enabled}) on a lost graphics context");
            return false;
        };

        if device.set_vsync(enabled) {
            self.vsync = enabled;
            true
        } else {
            log::warn!(
                "{} backend cannot turn vsync {}; keeping current mode",
                self.backend,
                if enabled { "on" } else { "off" }
            );
            false
        }
    }

    /// Maps normalized output onto `viewport` (physical pixels). Call on every resize.
    ///
    /// Degenerate rectangles are rejected with a warning and the current viewport kept.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if !viewport.is_valid() {
            log::warn!("ignoring degenerate viewport {viewport:?}");
            return;
        }
        self.viewport = viewport;
    }

    pub fn clear_buffers(&mut self, mask: ClearMask) -> Result<()> {
        let color = self.clear_color;
        let result = self.device()?.clear(mask, color);
        self.settle(result)?;
        self.stats.clears += 1;
        Ok(())
    }

    /// Presents the frame. Blocks for the swap interval when vsync is on.
    pub fn swap_buffers(&mut self) -> Result<()> {
        let result = self.device()?.present();
        self.settle(result)?;
        self.stats.frames_presented += 1;
        Ok(())
    }

    // ── resource factory ───────────────────────────────────────────────────

    pub fn create_vertex_array(&mut self) -> Result<VertexArray> {
        self.device()?;
        let id = self.arrays.insert(VertexArrayRecord::default());
        log::trace!("vertex array {id:?} created");

        Ok(VertexArray {
            id,
            context: self.context,
        })
    }

    /// Allocates `size` bytes of vertex storage, uploading `data` (at offset 0) if given.
    pub fn create_vertex_buffer(
        &mut self,
        size: u64,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Result<VertexBuffer> {
        self.create_buffer(BufferTarget::Vertex, size, usage, data)
            .map(VertexBuffer)
    }

    /// Allocates `size` bytes of index storage, uploading `data` (at offset 0) if given.
    pub fn create_index_buffer(
        &mut self,
        size: u64,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Result<IndexBuffer> {
        self.create_buffer(BufferTarget::Index, size, usage, data)
            .map(IndexBuffer)
    }

    /// Vertex buffer sized and filled from a slice of plain-old-data vertices.
    pub fn create_vertex_buffer_from<T: bytemuck::Pod>(
        &mut self,
        usage: BufferUsage,
        vertices: &[T],
    ) -> Result<VertexBuffer> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        self.create_vertex_buffer(bytes.len() as u64, usage, Some(bytes))
    }

    /// Index buffer sized and filled from a slice of `u16` or `u32` indices.
    pub fn create_index_buffer_from<T: bytemuck::Pod>(
        &mut self,
        usage: BufferUsage,
        indices: &[T],
    ) -> Result<IndexBuffer> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        self.create_index_buffer(bytes.len() as u64, usage, Some(bytes))
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        size: u64,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Result<Buffer> {
        if size == 0 {
            return Err(ResourceError::ZeroSized.into());
        }
        if let Some(data) = data
            && data.len() as u64 > size
        {
            return Err(ResourceError::InitialDataTooLarge {
                len: data.len() as u64,
                size,
            }
            .into());
        }

        let id = self.buffers.insert(BufferRecord {
            target,
            size,
            shadow: None,
        });

        let desc = BufferDesc {
            target,
            size,
            usage,
        };
        let created = self.device().and_then(|device| {
            device.create_buffer(id, &desc)?;
            if let Some(data) = data.filter(|d| !d.is_empty())
                && let Err(e) = device.write_buffer(id, 0, data)
            {
                device.destroy_buffer(id);
                return Err(e);
            }
            Ok(())
        });

        if let Err(e) = self.settle(created) {
            self.buffers.remove(id);
            return Err(e);
        }

        // Index data is mirrored so draws can range-check it. The device already accepted
        // `size`, so the mirror is bounded by the buffer limit.
        if target == BufferTarget::Index {
            let mut shadow = vec![0; size as usize];
            if let Some(data) = data {
                shadow[..data.len()].copy_from_slice(data);
            }
            if let Some(record) = self.buffers.get_mut(id) {
                record.shadow = Some(shadow);
            }
        }

        log::debug!("{} {id:?} created ({size} bytes, {usage:?})", target.name());

        Ok(Buffer {
            id,
            context: self.context,
            target,
            size,
            usage,
        })
    }

    /// Overwrites part of a buffer.
    ///
    /// `offset` must be a multiple of 4, and so must the length unless the write ends exactly
    /// at the end of the buffer. Bytes outside `offset..offset + data.len()` are never touched.
    pub fn update_buffer(
        &mut self,
        buffer: &impl AsRef<Buffer>,
        offset: u64,
        data: &[u8],
    ) -> Result<()> {
        let buffer = buffer.as_ref();
        self.check_owned(buffer.context, buffer.target.name())?;

        if offset % 4 != 0 {
            return Err(UsageError::UnalignedOffset(offset).into());
        }

        let Some(record) = self.buffers.get(buffer.id) else {
            return Err(UsageError::StaleResource(buffer.target.name()).into());
        };
        let len = data.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > record.size) {
            return Err(ResourceError::WriteOutOfBounds {
                offset,
                len,
                size: record.size,
            }
            .into());
        }
        if len % 4 != 0 && offset + len != record.size {
            return Err(UsageError::UnalignedLength(len).into());
        }
        if data.is_empty() {
            return Ok(());
        }

        let result = self.device()?.write_buffer(buffer.id, offset, data);
        self.settle(result)?;

        if let Some(shadow) = self
            .buffers
            .get_mut(buffer.id)
            .and_then(|r| r.shadow.as_mut())
        {
            let start = offset as usize;
            shadow[start..start + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    /// Size recorded for a live buffer, exactly as requested at creation.
    pub fn buffer_size(&self, buffer: &impl AsRef<Buffer>) -> Result<u64> {
        let buffer = buffer.as_ref();
        self.check_owned(buffer.context, buffer.target.name())?;
        self.buffers
            .get(buffer.id)
            .map(|r| r.size)
            .ok_or_else(|| UsageError::StaleResource(buffer.target.name()).into())
    }

    /// Loads, compiles and links `<base>.vert.wgsl` + `<base>.frag.wgsl`.
    ///
    /// Both sources are read before anything is compiled. On any failure every compiled
    /// stage is discarded and no program exists afterwards.
    pub fn load_shaders(&mut self, base: impl AsRef<Path>) -> Result<ShaderProgram> {
        let base = base.as_ref();
        self.device()?;

        let (vs_path, vs_source) = shader::read_stage(base, ShaderStage::Vertex)?;
        let (fs_path, fs_source) = shader::read_stage(base, ShaderStage::Fragment)?;

        let Some(device) = self.device.as_deref_mut() else {
            return Err(ContextError::Lost.into());
        };

        let label = base.display().to_string();
        let vs = device
            .compile_stage(ShaderStage::Vertex, &label, &vs_source)
            .map_err(|diagnostic| Error::ShaderCompile {
                stage: ShaderStage::Vertex,
                path: vs_path,
                diagnostic,
            })?;
        let fs = match device.compile_stage(ShaderStage::Fragment, &label, &fs_source) {
            Ok(fs) => fs,
            Err(diagnostic) => {
                device.discard_stage(vs);
                return Err(Error::ShaderCompile {
                    stage: ShaderStage::Fragment,
                    path: fs_path,
                    diagnostic,
                });
            }
        };

        let entries = (
            shader::find_entry_point(&vs_source, ShaderStage::Vertex),
            shader::find_entry_point(&fs_source, ShaderStage::Fragment),
        );
        let (vertex_entry, fragment_entry) = match entries {
            (Some(v), Some(f)) => (v, f),
            (v, _) => {
                device.discard_stage(vs);
                device.discard_stage(fs);
                let missing = if v.is_none() {
                    ShaderStage::Vertex
                } else {
                    ShaderStage::Fragment
                };
                return Err(Error::ShaderLink {
                    base: base.to_path_buf(),
                    diagnostic: format!(
                        "{missing} stage declares no `{} fn` entry point",
                        missing.attribute()
                    ),
                });
            }
        };

        let id = self.programs.insert(ProgramRecord {
            base_path: base.to_path_buf(),
        });

        let linked = device.link_program(
            id,
            &label,
            LinkStage {
                stage: vs,
                entry_point: &vertex_entry,
            },
            LinkStage {
                stage: fs,
                entry_point: &fragment_entry,
            },
        );
        if let Err(diagnostic) = linked {
            self.programs.remove(id);
            return Err(Error::ShaderLink {
                base: base.to_path_buf(),
                diagnostic,
            });
        }

        log::info!(
            "shader program '{}' loaded (entry points: {vertex_entry}, {fragment_entry})",
            base.display()
        );

        Ok(ShaderProgram {
            id,
            context: self.context,
            base_path: base.to_path_buf(),
            vertex_entry,
            fragment_entry,
        })
    }

    /// Frees a resource. A bound resource is unbound first.
    pub fn release(&mut self, resource: impl Into<Resource>) -> Result<()> {
        match resource.into() {
            Resource::VertexBuffer(VertexBuffer(buffer))
            | Resource::IndexBuffer(IndexBuffer(buffer)) => self.release_buffer(buffer),
            Resource::VertexArray(array) => {
                self.check_owned(array.context, "vertex array")?;
                if self.arrays.remove(array.id).is_none() {
                    return Err(UsageError::StaleResource("vertex array").into());
                }
                self.bindings
                    .forget(BoundResource::VertexArray(array.id));
                Ok(())
            }
            Resource::Program(program) => {
                self.check_owned(program.context, "shader program")?;
                let Some(record) = self.programs.remove(program.id) else {
                    return Err(UsageError::StaleResource("shader program").into());
                };
                self.bindings.forget(BoundResource::Program(program.id));
                if let Some(device) = self.device.as_deref_mut() {
                    device.destroy_program(program.id);
                }
                log::debug!("shader program '{}' released", record.base_path.display());
                Ok(())
            }
        }
    }

    fn release_buffer(&mut self, buffer: Buffer) -> Result<()> {
        self.check_owned(buffer.context, buffer.target.name())?;
        let Some(record) = self.buffers.remove(buffer.id) else {
            return Err(UsageError::StaleResource(buffer.target.name()).into());
        };

        self.bindings.forget(BoundResource::Buffer(buffer.id));
        for array in self.arrays.values_mut() {
            if array.vertex_buffer == Some(buffer.id) {
                array.vertex_buffer = None;
            }
        }
        if let Some(device) = self.device.as_deref_mut() {
            device.destroy_buffer(buffer.id);
        }
        log::trace!("{} {:?} released", record.target.name(), buffer.id);
        Ok(())
    }

    // ── binding discipline ─────────────────────────────────────────────────

    /// True when something is bound to `target`.
    pub fn is_bound(&self, target: BindTarget) -> bool {
        self.bindings.get(target).is_some()
    }

    pub(crate) fn bind_buffer(&mut self, buffer: &Buffer) -> Result<Bound<'_>> {
        self.bind_resource(
            buffer.context,
            buffer.target.bind_target(),
            BoundResource::Buffer(buffer.id),
        )
    }

    pub(crate) fn bind_resource(
        &mut self,
        context: u64,
        target: BindTarget,
        resource: BoundResource,
    ) -> Result<Bound<'_>> {
        self.device()?;
        let name = target.name();
        self.check_owned(context, name)?;

        let alive = match resource {
            BoundResource::Buffer(id) => self.buffers.contains_key(id),
            BoundResource::VertexArray(id) => self.arrays.contains_key(id),
            BoundResource::Program(id) => self.programs.contains_key(id),
        };
        if !alive {
            return Err(UsageError::StaleResource(name).into());
        }

        let previous = self.bindings.set(target, resource);
        Ok(Bound::new(self, target, previous))
    }

    /// Puts back a binding displaced by a guard, unless that resource was released meanwhile.
    pub(crate) fn restore_binding(&mut self, target: BindTarget, previous: Option<BoundResource>) {
        let previous = previous.filter(|resource| match *resource {
            BoundResource::Buffer(id) => self.buffers.contains_key(id),
            BoundResource::VertexArray(id) => self.arrays.contains_key(id),
            BoundResource::Program(id) => self.programs.contains_key(id),
        });
        self.bindings.restore(target, previous);
    }

    /// Declares how the bound vertex buffer's bytes split into attributes, recording the
    /// buffer and layout on the bound vertex array.
    ///
    /// `components[i]` is the scalar count (1..=4) of attribute location `i`.
    pub fn set_attrib_pointers(&mut self, components: &[u32], scalar: ScalarType) -> Result<()> {
        self.device()?;

        let vao = self
            .bindings
            .vertex_array()
            .ok_or(UsageError::NothingBound(BindTarget::VertexArray))?;
        let vbo = self
            .bindings
            .buffer(BindTarget::VertexBuffer)
            .ok_or(UsageError::NothingBound(BindTarget::VertexBuffer))?;

        if components.is_empty() {
            return Err(UsageError::EmptyLayout.into());
        }
        if let Some(&bad) = components.iter().find(|&&c| !(1..=4).contains(&c)) {
            return Err(UsageError::InvalidComponentCount(bad).into());
        }

        let layout = VertexLayout {
            components: components.to_vec(),
            scalar,
        };
        let stride = layout.stride();

        let size = self
            .buffers
            .get(vbo)
            .map(|r| r.size)
            .ok_or(UsageError::StaleResource("vertex buffer"))?;
        if size % stride != 0 {
            return Err(UsageError::LayoutMismatch { size, stride }.into());
        }

        let array = self
            .arrays
            .get_mut(vao)
            .ok_or(UsageError::StaleResource("vertex array"))?;
        array.vertex_buffer = Some(vbo);
        array.layout = Some(layout);

        log::trace!("vertex array {vao:?}: {components:?} x {scalar:?} over {vbo:?}");
        Ok(())
    }

    /// Draws `index_count` indices of `indices` with the bound program and vertex array.
    ///
    /// `indices` is bound to the index-buffer target for the duration of the call. Nothing is
    /// drawn when validation fails; a zero count draws nothing and succeeds.
    pub fn draw_elements(
        &mut self,
        primitive: PrimitiveKind,
        index_count: u32,
        index_type: IndexType,
        indices: &IndexBuffer,
    ) -> Result<()> {
        self.device()?;

        let program = self
            .bindings
            .program()
            .ok_or(UsageError::NothingBound(BindTarget::Program))?;
        let vao = self
            .bindings
            .vertex_array()
            .ok_or(UsageError::NothingBound(BindTarget::VertexArray))?;

        let array = self
            .arrays
            .get(vao)
            .ok_or(UsageError::StaleResource("vertex array"))?;
        let layout = array.layout.as_ref().ok_or(UsageError::MissingLayout)?;
        let vbo = array
            .vertex_buffer
            .filter(|id| self.buffers.contains_key(*id))
            .ok_or(UsageError::StaleResource("vertex buffer"))?;

        let ibo = &indices.0;
        self.check_owned(ibo.context, "index buffer")?;
        let record = self
            .buffers
            .get(ibo.id)
            .ok_or(UsageError::StaleResource("index buffer"))?;

        let width = index_type.size();
        if record.size % width != 0 {
            return Err(UsageError::MisalignedIndexData(index_type.name()).into());
        }
        let available = indices.capacity(index_type);
        if u64::from(index_count) > available {
            return Err(ResourceError::IndexOutOfRange {
                requested: index_count,
                available: u32::try_from(available).unwrap_or(u32::MAX),
            }
            .into());
        }

        let vertex_count = self.buffers.get(vbo).map_or(0, |r| r.size) / layout.stride();
        if let Some(shadow) = &record.shadow {
            for slot in 0..index_count as usize {
                if let Some(index) = index_type.read(shadow, slot)
                    && u64::from(index) >= vertex_count
                {
                    return Err(ResourceError::VertexOutOfRange {
                        index,
                        vertex_count: u32::try_from(vertex_count).unwrap_or(u32::MAX),
                    }
                    .into());
                }
            }
        }

        if index_count == 0 {
            return Ok(());
        }

        let draw = DrawCall {
            program,
            vertex_buffer: vbo,
            layout,
            index_buffer: ibo.id,
            index_type,
            index_count,
            primitive,
            viewport: self.viewport,
        };

        let previous = self
            .bindings
            .set(BindTarget::IndexBuffer, BoundResource::Buffer(ibo.id));
        let result = match self.device.as_deref_mut() {
            Some(device) => device.draw_indexed(&draw),
            None => Err(ContextError::Lost.into()),
        };
        self.restore_binding(BindTarget::IndexBuffer, previous);

        self.settle(result)?;
        self.stats.draw_calls += 1;
        Ok(())
    }

    // ── internals ──────────────────────────────────────────────────────────

    fn device(&mut self) -> Result<&mut dyn RenderDevice> {
        match self.device.as_deref_mut() {
            Some(device) => Ok(device),
            None if self.pending.is_some() => Err(ContextError::Unbound.into()),
            None => Err(ContextError::Lost.into()),
        }
    }

    fn check_owned(&self, context: u64, what: &'static str) -> Result<()> {
        if context != self.context {
            return Err(UsageError::ForeignResource(what).into());
        }
        Ok(())
    }

    /// Marks the context lost when `result` carries a fatal error.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_fatal()
            && self.device.take().is_some()
        {
            log::error!("graphics context {} lost: {err}", self.context);
        }
        result
    }
}

impl Drop for GraphicsModule {
    fn drop(&mut self) {
        let leaked = self.buffers.len() + self.arrays.len() + self.programs.len();
        if leaked > 0 {
            log::debug!(
                "graphics context {} dropped with {leaked} unreleased resources \
                 ({} buffers, {} vertex arrays, {} programs)",
                self.context,
                self.buffers.len(),
                self.arrays.len(),
                self.programs.len()
            );
        }
    }
}

impl fmt::Debug for GraphicsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsModule")
            .field("context", &self.context)
            .field("backend", &self.backend)
            .field("unbound", &self.is_unbound())
            .field("lost", &self.is_lost())
            .field("clear_color", &self.clear_color)
            .field("vsync", &self.vsync)
            .field("viewport", &self.viewport)
            .field("bindings", &self.bindings.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
