//! Backend seam of the graphics module.
//!
//! `GraphicsModule` owns the resource bookkeeping (handles, bindings, layouts, bounds
//! checks) and forwards validated work to a `RenderDevice`:
//! - `WgpuDevice` renders into a window surface through wgpu
//! - `HeadlessDevice` keeps buffers in memory and counts frames (no GPU needed)

mod headless;
mod surface;
mod gpu;

use crate::error::Result;

use super::resources::{BufferId, BufferTarget, ProgramId, StageId, VertexLayout};
use super::shader::ShaderStage;
use super::types::{BufferUsage, ClearMask, ColorRgba, IndexType, PrimitiveKind, Viewport};

pub use headless::HeadlessDevice;
pub use gpu::WgpuDevice;

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc {
    pub target: BufferTarget,
    /// Requested size in bytes. Backends may allocate more but must report this value.
    pub size: u64,
    pub usage: BufferUsage,
}

/// Stage handed to `link_program`.
#[derive(Debug, Copy, Clone)]
pub struct LinkStage<'a> {
    pub stage: StageId,
    pub entry_point: &'a str,
}

/// A fully validated indexed draw.
#[derive(Debug)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    pub layout: &'a VertexLayout,
    pub index_buffer: BufferId,
    pub index_type: IndexType,
    pub index_count: u32,
    pub primitive: PrimitiveKind,
    pub viewport: Viewport,
}

/// Work a graphics backend performs on behalf of `GraphicsModule`.
///
/// Ids are allocated by the module; the device keys its own objects by them. Inputs are
/// already validated (bindings, bounds, ownership), so devices only report failures of
/// their own.
pub trait RenderDevice {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    fn surface_size(&self) -> (u32, u32);

    /// Follows a window resize. Zero sizes are recorded but leave the surface untouched.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Switches presentation sync. Returns false when the mode is unsupported.
    fn set_vsync(&mut self, enabled: bool) -> bool;

    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc) -> Result<()>;

    /// Copies `data` into the buffer at `offset`. The range is within bounds.
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    fn destroy_buffer(&mut self, id: BufferId);

    /// Compiles one stage, returning the compiler diagnostic on failure.
    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> std::result::Result<StageId, String>;

    fn discard_stage(&mut self, stage: StageId);

    /// Assembles two compiled stages into program `id`.
    ///
    /// Both stages are consumed, whether linking succeeds or not. `label` names the program in
    /// errors the device reports later, when it builds pipelines for it.
    fn link_program(
        &mut self,
        id: ProgramId,
        label: &str,
        vertex: LinkStage<'_>,
        fragment: LinkStage<'_>,
    ) -> std::result::Result<(), String>;

    fn destroy_program(&mut self, id: ProgramId);

    /// Resets the buffers selected by `mask` on the current frame.
    fn clear(&mut self, mask: ClearMask, color: ColorRgba) -> Result<()>;

    fn draw_indexed(&mut self, draw: &DrawCall<'_>) -> Result<()>;

    /// Submits the current frame and presents it, honoring vsync.
    fn present(&mut self) -> Result<()>;
}
