//! Graphics context module and GPU resource objects.
//!
//! A [`GraphicsModule`] is extracted from a built window and is the factory for vertex and
//! index buffers, vertex arrays (vertex-layout objects) and shader programs. Resources are
//! bound through scoped [`Bound`] guards; draws are validated against the binding table
//! before anything reaches the [`device::RenderDevice`].

mod binding;
pub mod device;
mod init;
mod kind;
mod module;
mod resources;
mod shader;
mod types;

pub use binding::{BindTarget, Bound};
pub use init::GraphicsInit;
pub use kind::{ModuleKind, ModuleRef, WeakModuleRef};
pub(crate) use kind::ModuleSlot;
pub use module::{FrameStats, GraphicsModule};
pub use resources::{
    Buffer, BufferId, BufferTarget, IndexBuffer, ProgramId, Resource, ShaderProgram, StageId,
    VertexArray, VertexArrayId, VertexBuffer, VertexLayout,
};
pub use shader::{ShaderStage, stage_path};
pub use types::{
    BufferUsage, ClearMask, ColorRgba, IndexType, PrimitiveKind, ScalarType, Viewport,
};
