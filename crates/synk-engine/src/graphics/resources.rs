use std::path::{Path, PathBuf};

use slotmap::new_key_type;

use crate::error::Result;

use super::binding::{BindTarget, Bound, BoundResource};
use super::module::GraphicsModule;
use super::shader::ShaderStage;
use super::types::{BufferUsage, IndexType, ScalarType};

new_key_type! {
    pub struct BufferId;
    pub struct VertexArrayId;
    pub struct ProgramId;
    /// A compiled but not yet linked shader stage, owned by the device.
    pub struct StageId;
}

/// Which binding point a buffer was created for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

impl BufferTarget {
    pub(crate) fn bind_target(self) -> BindTarget {
        match self {
            BufferTarget::Vertex => BindTarget::VertexBuffer,
            BufferTarget::Index => BindTarget::IndexBuffer,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            BufferTarget::Vertex => "vertex buffer",
            BufferTarget::Index => "index buffer",
        }
    }
}

/// GPU buffer handle shared by vertex and index buffers.
///
/// Handles are not `Clone`: one handle owns one resource and gives it back through
/// [`GraphicsModule::release`].
#[derive(Debug)]
pub struct Buffer {
    pub(crate) id: BufferId,
    pub(crate) context: u64,
    pub(crate) target: BufferTarget,
    pub(crate) size: u64,
    pub(crate) usage: BufferUsage,
}

impl Buffer {
    /// Size in bytes, exactly as requested at creation.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }
}

/// Buffer holding per-vertex attribute data.
#[derive(Debug)]
pub struct VertexBuffer(pub(crate) Buffer);

/// Buffer holding primitive indices.
#[derive(Debug)]
pub struct IndexBuffer(pub(crate) Buffer);

impl VertexBuffer {
    pub fn bind<'m>(&self, module: &'m mut GraphicsModule) -> Result<Bound<'m>> {
        module.bind_buffer(&self.0)
    }
}

impl IndexBuffer {
    pub fn bind<'m>(&self, module: &'m mut GraphicsModule) -> Result<Bound<'m>> {
        module.bind_buffer(&self.0)
    }

    /// Number of whole indices of `index_type` the buffer can hold.
    pub fn capacity(&self, index_type: IndexType) -> u64 {
        self.0.size / index_type.size()
    }
}

impl std::ops::Deref for VertexBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.0
    }
}

impl std::ops::Deref for IndexBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.0
    }
}

impl AsRef<Buffer> for VertexBuffer {
    fn as_ref(&self) -> &Buffer {
        &self.0
    }
}

impl AsRef<Buffer> for IndexBuffer {
    fn as_ref(&self) -> &Buffer {
        &self.0
    }
}

/// Vertex-layout object: records which vertex buffer feeds a draw and how its bytes split
/// into attributes.
#[derive(Debug)]
pub struct VertexArray {
    pub(crate) id: VertexArrayId,
    pub(crate) context: u64,
}

impl VertexArray {
    pub fn bind<'m>(&self, module: &'m mut GraphicsModule) -> Result<Bound<'m>> {
        module.bind_resource(
            self.context,
            BindTarget::VertexArray,
            BoundResource::VertexArray(self.id),
        )
    }
}

/// A linked vertex + fragment program.
#[derive(Debug)]
pub struct ShaderProgram {
    pub(crate) id: ProgramId,
    pub(crate) context: u64,
    pub(crate) base_path: PathBuf,
    pub(crate) vertex_entry: String,
    pub(crate) fragment_entry: String,
}

impl ShaderProgram {
    pub fn bind<'m>(&self, module: &'m mut GraphicsModule) -> Result<Bound<'m>> {
        module.bind_resource(
            self.context,
            BindTarget::Program,
            BoundResource::Program(self.id),
        )
    }

    /// Path the stage files were resolved from, without suffix.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Name of the function used as the entry point of `stage`.
    pub fn entry_point(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex_entry,
            ShaderStage::Fragment => &self.fragment_entry,
        }
    }
}

/// Any releasable resource handle.
#[derive(Debug)]
pub enum Resource {
    VertexBuffer(VertexBuffer),
    IndexBuffer(IndexBuffer),
    VertexArray(VertexArray),
    Program(ShaderProgram),
}

impl From<VertexBuffer> for Resource {
    fn from(value: VertexBuffer) -> Self {
        Resource::VertexBuffer(value)
    }
}

impl From<IndexBuffer> for Resource {
    fn from(value: IndexBuffer) -> Self {
        Resource::IndexBuffer(value)
    }
}

impl From<VertexArray> for Resource {
    fn from(value: VertexArray) -> Self {
        Resource::VertexArray(value)
    }
}

impl From<ShaderProgram> for Resource {
    fn from(value: ShaderProgram) -> Self {
        Resource::Program(value)
    }
}

/// Attribute layout recorded on a vertex array.
///
/// Attributes are tightly packed in declaration order and numbered from location 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub components: Vec<u32>,
    pub scalar: ScalarType,
}

impl VertexLayout {
    /// Bytes per vertex.
    pub fn stride(&self) -> u64 {
        self.components.iter().map(|&c| u64::from(c)).sum::<u64>() * self.scalar.size()
    }

    /// `(location, byte offset, component count)` for every attribute.
    pub fn attributes(&self) -> impl Iterator<Item = (u32, u64, u32)> + '_ {
        let scalar = self.scalar.size();
        self.components
            .iter()
            .scan(0u64, move |offset, &count| {
                let at = *offset;
                *offset += u64::from(count) * scalar;
                Some((at, count))
            })
            .zip(0u32..)
            .map(|((offset, count), location)| (location, offset, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_stride_and_offsets() {
        let layout = VertexLayout {
            components: vec![3, 4],
            scalar: ScalarType::F32,
        };

        assert_eq!(layout.stride(), 28);
        let attrs: Vec<_> = layout.attributes().collect();
        assert_eq!(attrs, vec![(0, 0, 3), (1, 12, 4)]);
    }
}
