use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use super::module::GraphicsModule;
use super::resources::{BufferId, ProgramId, VertexArrayId};

/// Binding points of a graphics module. Each holds at most one resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindTarget {
    VertexBuffer,
    IndexBuffer,
    VertexArray,
    Program,
}

impl BindTarget {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            BindTarget::VertexBuffer => "vertex buffer",
            BindTarget::IndexBuffer => "index buffer",
            BindTarget::VertexArray => "vertex array",
            BindTarget::Program => "shader program",
        }
    }
}

impl fmt::Display for BindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum BoundResource {
    Buffer(BufferId),
    VertexArray(VertexArrayId),
    Program(ProgramId),
}

#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    slots: HashMap<BindTarget, BoundResource>,
}

impl BindingTable {
    pub(crate) fn get(&self, target: BindTarget) -> Option<BoundResource> {
        self.slots.get(&target).copied()
    }

    pub(crate) fn buffer(&self, target: BindTarget) -> Option<BufferId> {
        match self.get(target)? {
            BoundResource::Buffer(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn vertex_array(&self) -> Option<VertexArrayId> {
        match self.get(BindTarget::VertexArray)? {
            BoundResource::VertexArray(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn program(&self) -> Option<ProgramId> {
        match self.get(BindTarget::Program)? {
            BoundResource::Program(id) => Some(id),
            _ => None,
        }
    }

    /// Binds `resource`, returning what the slot held before.
    pub(crate) fn set(
        &mut self,
        target: BindTarget,
        resource: BoundResource,
    ) -> Option<BoundResource> {
        self.slots.insert(target, resource)
    }

    /// Puts `previous` back into `target`, or empties the slot.
    pub(crate) fn restore(&mut self, target: BindTarget, previous: Option<BoundResource>) {
        match previous {
            Some(resource) => {
                self.slots.insert(target, resource);
            }
            None => {
                self.slots.remove(&target);
            }
        }
    }

    /// Empties every slot holding `resource`.
    pub(crate) fn forget(&mut self, resource: BoundResource) {
        self.slots.retain(|_, bound| *bound != resource);
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Scoped binding.
///
/// While alive, the resource is bound to its target and the module is reachable through
/// `Deref`/`DerefMut`. Dropping the guard restores whatever the target held before, so
/// nested binds unwind in order and no binding leaks past its scope.
///
/// ```ignore
/// let mut gm = module.borrow_mut();
/// let mut vao = vertex_array.bind(&mut gm)?;
/// let mut vbo = vertex_buffer.bind(&mut vao)?;
/// vbo.set_attrib_pointers(&[3, 4], ScalarType::F32)?;
/// ```
#[must_use = "the binding is undone as soon as the guard is dropped"]
pub struct Bound<'m> {
    module: &'m mut GraphicsModule,
    target: BindTarget,
    previous: Option<BoundResource>,
}

impl<'m> Bound<'m> {
    pub(crate) fn new(
        module: &'m mut GraphicsModule,
        target: BindTarget,
        previous: Option<BoundResource>,
    ) -> Self {
        Self {
            module,
            target,
            previous,
        }
    }

    pub fn target(&self) -> BindTarget {
        self.target
    }

    /// Ends the scope early.
    pub fn unbind(self) {}
}

impl Deref for Bound<'_> {
    type Target = GraphicsModule;

    fn deref(&self) -> &GraphicsModule {
        self.module
    }
}

impl DerefMut for Bound<'_> {
    fn deref_mut(&mut self) -> &mut GraphicsModule {
        self.module
    }
}

impl Drop for Bound<'_> {
    fn drop(&mut self) {
        self.module.restore_binding(self.target, self.previous);
    }
}

impl fmt::Debug for Bound<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("target", &self.target)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    #[test]
    fn set_and_restore_round_trip() {
        let mut ids: SlotMap<BufferId, ()> = SlotMap::with_key();
        let a = BoundResource::Buffer(ids.insert(()));
        let b = BoundResource::Buffer(ids.insert(()));

        let mut table = BindingTable::default();
        assert_eq!(table.set(BindTarget::VertexBuffer, a), None);
        let prev = table.set(BindTarget::VertexBuffer, b);
        assert_eq!(prev, Some(a));

        table.restore(BindTarget::VertexBuffer, prev);
        assert_eq!(table.get(BindTarget::VertexBuffer), Some(a));

        table.restore(BindTarget::VertexBuffer, None);
        assert_eq!(table.get(BindTarget::VertexBuffer), None);
    }

    #[test]
    fn forget_clears_every_slot_holding_resource() {
        let mut ids: SlotMap<BufferId, ()> = SlotMap::with_key();
        let a = BoundResource::Buffer(ids.insert(()));
        let b = BoundResource::Buffer(ids.insert(()));

        let mut table = BindingTable::default();
        table.set(BindTarget::VertexBuffer, a);
        table.set(BindTarget::IndexBuffer, b);

        table.forget(a);
        assert_eq!(table.buffer(BindTarget::VertexBuffer), None);
        assert_eq!(table.buffer(BindTarget::IndexBuffer), Some(match b {
            BoundResource::Buffer(id) => id,
            _ => unreachable!(),
        }));
        assert_eq!(table.len(), 1);
    }
}
