use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ContextError, Result};
use crate::platform::SurfaceTarget;

/// A module that can be bound to a window surface through `SynkWindow::extract`.
///
/// Modules are created unbound and attached to the surface once the window exists, so
/// extracting before `build` hands out the same instance that later renders.
pub trait ModuleKind: Sized + 'static {
    /// Creation parameters; `extract` uses `Default`.
    type Init: Default;

    /// Name reported in kind-mismatch errors.
    const NAME: &'static str;

    /// Creates the module without a surface.
    fn unbound(init: Self::Init) -> Self;

    /// Binds the module to the window surface.
    ///
    /// A failed attach must leave the module unbound so a later `build` can retry. Attaching
    /// an already attached module does nothing.
    fn attach(&mut self, target: &SurfaceTarget) -> Result<()>;

    /// The window's client area changed size. Runs before listeners see the event.
    fn surface_resized(&mut self, width: u32, height: u32);

    /// The owning window is being destroyed.
    fn invalidate(&mut self);
}

/// Shared handle to a window's module.
///
/// Every `extract` on the same window hands out a clone of the same allocation.
pub struct ModuleRef<M>(Rc<RefCell<M>>);

impl<M> ModuleRef<M> {
    pub fn borrow(&self) -> Ref<'_, M> {
        self.0.borrow()
    }

    /// Panics when the module is already borrowed; see [`try_borrow_mut`](Self::try_borrow_mut).
    pub fn borrow_mut(&self) -> RefMut<'_, M> {
        self.0.borrow_mut()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, M>> {
        self.0.try_borrow_mut().map_err(|_| ContextError::Busy.into())
    }

    /// Non-owning handle for listeners and other long-lived captures.
    pub fn downgrade(&self) -> WeakModuleRef<M> {
        WeakModuleRef(Rc::downgrade(&self.0))
    }

    /// True when both handles refer to the same module instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<M> Clone for ModuleRef<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<M> fmt::Debug for ModuleRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleRef")
            .field(&Rc::as_ptr(&self.0))
            .finish()
    }
}

/// Weak counterpart of [`ModuleRef`].
pub struct WeakModuleRef<M>(Weak<RefCell<M>>);

impl<M> WeakModuleRef<M> {
    /// Runs `f` on the module.
    ///
    /// Fails with `ContextError::Stale` when every strong handle is gone and with
    /// `ContextError::Busy` when the module is currently borrowed.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut M) -> Result<R>) -> Result<R> {
        let module = self.0.upgrade().ok_or(ContextError::Stale)?;
        let mut module = module.try_borrow_mut().map_err(|_| ContextError::Busy)?;
        f(&mut module)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl<M> Clone for WeakModuleRef<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<M> fmt::Debug for WeakModuleRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakModuleRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Type-erased window callbacks into a bound module.
trait ModuleHooks {
    fn attach(&self, target: &SurfaceTarget) -> Result<()>;
    fn surface_resized(&self, width: u32, height: u32);
    fn invalidate(&self);
}

impl<M: ModuleKind> ModuleHooks for RefCell<M> {
    fn attach(&self, target: &SurfaceTarget) -> Result<()> {
        self.try_borrow_mut()
            .map_err(|_| ContextError::Busy)?
            .attach(target)
    }

    fn surface_resized(&self, width: u32, height: u32) {
        match self.try_borrow_mut() {
            Ok(mut module) => module.surface_resized(width, height),
            Err(_) => log::warn!("{} busy during resize; surface not resized", M::NAME),
        }
    }

    fn invalidate(&self) {
        match self.try_borrow_mut() {
            Ok(mut module) => module.invalidate(),
            Err(_) => log::warn!("{} still borrowed while its window is destroyed", M::NAME),
        }
    }
}

/// The module bound to a window, stored without its concrete type.
pub(crate) struct ModuleSlot {
    name: &'static str,
    any: Rc<dyn Any>,
    hooks: Rc<dyn ModuleHooks>,
}

impl ModuleSlot {
    pub(crate) fn new<M: ModuleKind>(module: M) -> (Self, ModuleRef<M>) {
        let rc = Rc::new(RefCell::new(module));
        let slot = Self {
            name: M::NAME,
            any: rc.clone(),
            hooks: rc.clone(),
        };
        (slot, ModuleRef(rc))
    }

    pub(crate) fn get<M: ModuleKind>(&self) -> Result<ModuleRef<M>> {
        match self.any.clone().downcast::<RefCell<M>>() {
            Ok(rc) => Ok(ModuleRef(rc)),
            Err(_) => Err(ContextError::KindMismatch {
                bound: self.name,
                requested: M::NAME,
            }
            .into()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn attach(&self, target: &SurfaceTarget) -> Result<()> {
        self.hooks.attach(target)
    }

    pub(crate) fn surface_resized(&self, width: u32, height: u32) {
        self.hooks.surface_resized(width, height);
    }

    pub(crate) fn invalidate(&self) {
        self.hooks.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        target: Option<(u32, u32)>,
        resized: Option<(u32, u32)>,
        invalidated: bool,
    }

    impl ModuleKind for Recorder {
        type Init = ();
        const NAME: &'static str = "Recorder";

        fn unbound(_init: ()) -> Self {
            Self::default()
        }

        fn attach(&mut self, target: &SurfaceTarget) -> Result<()> {
            self.target = Some(target.size());
            Ok(())
        }

        fn surface_resized(&mut self, width: u32, height: u32) {
            self.resized = Some((width, height));
        }

        fn invalidate(&mut self) {
            self.invalidated = true;
        }
    }

    struct Other;

    impl ModuleKind for Other {
        type Init = ();
        const NAME: &'static str = "Other";

        fn unbound(_init: ()) -> Self {
            Other
        }

        fn attach(&mut self, _target: &SurfaceTarget) -> Result<()> {
            Ok(())
        }

        fn surface_resized(&mut self, _width: u32, _height: u32) {}

        fn invalidate(&mut self) {}
    }

    #[test]
    fn slot_returns_same_instance() {
        let (slot, first) = ModuleSlot::new(Recorder::unbound(()));
        let second = slot.get::<Recorder>().unwrap();
        assert!(ModuleRef::ptr_eq(&first, &second));
    }

    #[test]
    fn slot_rejects_other_kind() {
        let (slot, _module) = ModuleSlot::new(Recorder::unbound(()));
        let err = slot.get::<Other>().unwrap_err();
        assert!(matches!(
            err,
            Error::Context(ContextError::KindMismatch {
                bound: "Recorder",
                requested: "Other"
            })
        ));
    }

    #[test]
    fn hooks_reach_the_module() {
        let (slot, module) = ModuleSlot::new(Recorder::unbound(()));
        slot.attach(&SurfaceTarget::Offscreen { width: 320, height: 200 })
            .unwrap();
        slot.surface_resized(640, 480);
        slot.invalidate();

        let m = module.borrow();
        assert_eq!(m.target, Some((320, 200)));
        assert_eq!(m.resized, Some((640, 480)));
        assert!(m.invalidated);
    }

    #[test]
    fn attach_while_borrowed_is_busy() {
        let (slot, module) = ModuleSlot::new(Recorder::unbound(()));
        let _held = module.borrow_mut();
        let err = slot
            .attach(&SurfaceTarget::Offscreen { width: 1, height: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::Context(ContextError::Busy)));
    }

    #[test]
    fn weak_ref_reports_stale_and_busy() {
        let (slot, module) = ModuleSlot::new(Recorder::unbound(()));
        let weak = module.downgrade();

        {
            let _held = module.borrow_mut();
            let err = weak.with_mut(|_| Ok(())).unwrap_err();
            assert!(matches!(err, Error::Context(ContextError::Busy)));
        }

        weak.with_mut(|m| {
            m.resized = Some((1, 2));
            Ok(())
        })
        .unwrap();

        drop(slot);
        drop(module);
        assert!(!weak.is_alive());
        let err = weak.with_mut(|_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::Context(ContextError::Stale)));
    }
}
