//! Error taxonomy shared by every subsystem.
//!
//! Construction-time failures (window build, module extraction, shader load, buffer
//! allocation) are returned synchronously. Backend internals build `anyhow` chains and are
//! flattened into these variants at the seam.

use std::path::PathBuf;

use thiserror::Error;

use crate::graphics::{BindTarget, ShaderStage};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// A stage source was missing, unreadable, or rejected by the compiler.
    #[error("failed to compile {stage} stage `{}`:\n{diagnostic}", .path.display())]
    ShaderCompile {
        stage: ShaderStage,
        path: PathBuf,
        diagnostic: String,
    },

    /// Every stage compiled but the program could not be assembled.
    #[error("failed to link shader program `{}`:\n{diagnostic}", .base.display())]
    ShaderLink { base: PathBuf, diagnostic: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl Error {
    /// Returns true when the failure invalidated the window or the graphics context.
    ///
    /// The frame loop must stop issuing graphics calls after a fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Context(ContextError::Lost) | Error::Context(ContextError::Surface(_))
        )
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to initialize the platform event loop: {0}")]
    EventLoop(String),

    #[error("failed to allocate native window: {0}")]
    WindowCreation(String),

    #[error("failed to query attached screens: {0}")]
    ScreenQuery(String),

    #[error("window has not been built")]
    NotBuilt,

    #[error("window has been closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("graphics module is not attached to a surface yet; build its window first")]
    Unbound,

    #[error("window already has a `{bound}` module bound; cannot bind `{requested}`")]
    KindMismatch {
        bound: &'static str,
        requested: &'static str,
    },

    #[error("failed to create graphics context: {0}")]
    Creation(String),

    #[error("surface failure: {0}")]
    Surface(String),

    /// The owning window was destroyed or the device reported a fatal error.
    #[error("graphics context is lost")]
    Lost,

    /// A weak module reference outlived its module.
    #[error("graphics module is no longer alive")]
    Stale,

    #[error("graphics module is already borrowed")]
    Busy,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("allocation of {requested} bytes failed: {reason}")]
    AllocationFailed { requested: u64, reason: String },

    #[error("zero-sized buffers are not allowed")]
    ZeroSized,

    #[error("initial data ({len} bytes) exceeds buffer size ({size} bytes)")]
    InitialDataTooLarge { len: u64, size: u64 },

    #[error("write of {len} bytes at offset {offset} exceeds buffer size ({size} bytes)")]
    WriteOutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("draw requests {requested} indices but the index buffer holds {available}")]
    IndexOutOfRange { requested: u32, available: u32 },

    #[error("index {index} references past the {vertex_count} vertices of the bound buffer")]
    VertexOutOfRange { index: u32, vertex_count: u32 },
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("nothing is bound to the {0} target")]
    NothingBound(BindTarget),

    #[error("vertex array has no attribute layout; call set_attrib_pointers first")]
    MissingLayout,

    #[error("attribute component count {0} is outside 1..=4")]
    InvalidComponentCount(u32),

    #[error("attribute layout is empty")]
    EmptyLayout,

    #[error("vertex buffer of {size} bytes is not a whole number of {stride}-byte vertices")]
    LayoutMismatch { size: u64, stride: u64 },

    #[error("{0} handle belongs to a different graphics context")]
    ForeignResource(&'static str),

    #[error("{0} handle refers to a released resource")]
    StaleResource(&'static str),

    #[error("index buffer size is not a multiple of the {0} index width")]
    MisalignedIndexData(&'static str),

    #[error("buffer write offset {0} is not a multiple of 4")]
    UnalignedOffset(u64),

    #[error("buffer write of {0} bytes is not a multiple of 4 and does not end at the buffer end")]
    UnalignedLength(u64),
}
