use std::collections::HashSet;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::{ContextError, ResourceError, Result};
use crate::graphics::resources::{BufferId, ProgramId, StageId};
use crate::graphics::shader::{self, ShaderStage};
use crate::graphics::types::{ClearMask, ColorRgba};

use super::{BufferDesc, DrawCall, LinkStage, RenderDevice};

struct Stage {
    kind: ShaderStage,
    source: String,
}

/// In-memory device.
///
/// Buffers are plain byte vectors, shaders get a structural check instead of a real
/// compile, and frames are only counted. Used for offscreen targets and tests.
pub struct HeadlessDevice {
    size: (u32, u32),
    vsync: bool,
    max_buffer_size: u64,
    buffers: SecondaryMap<BufferId, Vec<u8>>,
    stages: SlotMap<StageId, Stage>,
    programs: HashSet<ProgramId>,
    last_clear: Option<ColorRgba>,
    frame_draws: u32,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32, vsync: bool, max_buffer_size: u64) -> Self {
        log::info!("headless graphics device ({width}x{height})");
        Self {
            size: (width, height),
            vsync,
            max_buffer_size,
            buffers: SecondaryMap::new(),
            stages: SlotMap::with_key(),
            programs: HashSet::new(),
            last_clear: None,
            frame_draws: 0,
        }
    }
}

impl RenderDevice for HeadlessDevice {
    fn backend(&self) -> &'static str {
        "headless"
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn set_vsync(&mut self, enabled: bool) -> bool {
        self.vsync = enabled;
        true
    }

    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc) -> Result<()> {
        if desc.size > self.max_buffer_size {
            return Err(ResourceError::AllocationFailed {
                requested: desc.size,
                reason: format!("exceeds the {} byte buffer limit", self.max_buffer_size),
            }
            .into());
        }

        let len = usize::try_from(desc.size).map_err(|_| ResourceError::AllocationFailed {
            requested: desc.size,
            reason: "size does not fit in host memory".into(),
        })?;

        self.buffers.insert(id, vec![0; len]);
        Ok(())
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let Some(bytes) = self.buffers.get_mut(id) else {
            return Err(ContextError::Lost.into());
        };

        let start = offset as usize;
        let size = bytes.len() as u64;
        match bytes.get_mut(start..start + data.len()) {
            Some(dst) => {
                dst.copy_from_slice(data);
                Ok(())
            }
            None => Err(ResourceError::WriteOutOfBounds {
                offset,
                len: data.len() as u64,
                size,
            }
            .into()),
        }
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(id);
    }

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> std::result::Result<StageId, String> {
        shader::check_structure(source)?;
        log::trace!("headless: accepted {stage} stage '{label}'");
        Ok(self.stages.insert(Stage {
            kind: stage,
            source: source.to_string(),
        }))
    }

    fn discard_stage(&mut self, stage: StageId) {
        self.stages.remove(stage);
    }

    fn link_program(
        &mut self,
        id: ProgramId,
        _label: &str,
        vertex: LinkStage<'_>,
        fragment: LinkStage<'_>,
    ) -> std::result::Result<(), String> {
        let vs = self.stages.remove(vertex.stage);
        let fs = self.stages.remove(fragment.stage);

        for (stage, expected, link) in [
            (vs, ShaderStage::Vertex, vertex),
            (fs, ShaderStage::Fragment, fragment),
        ] {
            let Some(stage) = stage else {
                return Err(format!("{expected} stage was not compiled by this device"));
            };
            if stage.kind != expected {
                return Err(format!("{} stage supplied as {expected} stage", stage.kind));
            }
            if shader::find_entry_point(&stage.source, expected).as_deref()
                != Some(link.entry_point)
            {
                return Err(format!(
                    "{expected} entry point `{}` not found",
                    link.entry_point
                ));
            }
        }

        self.programs.insert(id);
        Ok(())
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
    }

    fn clear(&mut self, mask: ClearMask, color: ColorRgba) -> Result<()> {
        if mask.contains(ClearMask::COLOR) {
            self.last_clear = Some(color);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, draw: &DrawCall<'_>) -> Result<()> {
        let known = self.programs.contains(&draw.program)
            && self.buffers.contains_key(draw.vertex_buffer)
            && self.buffers.contains_key(draw.index_buffer);
        if !known {
            return Err(ContextError::Lost.into());
        }

        self.frame_draws += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        log::trace!(
            "headless: presented frame (draws: {}, clear: {:?}, vsync: {})",
            self.frame_draws,
            self.last_clear,
            self.vsync
        );
        self.frame_draws = 0;
        Ok(())
    }
}
