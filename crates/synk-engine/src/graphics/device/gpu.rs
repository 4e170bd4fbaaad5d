use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;
use slotmap::{SecondaryMap, SlotMap};

use crate::error::{ContextError, Error, ResourceError, Result};
use crate::graphics::init::GraphicsInit;
use crate::graphics::resources::{BufferId, BufferTarget, ProgramId, StageId, VertexLayout};
use crate::graphics::shader::ShaderStage;
use crate::graphics::types::{ClearMask, ColorRgba, IndexType, PrimitiveKind, ScalarType};
use crate::platform::SurfaceHandle;

use super::surface::{self, SurfaceErrorAction};
use super::{BufferDesc, DrawCall, LinkStage, RenderDevice};

/// One acquired surface texture and the commands recorded into it.
///
/// Holding the surface texture blocks acquisition of the next one, so a frame lives from
/// the first clear or draw until `present`.
struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct LinkedProgram {
    label: String,
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    layout: VertexLayout,
    primitive: PrimitiveKind,
    index_type: IndexType,
}

/// wgpu device presenting into a window surface.
///
/// Owns Instance/Adapter/Device/Queue and the configured surface. Render pipelines are
/// built lazily per (program, vertex layout, primitive) and cached.
pub struct WgpuDevice {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    _adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
    size: (u32, u32),

    pipeline_layout: wgpu::PipelineLayout,
    buffers: SecondaryMap<BufferId, GpuBuffer>,
    stages: SlotMap<StageId, wgpu::ShaderModule>,
    programs: SecondaryMap<ProgramId, LinkedProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Pipelines the device refused to link, with the validation message.
    rejected: HashMap<PipelineKey, String>,

    frame: Option<Frame>,
    skip_frame: bool,
    /// The last acquire reported a lost surface; a second loss in a row is fatal.
    surface_lost: bool,
    warned_depth_stencil: bool,

    /// Set from the error and device-lost callbacks when the device cannot continue.
    fatal: Arc<AtomicBool>,
}

impl WgpuDevice {
    /// Creates the device and configures a surface for `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; callers block on it.
    pub async fn new(
        window: SurfaceHandle,
        width: u32,
        height: u32,
        init: &GraphicsInit,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("synk device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let fatal = Arc::new(AtomicBool::new(false));
        {
            let fatal = fatal.clone();
            device.on_uncaptured_error(Arc::new(move |err| {
                if matches!(err, wgpu::Error::OutOfMemory { .. }) {
                    fatal.store(true, Ordering::Release);
                }
                log::error!("wgpu: {err}");
            }));
        }
        device.set_device_lost_callback(mark_lost_on_device_loss(fatal.clone()));

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps, init.alpha_mode);
        let present_mode = surface::choose_present_mode(&caps.present_modes, init.vsync)
            .unwrap_or_else(|| {
                log::warn!("unsynced presentation unsupported; using vsync");
                wgpu::PresentMode::Fifo
            });

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("synk pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        Ok(Self {
            _instance: instance,
            surface,
            _adapter: adapter,
            device,
            queue,
            config,
            present_modes: caps.present_modes,
            size: (width, height),
            pipeline_layout,
            buffers: SecondaryMap::new(),
            stages: SlotMap::with_key(),
            programs: SecondaryMap::new(),
            pipelines: HashMap::new(),
            rejected: HashMap::new(),
            frame: None,
            skip_frame: false,
            surface_lost: false,
            warned_depth_stencil: false,
            fatal,
        })
    }

    fn check_device(&self) -> Result<()> {
        if self.fatal.load(Ordering::Acquire) {
            return Err(ContextError::Lost.into());
        }
        Ok(())
    }

    fn reconfigure(&mut self) {
        let (width, height) = self.size;
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquires the frame's surface texture on first use.
    ///
    /// Returns false when this frame is skipped (minimized window, transient surface error).
    fn ensure_frame(&mut self) -> Result<bool> {
        self.check_device()?;

        if self.frame.is_some() {
            return Ok(true);
        }
        if self.skip_frame || self.size.0 == 0 || self.size.1 == 0 {
            self.skip_frame = true;
            return Ok(false);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => {
                self.surface_lost = false;
                t
            }
            Err(err) => {
                self.skip_frame = true;
                let action = surface::classify_surface_error(&err, self.surface_lost);
                self.surface_lost = err == wgpu::SurfaceError::Lost;
                return match action {
                    SurfaceErrorAction::Reconfigured => {
                        log::debug!("surface {err}; reconfiguring");
                        self.reconfigure();
                        Ok(false)
                    }
                    SurfaceErrorAction::SkipFrame => {
                        log::debug!("surface {err}; skipping frame");
                        Ok(false)
                    }
                    SurfaceErrorAction::Fatal => Err(ContextError::Surface(err.to_string()).into()),
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("synk frame encoder"),
            });

        self.frame = Some(Frame {
            surface_texture,
            view,
            encoder,
        });
        Ok(true)
    }

    /// Builds the pipeline for `key`, surfacing link-time validation failures as
    /// `Error::ShaderLink`. Rejected combinations are remembered and fail fast afterwards.
    fn ensure_pipeline(&mut self, key: &PipelineKey) -> Result<()> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }

        let Some(program) = self.programs.get(key.program) else {
            return Err(ContextError::Lost.into());
        };
        if let Some(diagnostic) = self.rejected.get(key) {
            return Err(link_error(&program.label, diagnostic.clone()));
        }

        let attributes: Vec<wgpu::VertexAttribute> = key
            .layout
            .attributes()
            .map(|(location, offset, components)| wgpu::VertexAttribute {
                format: vertex_format(key.layout.scalar, components),
                offset,
                shader_location: location,
            })
            .collect();

        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: key.layout.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("synk pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(program.vertex_entry.as_str()),
                    compilation_options: Default::default(),
                    buffers: &vertex_buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(program.fragment_entry.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: topology(key.primitive),
                    strip_index_format: key
                        .primitive
                        .is_strip()
                        .then(|| index_format(key.index_type)),
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(scope.pop()) {
            let diagnostic = err.to_string();
            let error = link_error(&program.label, diagnostic.clone());
            log::error!("{error}");
            self.rejected.insert(key.clone(), diagnostic);
            return Err(error);
        }

        log::debug!(
            "built pipeline for {:?} ({:?}, stride {})",
            key.program,
            key.primitive,
            key.layout.stride()
        );
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }
}

impl RenderDevice for WgpuDevice {
    fn backend(&self) -> &'static str {
        "wgpu"
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        // The surface cannot be reconfigured while its texture is held.
        if self.frame.take().is_some() {
            log::debug!("dropping in-flight frame on resize");
        }

        self.size = (width, height);
        self.reconfigure();
    }

    fn set_vsync(&mut self, enabled: bool) -> bool {
        let Some(mode) = surface::choose_present_mode(&self.present_modes, enabled) else {
            return false;
        };

        if mode != self.config.present_mode {
            self.frame = None;
            self.config.present_mode = mode;
            self.reconfigure();
        }
        true
    }

    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc) -> Result<()> {
        self.check_device()?;

        let limit = self.device.limits().max_buffer_size;
        if desc.size > limit {
            return Err(ResourceError::AllocationFailed {
                requested: desc.size,
                reason: format!("exceeds the device limit of {limit} bytes"),
            }
            .into());
        }

        let usage = match desc.target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.target.name()),
            size: align_to_copy(desc.size),
            usage,
            mapped_at_creation: false,
        });

        self.buffers.insert(
            id,
            GpuBuffer {
                buffer,
                size: desc.size,
            },
        );
        Ok(())
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        self.check_device()?;

        let Some(target) = self.buffers.get(id) else {
            return Err(ContextError::Lost.into());
        };

        // Offsets arrive 4-byte aligned. An unaligned length only reaches here for a write that
        // ends the buffer or for the initial upload into zeroed memory, so the padding never
        // overwrites caller data.
        debug_assert!(offset + data.len() as u64 <= target.size);
        let padded_len = align_to_copy(data.len() as u64) as usize;
        if padded_len == data.len() {
            self.queue.write_buffer(&target.buffer, offset, data);
        } else {
            let mut padded = Vec::with_capacity(padded_len);
            padded.extend_from_slice(data);
            padded.resize(padded_len, 0);
            self.queue.write_buffer(&target.buffer, offset, &padded);
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(gpu) = self.buffers.remove(id) {
            gpu.buffer.destroy();
        }
    }

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> std::result::Result<StageId, String> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let info = pollster::block_on(module.get_compilation_info());
        let mut errors = Vec::new();
        for message in &info.messages {
            let text = match &message.location {
                Some(loc) => format!(
                    "{}:{}: {}",
                    loc.line_number, loc.line_position, message.message
                ),
                None => message.message.clone(),
            };
            match message.message_type {
                wgpu::CompilationMessageType::Error => errors.push(text),
                _ => log::warn!("{stage} stage '{label}': {text}"),
            }
        }

        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }
        Ok(self.stages.insert(module))
    }

    fn discard_stage(&mut self, stage: StageId) {
        self.stages.remove(stage);
    }

    fn link_program(
        &mut self,
        id: ProgramId,
        label: &str,
        vertex: LinkStage<'_>,
        fragment: LinkStage<'_>,
    ) -> std::result::Result<(), String> {
        let vs = self.stages.remove(vertex.stage);
        let fs = self.stages.remove(fragment.stage);
        let (Some(vs), Some(fs)) = (vs, fs) else {
            return Err("stage was not compiled by this device".into());
        };

        self.programs.insert(
            id,
            LinkedProgram {
                label: label.to_string(),
                vertex: vs,
                vertex_entry: vertex.entry_point.to_string(),
                fragment: fs,
                fragment_entry: fragment.entry_point.to_string(),
            },
        );
        Ok(())
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.programs.remove(id);
        self.pipelines.retain(|key, _| key.program != id);
        self.rejected.retain(|key, _| key.program != id);
    }

    fn clear(&mut self, mask: ClearMask, color: ColorRgba) -> Result<()> {
        if mask.intersects(ClearMask::DEPTH | ClearMask::STENCIL) && !self.warned_depth_stencil {
            log::debug!("surface has no depth/stencil attachment; ignoring those clear bits");
            self.warned_depth_stencil = true;
        }

        if !mask.contains(ClearMask::COLOR) || !self.ensure_frame()? {
            return Ok(());
        }
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };

        let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("synk clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(color.r),
                        g: f64::from(color.g),
                        b: f64::from(color.b),
                        a: f64::from(color.a),
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw_indexed(&mut self, draw: &DrawCall<'_>) -> Result<()> {
        if !self.ensure_frame()? {
            return Ok(());
        }

        let (width, height) = self.size;
        let Some(viewport) = draw.viewport.clamped_to(width, height) else {
            log::trace!("viewport lies outside the surface; draw skipped");
            return Ok(());
        };

        let key = PipelineKey {
            program: draw.program,
            layout: draw.layout.clone(),
            primitive: draw.primitive,
            index_type: draw.index_type,
        };
        self.ensure_pipeline(&key)?;

        let (Some(pipeline), Some(vbo), Some(ibo), Some(frame)) = (
            self.pipelines.get(&key),
            self.buffers.get(draw.vertex_buffer),
            self.buffers.get(draw.index_buffer),
            self.frame.as_mut(),
        ) else {
            return Err(ContextError::Lost.into());
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("synk draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            0.0,
            1.0,
        );
        rpass.set_vertex_buffer(0, vbo.buffer.slice(..));
        rpass.set_index_buffer(ibo.buffer.slice(..), index_format(draw.index_type));
        rpass.draw_indexed(0..draw.index_count, 0, 0..1);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.check_device()?;

        // A frame with no clear or draw still presents, to keep vsync pacing.
        if self.frame.is_none() && !self.skip_frame {
            self.ensure_frame()?;
        }
        self.skip_frame = false;

        let Some(Frame {
            surface_texture,
            view,
            encoder,
        }) = self.frame.take()
        else {
            return Ok(());
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
        Ok(())
    }
}

fn link_error(label: &str, diagnostic: String) -> Error {
    Error::ShaderLink {
        base: PathBuf::from(label),
        diagnostic,
    }
}

/// Device-lost callback that flags the device as unusable.
fn mark_lost_on_device_loss(
    fatal: Arc<AtomicBool>,
) -> impl Fn(wgpu::DeviceLostReason, String) + Send + 'static {
    move |reason, message| {
        fatal.store(true, Ordering::Release);
        match reason {
            wgpu::DeviceLostReason::Destroyed => log::debug!("wgpu device destroyed: {message}"),
            wgpu::DeviceLostReason::Unknown => log::error!("wgpu device lost: {message}"),
        }
    }
}

fn align_to_copy(size: u64) -> u64 {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    size.div_ceil(align) * align
}

fn index_format(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::U16 => wgpu::IndexFormat::Uint16,
        IndexType::U32 => wgpu::IndexFormat::Uint32,
    }
}

fn topology(primitive: PrimitiveKind) -> wgpu::PrimitiveTopology {
    match primitive {
        PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveKind::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveKind::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Component counts are validated to `1..=4` before a layout reaches the device.
fn vertex_format(scalar: ScalarType, components: u32) -> wgpu::VertexFormat {
    use wgpu::VertexFormat as F;
    match (scalar, components) {
        (ScalarType::F32, 1) => F::Float32,
        (ScalarType::F32, 2) => F::Float32x2,
        (ScalarType::F32, 3) => F::Float32x3,
        (ScalarType::F32, _) => F::Float32x4,
        (ScalarType::U32, 1) => F::Uint32,
        (ScalarType::U32, 2) => F::Uint32x2,
        (ScalarType::U32, 3) => F::Uint32x3,
        (ScalarType::U32, _) => F::Uint32x4,
        (ScalarType::I32, 1) => F::Sint32,
        (ScalarType::I32, 2) => F::Sint32x2,
        (ScalarType::I32, 3) => F::Sint32x3,
        (ScalarType::I32, _) => F::Sint32x4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_alignment_rounds_up() {
        assert_eq!(align_to_copy(1), 4);
        assert_eq!(align_to_copy(12), 12);
        assert_eq!(align_to_copy(13), 16);
    }

    #[test]
    fn strip_topologies() {
        assert_eq!(
            topology(PrimitiveKind::TriangleStrip),
            wgpu::PrimitiveTopology::TriangleStrip
        );
        assert!(PrimitiveKind::LineStrip.is_strip());
        assert!(!PrimitiveKind::Triangles.is_strip());
    }

    #[test]
    fn vertex_formats_follow_component_count() {
        assert_eq!(vertex_format(ScalarType::F32, 3), wgpu::VertexFormat::Float32x3);
        assert_eq!(vertex_format(ScalarType::U32, 1), wgpu::VertexFormat::Uint32);
        assert_eq!(vertex_format(ScalarType::I32, 4), wgpu::VertexFormat::Sint32x4);
    }

    #[test]
    fn device_loss_marks_the_device_fatal() {
        for reason in [wgpu::DeviceLostReason::Unknown, wgpu::DeviceLostReason::Destroyed] {
            let fatal = Arc::new(AtomicBool::new(false));
            let callback = mark_lost_on_device_loss(fatal.clone());
            callback(reason, "driver reset".to_string());
            assert!(fatal.load(Ordering::Acquire));
        }
    }

    #[test]
    fn link_errors_name_the_program() {
        let err = link_error("res/shaders/main", "entry point mismatch".into());
        assert!(!err.is_fatal());
        match err {
            Error::ShaderLink { base, diagnostic } => {
                assert_eq!(base, PathBuf::from("res/shaders/main"));
                assert_eq!(diagnostic, "entry point mismatch");
            }
            other => panic!("expected a link error, got {other:?}"),
        }
    }
}
