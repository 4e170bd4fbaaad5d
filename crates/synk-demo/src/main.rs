use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use synk_engine::graphics::{
    BufferUsage, ClearMask, ColorRgba, GraphicsModule, IndexType, PrimitiveKind, ScalarType,
    Viewport,
};
use synk_engine::logging::{LoggingConfig, init_logging};
use synk_engine::platform::WinitPlatform;
use synk_engine::screen::enumerate_screens;
use synk_engine::time::Timer;
use synk_engine::window::{ButtonState, Event, EventType, SynkWindow, VideoSettings, WindowStyle};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

const QUAD: [Vertex; 4] = [
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [1.0, 0.2, 0.2, 1.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.2, 1.0, 0.2, 1.0],
    },
    Vertex {
        position: [0.5, 0.5, 0.0],
        color: [0.2, 0.2, 1.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5, 0.0],
        color: [1.0, 1.0, 0.2, 1.0],
    },
];

/// Byte offset of the top-right vertex's color.
const PULSE_COLOR_OFFSET: u64 =
    (2 * std::mem::size_of::<Vertex>() + 3 * std::mem::size_of::<f32>()) as u64;

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

fn shader_base() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("res/shaders/main")
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut platform = WinitPlatform::new().context("starting the platform event loop")?;

    let screens = enumerate_screens(&mut platform);
    for (i, screen) in screens.iter().enumerate() {
        log::info!(
            "screen {i}: {}x{} at ({}, {}) {}",
            screen.width,
            screen.height,
            screen.x,
            screen.y,
            screen.name.as_deref().unwrap_or("unnamed")
        );
    }
    let screen = screens.first().cloned().unwrap_or_default();

    let video = VideoSettings::centered(screen, 960, 540);
    let mut window = SynkWindow::open(
        "Synk demo",
        video,
        WindowStyle::default() | WindowStyle::RESIZABLE | WindowStyle::MAXIMIZABLE,
    );

    // The module is bound to the surface once the window is built.
    let module = window.extract::<GraphicsModule>()?;
    window.build(&mut platform).context("building the main window")?;
    log::info!("graphics backend: {}", module.borrow().backend());

    {
        let weak = module.downgrade();
        window.event_handler_mut().add(EventType::Resized, move |event| {
            let Some((width, height)) = event.resized() else {
                return Ok(());
            };
            weak.with_mut(|gm| {
                gm.set_viewport(Viewport::full(width, height));
                Ok(())
            })
        });
    }
    window.event_handler_mut().add(EventType::Key, |event| {
        if let Event::Key {
            code,
            state: ButtonState::Pressed,
            repeat: false,
        } = *event
        {
            log::debug!("key {code} pressed");
        }
        Ok(())
    });

    let (vao, vbo, ibo, shader) = {
        let mut gm = module.borrow_mut();

        let vao = gm.create_vertex_array()?;
        let vbo = gm.create_vertex_buffer_from(BufferUsage::Dynamic, &QUAD)?;
        let ibo = gm.create_index_buffer_from(BufferUsage::Static, &QUAD_INDICES)?;
        {
            let mut vao_scope = vao.bind(&mut gm)?;
            let mut vbo_scope = vbo.bind(&mut vao_scope)?;
            vbo_scope.set_attrib_pointers(&[3, 4], ScalarType::F32)?;
        }

        let shader = gm
            .load_shaders(shader_base())
            .context("loading the demo shaders")?;

        (vao, vbo, ibo, shader)
    };

    let mut timer = Timer::new();
    let mut fps = timer.create_chrono();
    fps.start();
    let mut frames = 0u32;

    while window.is_open() {
        let frame = timer.update();
        window.poll_events()?;

        let t = frame.program_time.as_secs_f32();
        let pulse = 0.5 + 0.5 * (t * 2.0).sin();

        let result = (|| -> synk_engine::Result<()> {
            let mut gm = module.borrow_mut();
            gm.set_clear_color(ColorRgba::new(0.05, 0.05, 0.08 + 0.1 * pulse, 1.0));
            gm.clear_buffers(ClearMask::COLOR)?;

            // Top-right vertex color follows the pulse.
            let color: [f32; 4] = [0.2, 0.2, pulse, 1.0];
            gm.update_buffer(&vbo, PULSE_COLOR_OFFSET, bytemuck::cast_slice(&color))?;

            {
                let mut prog = shader.bind(&mut gm)?;
                let mut bound = vao.bind(&mut prog)?;
                bound.draw_elements(
                    PrimitiveKind::Triangles,
                    QUAD_INDICES.len() as u32,
                    IndexType::U16,
                    &ibo,
                )?;
            }

            gm.swap_buffers()
        })();

        if let Err(e) = result {
            if e.is_fatal() {
                return Err(e).context("graphics context lost");
            }
            log::warn!("frame skipped: {e}");
        }

        window.update();

        frames += 1;
        if fps.elapsed() >= Duration::from_secs(1) {
            let elapsed = fps.restart();
            window.set_title(format!(
                "Synk demo ({:.0} fps)",
                f64::from(frames) / elapsed.as_secs_f64()
            ));
            frames = 0;
        }
    }

    let mut gm = module.borrow_mut();
    gm.release(shader)?;
    gm.release(ibo)?;
    gm.release(vbo)?;
    gm.release(vao)?;

    log::info!("{:?}", gm.stats());
    Ok(())
}
