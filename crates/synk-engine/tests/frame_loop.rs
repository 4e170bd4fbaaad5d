//! End-to-end frame loop on the headless platform and device.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use synk_engine::graphics::{
    BufferUsage, ClearMask, ColorRgba, GraphicsModule, IndexType, ModuleRef, PrimitiveKind,
    ScalarType, ShaderStage, Viewport, stage_path,
};
use synk_engine::platform::HeadlessPlatform;
use synk_engine::screen::{Screen, enumerate_screens};
use synk_engine::time::{ManualClock, Timer};
use synk_engine::window::{Event, EventType, SynkWindow, VideoSettings, WindowStyle};
use synk_engine::{Error, error::ContextError};

const VERT: &str = r#"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

const FRAG: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

fn shader_base() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("synk-frame-loop-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let base = dir.join("main");
    std::fs::write(stage_path(&base, ShaderStage::Vertex), VERT).unwrap();
    std::fs::write(stage_path(&base, ShaderStage::Fragment), FRAG).unwrap();
    base
}

#[test]
fn headless_frame_loop_runs_until_close() {
    let mut platform = HeadlessPlatform::with_screens(vec![
        Screen::new(0, 0, 1920, 1080),
        Screen::new(1920, 0, 1280, 1024),
    ]);

    let screens = enumerate_screens(&mut platform);
    assert_eq!(screens.len(), 2);

    let video = VideoSettings::centered(screens[0].clone(), 640, 480);
    let mut window = SynkWindow::open("frame loop", video, WindowStyle::default());

    // Extracted before the native window exists; `build` binds it to the surface.
    let module = window.extract::<GraphicsModule>().unwrap();
    assert!(module.borrow().is_unbound());
    window.build(&mut platform).unwrap();
    assert!(ModuleRef::ptr_eq(
        &module,
        &window.extract::<GraphicsModule>().unwrap()
    ));

    let resizes = Rc::new(Cell::new(0u32));
    {
        let weak = module.downgrade();
        let resizes = resizes.clone();
        window
            .event_handler_mut()
            .add(EventType::Resized, move |event| {
                resizes.set(resizes.get() + 1);
                let (width, height) = event.resized().unwrap_or_default();
                weak.with_mut(|gm| {
                    gm.set_viewport(Viewport::full(width, height));
                    Ok(())
                })
            });
    }

    let (vao, vbo, ibo, shader) = {
        let mut gm = module.borrow_mut();
        gm.set_clear_color(ColorRgba::new(0.1, 0.1, 0.1, 1.0));

        let vertices: [f32; 21] = [
            -0.5, -0.5, 0.0, 1.0, 0.0, 0.0, 1.0, //
            0.5, -0.5, 0.0, 0.0, 1.0, 0.0, 1.0, //
            0.0, 0.5, 0.0, 0.0, 0.0, 1.0, 1.0,
        ];
        let vao = gm.create_vertex_array().unwrap();
        let vbo = gm
            .create_vertex_buffer_from(BufferUsage::Static, &vertices)
            .unwrap();
        let ibo = gm
            .create_index_buffer_from(BufferUsage::Static, &[0u32, 1, 2])
            .unwrap();
        {
            let mut vao_scope = vao.bind(&mut gm).unwrap();
            let mut vbo_scope = vbo.bind(&mut vao_scope).unwrap();
            vbo_scope
                .set_attrib_pointers(&[3, 4], ScalarType::F32)
                .unwrap();
        }
        let shader = gm.load_shaders(shader_base()).unwrap();
        (vao, vbo, ibo, shader)
    };

    let clock = ManualClock::new();
    let mut timer = Timer::with_clock(clock.clone());
    let id = window.native_id().unwrap();

    let mut frames = 0u32;
    while window.is_open() {
        clock.advance(Duration::from_millis(16));
        let frame = timer.update();
        assert!(frame.dt > 0.0);

        match frames {
            2 => {
                platform.push_event(id, Event::Resized { width: 800, height: 600 });
            }
            5 => {
                platform.push_event(id, Event::Closed);
            }
            _ => {}
        }

        window.poll_events().unwrap();

        {
            let mut gm = module.borrow_mut();
            gm.clear_buffers(ClearMask::COLOR | ClearMask::DEPTH).unwrap();

            let mut prog = shader.bind(&mut gm).unwrap();
            let mut bound = vao.bind(&mut prog).unwrap();
            bound
                .draw_elements(PrimitiveKind::Triangles, 3, IndexType::U32, &ibo)
                .unwrap();
        }

        module.borrow_mut().swap_buffers().unwrap();
        window.update();
        frames += 1;
    }

    assert_eq!(frames, 6);
    assert_eq!(resizes.get(), 1);
    assert_eq!(window.size(), (800, 600));
    assert_eq!(timer.frame_count(), 6);

    {
        let mut gm = module.borrow_mut();
        let stats = gm.stats();
        assert_eq!(stats.frames_presented, 6);
        assert_eq!(stats.draw_calls, 6);
        assert_eq!(stats.clears, 6);
        assert_eq!(gm.surface_size(), Some((800, 600)));
        assert_eq!(gm.viewport(), Viewport::full(800, 600));

        gm.release(shader).unwrap();
        gm.release(ibo).unwrap();
        gm.release(vbo).unwrap();
        gm.release(vao).unwrap();
    }

    drop(window);
    assert_eq!(platform.live_windows(), 0);
    assert!(matches!(
        module.borrow_mut().swap_buffers().unwrap_err(),
        Error::Context(ContextError::Lost)
    ));
}
