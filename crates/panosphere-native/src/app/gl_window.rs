use super::{handle_input, report_tick, start, Flow, TickFlow, WINDOW_SIZE, WINDOW_TITLE};
use crate::backend::GlBackend;
use crate::input::DragTracker;
use anyhow::{anyhow, Context};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use panosphere_core::video::ThreadedDecoder;
use panosphere_core::{PanoramaViewer, ShaderAssets, TickOutcome, ViewerConfig};
use raw_window_handle::HasRawWindowHandle;
use std::ffi::CString;
use std::num::NonZeroU32;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

fn non_zero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
}

pub fn run(
    config: ViewerConfig,
    shaders: &dyn ShaderAssets,
    decoder: ThreadedDecoder,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let window_builder = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(WINDOW_SIZE.0, WINDOW_SIZE.1));

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(0);
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_builder(Some(window_builder))
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("glutin reports at least one config")
        })
        .map_err(|e| anyhow!("building GL display: {e}"))?;
    let window = window.context("no window created")?;

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();
    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));
    let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
        .context("creating GL 3.3 context")?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        non_zero(size.width),
        non_zero(size.height),
    );
    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
        .context("creating GL window surface")?;
    let gl_context = not_current
        .make_current(&gl_surface)
        .context("making GL context current")?;
    if let Err(e) = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN)) {
        log::warn!("[gl] vsync unavailable: {e}");
    }

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => gl_display.get_proc_address(&name) as *const _,
            Err(_) => std::ptr::null(),
        })
    };
    let backend = GlBackend::new(gl);
    let viewer = start(backend, config, shaders, decoder, (size.width, size.height))?;
    let mut app = GlWindow {
        viewer,
        drag: DragTracker::default(),
        surface: gl_surface,
        context: gl_context,
        window,
    };
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::Resized(size),
            ..
        } => app.resize(size),
        Event::WindowEvent { event, .. } => {
            if let Flow::Exit = handle_input(&mut app.viewer, &mut app.drag, &event) {
                elwt.exit();
            }
        }
        Event::AboutToWait => {
            if !app.viewer.is_playing() {
                elwt.set_control_flow(ControlFlow::Wait);
                return;
            }
            elwt.set_control_flow(ControlFlow::Poll);
            match app.tick() {
                TickFlow::Continue => app.window.request_redraw(),
                // GL has no surface to reconfigure; the next tick redraws.
                TickFlow::Reconfigure => {}
                TickFlow::Exit => elwt.exit(),
            }
        }
        _ => {}
    })?;
    Ok(())
}

/// Fields drop in order: GL objects go before the context that owns them.
struct GlWindow {
    viewer: PanoramaViewer<GlBackend, ThreadedDecoder>,
    drag: DragTracker,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

impl GlWindow {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface
            .resize(&self.context, non_zero(size.width), non_zero(size.height));
        self.viewer.resize(size.width, size.height);
    }

    fn tick(&mut self) -> TickFlow {
        let result = self.viewer.tick(instant::Instant::now());
        if matches!(result, Ok(TickOutcome::Rendered(_))) {
            if let Err(e) = self.surface.swap_buffers(&self.context) {
                log::warn!("[gl] swap failed: {e}");
            }
        }
        report_tick(result)
    }
}
