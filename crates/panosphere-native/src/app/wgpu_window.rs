use super::{handle_input, report_tick, start, Flow, TickFlow, WINDOW_SIZE, WINDOW_TITLE};
use crate::backend::WgpuBackend;
use crate::input::DragTracker;
use panosphere_core::video::ThreadedDecoder;
use panosphere_core::{ShaderAssets, ViewerConfig};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub fn run(
    config: ViewerConfig,
    shaders: &dyn ShaderAssets,
    decoder: ThreadedDecoder,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(WINDOW_SIZE.0, WINDOW_SIZE.1))
            .build(&event_loop)?,
    );

    let backend = pollster::block_on(WgpuBackend::for_window(Arc::clone(&window)))?;
    let size = window.inner_size();
    let mut viewer = start(backend, config, shaders, decoder, (size.width, size.height))?;
    let mut drag = DragTracker::default();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::Resized(size),
            ..
        } => viewer.resize(size.width, size.height),
        Event::WindowEvent { event, .. } => {
            if let Flow::Exit = handle_input(&mut viewer, &mut drag, &event) {
                elwt.exit();
            }
        }
        Event::AboutToWait => {
            if !viewer.is_playing() {
                elwt.set_control_flow(ControlFlow::Wait);
                return;
            }
            elwt.set_control_flow(ControlFlow::Poll);
            match report_tick(viewer.tick(instant::Instant::now())) {
                TickFlow::Continue => window.request_redraw(),
                TickFlow::Reconfigure => viewer.renderer_mut().backend_mut().reconfigure(),
                TickFlow::Exit => elwt.exit(),
            }
        }
        _ => {}
    })?;
    Ok(())
}
