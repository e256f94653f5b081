//! Window drivers. Each owns a winit event loop and feeds a
//! [`PanoramaViewer`] with ticks, drags and resizes.

mod gl_window;
mod wgpu_window;

use crate::cli::{BackendKind, Cli, PATTERN_HEIGHT, PATTERN_WIDTH};
use crate::input::{key_action, DragTracker, KeyAction};
use anyhow::Context;
use panosphere_core::video::{TestPattern, ThreadedDecoder, Y4mReader};
use panosphere_core::{
    BundledShaders, FrameError, FrameReader, GpuBackend, PanoramaViewer, ShaderAssets, ShaderDir,
    TickOutcome, ViewerConfig,
};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::PhysicalKey;

const WINDOW_TITLE: &str = "panosphere";
const WINDOW_SIZE: (u32, u32) = (1280, 720);

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.viewer_config().context("invalid viewer options")?;
    let shaders: Box<dyn ShaderAssets> = match &cli.shader_dir {
        Some(dir) => Box::new(ShaderDir::new(dir)),
        None => Box::new(BundledShaders),
    };
    let decoder = open_decoder(cli)?;
    log::info!(
        "[app] {:?} backend, {} slices, fov {}, {} fps",
        cli.backend,
        config.sphere_slices,
        config.field_of_view,
        config.frames_per_second
    );
    match cli.backend {
        BackendKind::Wgpu => wgpu_window::run(config, shaders.as_ref(), decoder),
        BackendKind::Gl => gl_window::run(config, shaders.as_ref(), decoder),
    }
}

fn open_decoder(cli: &Cli) -> anyhow::Result<ThreadedDecoder> {
    let decoder = match &cli.video {
        Some(path) => {
            let reader = Y4mReader::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            let header = reader.header();
            log::info!(
                "[app] {}: {}x{} at {:.2} fps",
                path.display(),
                header.width,
                header.height,
                reader.frame_rate()
            );
            ThreadedDecoder::spawn(reader)?
        }
        None => {
            log::info!("[app] no video given, playing colour bars");
            ThreadedDecoder::spawn(TestPattern::new(
                PATTERN_WIDTH,
                PATTERN_HEIGHT,
                cli.fps as f64,
            ))?
        }
    };
    Ok(decoder)
}

fn start<B: GpuBackend>(
    backend: B,
    config: ViewerConfig,
    shaders: &dyn ShaderAssets,
    decoder: ThreadedDecoder,
    size: (u32, u32),
) -> anyhow::Result<PanoramaViewer<B, ThreadedDecoder>> {
    let mut viewer = PanoramaViewer::new(backend, config, shaders)?;
    viewer.resize(size.0, size.1);
    viewer.load(decoder);
    viewer.play();
    Ok(viewer)
}

/// What a driver does after an input event.
enum Flow {
    Continue,
    Exit,
}

/// Input handling common to both drivers. Resizes are driver specific.
fn handle_input<B: GpuBackend>(
    viewer: &mut PanoramaViewer<B, ThreadedDecoder>,
    drag: &mut DragTracker,
    event: &WindowEvent,
) -> Flow {
    match event {
        WindowEvent::CloseRequested => return Flow::Exit,
        WindowEvent::MouseInput { state, button, .. } => drag.button(*button, *state),
        WindowEvent::CursorMoved { position, .. } => {
            if let Some((dx, dy)) = drag.moved(position.x, position.y) {
                viewer.drag(dx, dy);
            }
        }
        WindowEvent::CursorLeft { .. } => drag.left(),
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } => match key_action(*code) {
            Some(KeyAction::TogglePause) => {
                viewer.toggle_pause();
                log::info!(
                    "[app] {}",
                    if viewer.is_playing() { "playing" } else { "paused" }
                );
            }
            Some(KeyAction::ResetView) => viewer.rotation().reset(),
            Some(KeyAction::Quit) => return Flow::Exit,
            None => {}
        },
        _ => {}
    }
    Flow::Continue
}

/// Outcome of one tick as seen by the driver.
enum TickFlow {
    Continue,
    /// The render target has to be reconfigured before the next tick.
    Reconfigure,
    Exit,
}

fn report_tick(result: Result<TickOutcome, FrameError>) -> TickFlow {
    match result {
        Ok(_) => TickFlow::Continue,
        Err(FrameError::Lost | FrameError::Outdated) => TickFlow::Reconfigure,
        Err(FrameError::OutOfMemory) => {
            log::error!("[app] GPU out of memory, exiting");
            TickFlow::Exit
        }
        Err(e) => {
            log::warn!("[app] frame skipped: {e}");
            TickFlow::Continue
        }
    }
}
