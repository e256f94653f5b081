//! Composition root used by drivers: one renderer, one frame source and the
//! rotation shared with the input path.

use crate::config::ViewerConfig;
use crate::constants::SPHERE_RADIUS;
use crate::error::{FrameError, SetupError};
use crate::geometry::SphereGeometry;
use crate::renderer::{DrawOutcome, GpuBackend, SphereRenderer};
use crate::rotation::SharedRotation;
use crate::shaders::ShaderAssets;
use crate::video::{FrameDecoder, VideoFrameSource};
use instant::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused, stopped, finished or nothing loaded; no GPU work issued.
    Idle,
    Rendered(DrawOutcome),
}

pub struct PanoramaViewer<B: GpuBackend, D: FrameDecoder> {
    renderer: SphereRenderer<B>,
    source: Option<VideoFrameSource<D>>,
    rotation: SharedRotation,
    config: ViewerConfig,
}

impl<B: GpuBackend, D: FrameDecoder> PanoramaViewer<B, D> {
    /// Build the sphere for `config` and set up `backend`.
    ///
    /// `config` is expected to have passed [`ViewerConfig::validate`].
    pub fn new(
        backend: B,
        config: ViewerConfig,
        shaders: &dyn ShaderAssets,
    ) -> Result<Self, SetupError> {
        let geometry = SphereGeometry::generate(config.sphere_slices, SPHERE_RADIUS);
        let renderer = SphereRenderer::new(backend, &geometry, shaders, config.field_of_view)?;
        Ok(Self {
            renderer,
            source: None,
            rotation: SharedRotation::default(),
            config,
        })
    }

    /// Replace the current source with `decoder`. Playback starts paused.
    pub fn load(&mut self, decoder: D) -> &mut VideoFrameSource<D> {
        self.stop();
        let source = VideoFrameSource::new(
            decoder,
            self.config.frames_per_second,
            self.config.loop_playback,
        );
        self.source.insert(source)
    }

    pub fn play(&mut self) {
        match self.source.as_mut() {
            Some(source) => source.start(),
            None => log::warn!("[viewer] play ignored: nothing loaded"),
        }
    }

    /// Stop pulling frames and drawing. GPU resources stay allocated.
    pub fn pause(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.pause();
        }
    }

    /// Drop the decoder and the textures. Mesh and program stay until drop.
    pub fn stop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
        self.renderer.release_textures();
    }

    pub fn toggle_pause(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn is_finished(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_finished())
    }

    /// Handle for the input path; drags through it are seen by the next tick.
    pub fn rotation(&self) -> SharedRotation {
        self.rotation.clone()
    }

    pub fn drag(&self, dx: f32, dy: f32) {
        self.rotation.drag(dx, dy, self.config.touch_sensitivity);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.set_viewport_size(width, height);
    }

    /// One display refresh: pull, upload, update the matrix, draw.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, FrameError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        if !source.is_playing() {
            return Ok(TickOutcome::Idle);
        }
        if let Some(frame) = source.pull_current_frame(now) {
            if let Err(e) = self.renderer.update_texture(&frame) {
                log::warn!("[viewer] skipping frame: {e}");
            }
        }
        let r = self.rotation.snapshot();
        self.renderer.update_model_view_projection_matrix(r.x, r.y);
        self.renderer.render().map(TickOutcome::Rendered)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &SphereRenderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut SphereRenderer<B> {
        &mut self.renderer
    }

    pub fn source_mut(&mut self) -> Option<&mut VideoFrameSource<D>> {
        self.source.as_mut()
    }
}
