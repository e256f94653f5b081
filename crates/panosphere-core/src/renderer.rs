//! Backend-agnostic sphere renderer.
//!
//! [`SphereRenderer`] owns the MVP matrix, the bound texture pair and the
//! texture pool. Everything that touches a GPU API goes through
//! [`GpuBackend`], so the same state machine drives the wgpu and the OpenGL
//! backends as well as the recording backend used in tests.

use crate::constants::DEFAULT_VIEWPORT;
use crate::error::{FrameError, SetupError, TextureError};
use crate::frame::PlanarFrame;
use crate::geometry::{IndexWidth, SphereGeometry};
use crate::math::{aspect_ratio, model_view_projection};
use crate::shaders::ShaderAssets;
use crate::texture::{
    PlaneTextureDesc, PoolStats, TextureAllocator, TexturePair, TexturePool, TextureUploader,
};
use glam::Mat4;

/// Everything a backend needs to issue one indexed draw of the sphere.
pub struct DrawCall<'a, T> {
    pub mvp: &'a Mat4,
    /// Luma binds to unit 0, chroma to unit 1.
    pub textures: TexturePair<'a, T>,
    pub index_count: u32,
    pub index_width: IndexWidth,
}

/// GPU API behind a [`SphereRenderer`].
///
/// Meshes use clockwise front faces with back-face culling; the sphere is
/// viewed from the inside. `clear` and `draw` each produce one complete frame
/// (cleared to [`crate::constants::CLEAR_COLOR`]).
pub trait GpuBackend: TextureAllocator {
    fn name(&self) -> &'static str;

    /// Upload positions, texture coordinates and indices into static buffers.
    fn upload_mesh(&mut self, geometry: &SphereGeometry) -> Result<(), SetupError>;

    /// Compile and link the sphere program from `shaders`.
    fn build_program(&mut self, shaders: &dyn ShaderAssets) -> Result<(), SetupError>;

    /// Called with non-zero sizes only.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear the target without drawing anything.
    fn clear(&mut self) -> Result<(), FrameError>;

    fn draw(&mut self, call: DrawCall<'_, Self::Texture>) -> Result<(), FrameError>;

    /// Drop mesh buffers and program. Textures are already gone by then.
    fn release_mesh(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    Drawing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No texture pair bound; only the background was cleared.
    NoTextures,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Calls to `render`, successful or not.
    pub frames: u64,
    pub draws: u64,
    pub skipped: u64,
    pub texture_failures: u64,
}

pub struct SphereRenderer<B: GpuBackend> {
    backend: B,
    index_count: u32,
    index_width: IndexWidth,
    field_of_view: f32,
    viewport: [u32; 2],
    rotation: (f32, f32),
    mvp: Mat4,
    uploader: TextureUploader<B::Texture>,
    pool: TexturePool<B::Texture>,
    state: RendererState,
    stats: RenderStats,
}

impl<B: GpuBackend> SphereRenderer<B> {
    /// Upload `geometry`, build the program and return a renderer in
    /// [`RendererState::Ready`].
    pub fn new(
        mut backend: B,
        geometry: &SphereGeometry,
        shaders: &dyn ShaderAssets,
        field_of_view: f32,
    ) -> Result<Self, SetupError> {
        if geometry.is_empty() {
            return Err(SetupError::EmptyGeometry);
        }
        let index_count = u32::try_from(geometry.index_count()).map_err(|_| {
            SetupError::BufferAllocation {
                label: "sphere indices",
                reason: format!("{} indices exceed u32", geometry.index_count()),
            }
        })?;

        log::info!(
            "[renderer] setting up {} backend: {} vertices, {} indices ({:?})",
            backend.name(),
            geometry.vertex_count(),
            index_count,
            geometry.indices.index_width()
        );
        backend.upload_mesh(geometry)?;
        if let Err(e) = backend.build_program(shaders) {
            backend.release_mesh();
            return Err(e);
        }
        let [w, h] = DEFAULT_VIEWPORT;
        backend.resize(w, h);

        let mut renderer = Self {
            backend,
            index_count,
            index_width: geometry.indices.index_width(),
            field_of_view,
            viewport: DEFAULT_VIEWPORT,
            rotation: (0.0, 0.0),
            mvp: Mat4::IDENTITY,
            uploader: TextureUploader::new(),
            pool: TexturePool::new(),
            state: RendererState::Uninitialized,
            stats: RenderStats::default(),
        };
        renderer.recompute_mvp();
        renderer.state = RendererState::Ready;
        Ok(renderer)
    }

    /// Record the drawable size. Zero-sized updates (minimised windows) are ignored.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("[renderer] ignoring zero viewport {width}x{height}");
            return;
        }
        if self.viewport == [width, height] {
            return;
        }
        self.viewport = [width, height];
        self.backend.resize(width, height);
        self.recompute_mvp();
    }

    pub fn update_model_view_projection_matrix(&mut self, rotation_x: f32, rotation_y: f32) {
        self.rotation = (rotation_x, rotation_y);
        self.recompute_mvp();
    }

    fn recompute_mvp(&mut self) {
        let [w, h] = self.viewport;
        let Some(aspect) = aspect_ratio(w as f32, h as f32) else {
            return;
        };
        let (rx, ry) = self.rotation;
        self.mvp = model_view_projection(self.field_of_view, aspect, rx, ry);
    }

    /// Swap the bound textures for ones built from `frame`.
    ///
    /// On error nothing stays bound and the next `render` only clears.
    pub fn update_texture(&mut self, frame: &PlanarFrame<'_>) -> Result<(), TextureError> {
        let result = self
            .uploader
            .update(frame, &mut self.pool, &mut self.backend);
        if result.is_err() {
            self.stats.texture_failures += 1;
        }
        result
    }

    /// Return the bound pair and every pooled texture to the backend.
    pub fn release_textures(&mut self) {
        self.uploader.release(&mut self.pool, &mut self.backend);
        self.pool.purge(&mut self.backend);
    }

    pub fn render(&mut self) -> Result<DrawOutcome, FrameError> {
        self.state = RendererState::Drawing;
        self.stats.frames += 1;
        let result = self.submit();
        self.state = RendererState::Ready;
        result
    }

    fn submit(&mut self) -> Result<DrawOutcome, FrameError> {
        let Some(textures) = self.uploader.bound() else {
            self.backend.clear()?;
            self.stats.skipped += 1;
            return Ok(DrawOutcome::Skipped(SkipReason::NoTextures));
        };
        self.backend.draw(DrawCall {
            mvp: &self.mvp,
            textures,
            index_count: self.index_count,
            index_width: self.index_width,
        })?;
        self.stats.draws += 1;
        Ok(DrawOutcome::Drawn)
    }

    pub fn mvp(&self) -> Mat4 {
        self.mvp
    }

    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn has_textures(&self) -> bool {
        self.uploader.bound().is_some()
    }

    pub fn bound_textures(&self) -> Option<(PlaneTextureDesc, PlaneTextureDesc)> {
        self.uploader.bound_descs()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: GpuBackend> Drop for SphereRenderer<B> {
    fn drop(&mut self) {
        self.release_textures();
        self.backend.release_mesh();
        log::debug!(
            "[renderer] {} backend released after {} draws",
            self.backend.name(),
            self.stats.draws
        );
    }
}
