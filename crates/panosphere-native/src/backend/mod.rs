//! GPU backends behind [`panosphere_core::GpuBackend`].

mod gl_backend;
mod wgpu_backend;

pub use gl_backend::{GlBackend, GlTexture};
pub use wgpu_backend::{WgpuBackend, WgpuTexture};
