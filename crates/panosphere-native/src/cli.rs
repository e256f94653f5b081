use clap::{Parser, ValueEnum};
use panosphere_core::constants::{
    DEFAULT_FIELD_OF_VIEW_DEG, DEFAULT_FRAMES_PER_SECOND, DEFAULT_SPHERE_SLICES,
    DEFAULT_TOUCH_SENSITIVITY,
};
use panosphere_core::{ConfigError, ViewerConfig};
use std::path::PathBuf;

// Size of the synthetic colour bars played when no file is given.
pub const PATTERN_WIDTH: u32 = 2048;
pub const PATTERN_HEIGHT: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Explicit command buffers through wgpu.
    Wgpu,
    /// OpenGL 3.3 through glow and glutin.
    Gl,
}

/// Play a 360-degree equirectangular video on the inside of a sphere.
///
/// Drag with the left mouse button to look around. Space pauses, R resets
/// the view, Escape quits.
#[derive(Debug, Parser)]
#[command(name = "panosphere", version)]
pub struct Cli {
    /// YUV4MPEG2 (4:2:0) file to play. Colour bars are shown when omitted.
    #[arg(long)]
    pub video: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Vertical field of view in degrees.
    #[arg(long, default_value_t = DEFAULT_FIELD_OF_VIEW_DEG)]
    pub fov: f32,

    /// Rate at which new frames are pulled from the decoder.
    #[arg(long, default_value_t = DEFAULT_FRAMES_PER_SECOND)]
    pub fps: u32,

    /// Sphere tessellation; even, at least 4.
    #[arg(long, default_value_t = DEFAULT_SPHERE_SLICES)]
    pub slices: u32,

    /// Radians of rotation per pixel dragged.
    #[arg(long, default_value_t = DEFAULT_TOUCH_SENSITIVITY)]
    pub sensitivity: f32,

    /// Stop at the end of the video instead of starting over.
    #[arg(long)]
    pub no_loop: bool,

    /// Load sphere.wgsl, sphere.vert and sphere.frag from this directory
    /// instead of the built-in copies.
    #[arg(long)]
    pub shader_dir: Option<PathBuf>,
}

impl Cli {
    pub fn viewer_config(&self) -> Result<ViewerConfig, ConfigError> {
        ViewerConfig {
            field_of_view: self.fov,
            frames_per_second: self.fps,
            sphere_slices: self.slices,
            touch_sensitivity: self.sensitivity,
            loop_playback: !self.no_loop,
        }
        .validate()
    }
}
