//! Error taxonomy for the render core.
//!
//! Setup errors are fatal and only happen while a renderer is being built.
//! Texture and frame errors are transient: the caller logs them and skips the
//! current tick. Decoder end-of-stream is not an error at all and is reported
//! through [`crate::video::DecodePoll::EndOfStream`].

use crate::frame::PlaneIndex;
use thiserror::Error;

/// Unrecoverable failures while creating a renderer or backend.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no GPU adapter or GL context available: {0}")]
    DeviceUnavailable(String),
    #[error("shader asset `{name}` could not be loaded: {reason}")]
    ShaderAsset { name: String, reason: String },
    #[error("shader compilation failed ({stage}): {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("shader program link failed: {0}")]
    ProgramLink(String),
    #[error("buffer allocation failed for {label}: {reason}")]
    BufferAllocation { label: &'static str, reason: String },
    #[error("sphere geometry is empty; slice count must be at least 2")]
    EmptyGeometry,
}

/// Per-frame failures while turning a planar frame into GPU textures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("{plane:?} plane has an empty extent ({width}x{height})")]
    EmptyPlane {
        plane: PlaneIndex,
        width: u32,
        height: u32,
    },
    #[error("{plane:?} plane stride {stride} is shorter than a row of {row_bytes} bytes")]
    StrideTooShort {
        plane: PlaneIndex,
        stride: usize,
        row_bytes: usize,
    },
    #[error("{plane:?} plane holds {actual} bytes, {required} required")]
    PlaneTooSmall {
        plane: PlaneIndex,
        required: usize,
        actual: usize,
    },
    #[error("texture allocation failed for {plane:?} plane: {reason}")]
    Allocation { plane: PlaneIndex, reason: String },
}

/// Per-frame failures while submitting work to the GPU.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("render target lost; reconfigure before the next frame")]
    Lost,
    #[error("render target outdated")]
    Outdated,
    #[error("timed out acquiring the next render target")]
    Timeout,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failures reported by frame decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed stream: {0}")]
    Format(String),
    #[error("unsupported stream: {0}")]
    Unsupported(String),
    #[error("decoder worker is gone")]
    Disconnected,
}

/// Rejected viewer configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("frames per second must be positive")]
    FramesPerSecond,
    #[error("sphere slices must be an even number in [{min}, {max}], got {got}")]
    SphereSlices { got: u32, min: u32, max: u32 },
    #[error("touch sensitivity must be finite, got {0}")]
    TouchSensitivity(f32),
}
