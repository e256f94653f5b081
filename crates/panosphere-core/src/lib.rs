//! Platform-agnostic core of the panosphere 360-degree video viewer.
//!
//! Nothing in here talks to a GPU API or a window system directly; backends
//! plug in through [`GpuBackend`] and decoders through [`FrameDecoder`].

pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod math;
pub mod renderer;
pub mod rotation;
pub mod shaders;
pub mod texture;
pub mod video;
pub mod viewer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ViewerConfig;
pub use error::{ConfigError, DecodeError, FrameError, SetupError, TextureError};
pub use frame::{PlanarFrame, Plane, PlaneFormat, PlaneIndex, VideoFrame};
pub use geometry::{IndexWidth, SphereGeometry, SphereIndices};
pub use renderer::{DrawCall, DrawOutcome, GpuBackend, RendererState, SphereRenderer};
pub use rotation::{RotationState, SharedRotation};
pub use shaders::{BundledShaders, ShaderAssets, ShaderDir, ShaderStage};
pub use texture::{PlaneTextureDesc, TextureAllocator, TexturePair};
pub use video::{DecodePoll, FrameDecoder, FrameReader, VideoFrameSource};
pub use viewer::{PanoramaViewer, TickOutcome};
