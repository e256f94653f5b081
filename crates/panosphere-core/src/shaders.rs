//! Shader sources handed to backends at construction time.
//!
//! Backends never look shaders up on their own; the caller passes a
//! [`ShaderAssets`] provider, either the sources compiled into the crate or a
//! directory that overrides them.

use crate::error::SetupError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub static SPHERE_WGSL: &str = include_str!("../shaders/sphere.wgsl");
pub static SPHERE_VERT_GLSL: &str = include_str!("../shaders/sphere.vert");
pub static SPHERE_FRAG_GLSL: &str = include_str!("../shaders/sphere.frag");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Source provider for the sphere program.
///
/// Every program exposes `position` (vec3, location 0), `tex_coord`
/// (vec2, location 1), one MVP matrix uniform and two samplers (luma on unit
/// 0, chroma on unit 1).
pub trait ShaderAssets {
    /// Single WGSL module with `vs_main` and `fs_main`.
    fn wgsl(&self) -> Result<Cow<'_, str>, SetupError>;
    /// GLSL 330 source for one stage.
    fn glsl(&self, stage: ShaderStage) -> Result<Cow<'_, str>, SetupError>;
}

/// Sources compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct BundledShaders;

impl ShaderAssets for BundledShaders {
    fn wgsl(&self) -> Result<Cow<'_, str>, SetupError> {
        Ok(Cow::Borrowed(SPHERE_WGSL))
    }

    fn glsl(&self, stage: ShaderStage) -> Result<Cow<'_, str>, SetupError> {
        Ok(Cow::Borrowed(match stage {
            ShaderStage::Vertex => SPHERE_VERT_GLSL,
            ShaderStage::Fragment => SPHERE_FRAG_GLSL,
        }))
    }
}

/// Loads `sphere.wgsl`, `sphere.vert` and `sphere.frag` from a directory.
#[derive(Clone, Debug)]
pub struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, name: &str) -> Result<Cow<'_, str>, SetupError> {
        let path = self.root.join(name);
        log::debug!("[shaders] loading {}", path.display());
        std::fs::read_to_string(&path)
            .map(Cow::Owned)
            .map_err(|e| SetupError::ShaderAsset {
                name: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

impl ShaderAssets for ShaderDir {
    fn wgsl(&self) -> Result<Cow<'_, str>, SetupError> {
        self.read("sphere.wgsl")
    }

    fn glsl(&self, stage: ShaderStage) -> Result<Cow<'_, str>, SetupError> {
        match stage {
            ShaderStage::Vertex => self.read("sphere.vert"),
            ShaderStage::Fragment => self.read("sphere.frag"),
        }
    }
}
