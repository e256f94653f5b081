//! Test doubles: a backend that records every call instead of touching a GPU,
//! a scripted decoder, and [`contract`] checks shared by every backend.

pub mod contract;

use crate::error::{DecodeError, FrameError, SetupError, TextureError};
use crate::frame::{Plane, PlaneIndex, VideoFrame};
use crate::geometry::{IndexWidth, SphereGeometry};
use crate::renderer::{DrawCall, GpuBackend};
use crate::shaders::{ShaderAssets, ShaderStage};
use crate::texture::{PlaneTextureDesc, TextureAllocator};
use crate::video::{DecodePoll, FrameDecoder};
use glam::Mat4;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    UploadMesh {
        vertices: usize,
        indices: usize,
        index_width: IndexWidth,
    },
    BuildProgram,
    Resize {
        width: u32,
        height: u32,
    },
    Clear,
    Draw {
        mvp: Mat4,
        luma: u64,
        chroma: u64,
        index_count: u32,
        index_width: IndexWidth,
    },
    Allocate {
        id: u64,
        desc: PlaneTextureDesc,
    },
    Write {
        id: u64,
        plane: PlaneIndex,
        bytes: usize,
    },
    Destroy {
        id: u64,
    },
    ReleaseMesh,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FakeTexture {
    pub id: u64,
    pub desc: PlaneTextureDesc,
}

/// Shared view of the commands a [`RecordingBackend`] received. Stays
/// readable after the backend (and its renderer) is dropped.
#[derive(Clone, Debug, Default)]
pub struct CommandLog {
    inner: Arc<Mutex<Vec<Command>>>,
}

impl CommandLog {
    fn push(&self, command: Command) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands().iter().filter(|c| pred(c)).count()
    }

    pub fn draws(&self) -> usize {
        self.count(|c| matches!(c, Command::Draw { .. }))
    }

    pub fn clears(&self) -> usize {
        self.count(|c| matches!(c, Command::Clear))
    }

    pub fn last_draw(&self) -> Option<Command> {
        self.commands()
            .into_iter()
            .rev()
            .find(|c| matches!(c, Command::Draw { .. }))
    }

    /// Ids allocated and not destroyed yet.
    pub fn live_textures(&self) -> HashSet<u64> {
        let mut live = HashSet::new();
        for command in self.commands() {
            match command {
                Command::Allocate { id, .. } => {
                    live.insert(id);
                }
                Command::Destroy { id } => {
                    live.remove(&id);
                }
                _ => {}
            }
        }
        live
    }
}

/// [`GpuBackend`] that logs calls and can be told to fail.
#[derive(Default)]
pub struct RecordingBackend {
    log: CommandLog,
    next_id: u64,
    fail_allocation: Option<PlaneIndex>,
    fail_program: bool,
    fail_draw: Option<FrameError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Every allocation for `plane` fails until cleared with `None`.
    pub fn fail_allocation(&mut self, plane: Option<PlaneIndex>) {
        self.fail_allocation = plane;
    }

    pub fn with_failing_program(mut self) -> Self {
        self.fail_program = true;
        self
    }

    pub fn fail_draw(&mut self, error: Option<FrameError>) {
        self.fail_draw = error;
    }
}

impl TextureAllocator for RecordingBackend {
    type Texture = FakeTexture;

    fn allocate_texture(&mut self, desc: &PlaneTextureDesc) -> Result<FakeTexture, TextureError> {
        if self.fail_allocation == Some(desc.plane) {
            return Err(TextureError::Allocation {
                plane: desc.plane,
                reason: "injected failure".into(),
            });
        }
        self.next_id += 1;
        let id = self.next_id;
        self.log.push(Command::Allocate { id, desc: *desc });
        Ok(FakeTexture { id, desc: *desc })
    }

    fn write_texture(
        &mut self,
        texture: &FakeTexture,
        desc: &PlaneTextureDesc,
        _plane: &Plane<'_>,
    ) -> Result<(), TextureError> {
        if texture.desc != *desc {
            return Err(TextureError::Allocation {
                plane: desc.plane,
                reason: format!("texture {} has shape {:?}", texture.id, texture.desc),
            });
        }
        self.log.push(Command::Write {
            id: texture.id,
            plane: desc.plane,
            bytes: desc.row_bytes() * desc.height as usize,
        });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: FakeTexture) {
        self.log.push(Command::Destroy { id: texture.id });
    }
}

impl GpuBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn upload_mesh(&mut self, geometry: &SphereGeometry) -> Result<(), SetupError> {
        self.log.push(Command::UploadMesh {
            vertices: geometry.vertex_count(),
            indices: geometry.index_count(),
            index_width: geometry.indices.index_width(),
        });
        Ok(())
    }

    fn build_program(&mut self, shaders: &dyn ShaderAssets) -> Result<(), SetupError> {
        shaders.wgsl()?;
        shaders.glsl(ShaderStage::Vertex)?;
        shaders.glsl(ShaderStage::Fragment)?;
        if self.fail_program {
            return Err(SetupError::ProgramLink("injected failure".into()));
        }
        self.log.push(Command::BuildProgram);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.push(Command::Resize { width, height });
    }

    fn clear(&mut self) -> Result<(), FrameError> {
        if let Some(e) = self.fail_draw.clone() {
            return Err(e);
        }
        self.log.push(Command::Clear);
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_, FakeTexture>) -> Result<(), FrameError> {
        if let Some(e) = self.fail_draw.clone() {
            return Err(e);
        }
        self.log.push(Command::Draw {
            mvp: *call.mvp,
            luma: call.textures.luma.id,
            chroma: call.textures.chroma.id,
            index_count: call.index_count,
            index_width: call.index_width,
        });
        Ok(())
    }

    fn release_mesh(&mut self) {
        self.log.push(Command::ReleaseMesh);
    }
}

/// Counters observable after the decoder has been moved into a source.
#[derive(Clone, Debug, Default)]
pub struct DecoderProbe {
    polls: Arc<AtomicUsize>,
    rewinds: Arc<AtomicUsize>,
}

impl DecoderProbe {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds.load(Ordering::SeqCst)
    }
}

/// In-memory [`FrameDecoder`] that replays a fixed list of frames.
pub struct ScriptedDecoder {
    frames: Vec<VideoFrame>,
    position: usize,
    pending_before_first: usize,
    rewind_fails: bool,
    probe: DecoderProbe,
}

impl ScriptedDecoder {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames,
            position: 0,
            pending_before_first: 0,
            rewind_fails: false,
            probe: DecoderProbe::default(),
        }
    }

    /// `count` solid frames of `width x height`, luma value = sequence number.
    pub fn solid(count: usize, width: u32, height: u32) -> Self {
        let frames = (0..count)
            .map(|i| {
                let mut f = VideoFrame::filled(width, height, i as u8, 128, 128);
                f.sequence = i as u64;
                f
            })
            .collect();
        Self::new(frames)
    }

    /// Report `Pending` for the first `polls` polls.
    pub fn with_pending(mut self, polls: usize) -> Self {
        self.pending_before_first = polls;
        self
    }

    /// Every rewind attempt is counted and then fails.
    pub fn with_failing_rewind(mut self) -> Self {
        self.rewind_fails = true;
        self
    }

    pub fn probe(&self) -> DecoderProbe {
        self.probe.clone()
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn poll_frame(&mut self) -> Result<DecodePoll, DecodeError> {
        self.probe.polls.fetch_add(1, Ordering::SeqCst);
        if self.pending_before_first > 0 {
            self.pending_before_first -= 1;
            return Ok(DecodePoll::Pending);
        }
        match self.frames.get(self.position) {
            Some(frame) => {
                self.position += 1;
                Ok(DecodePoll::Frame(frame.clone()))
            }
            None => Ok(DecodePoll::EndOfStream),
        }
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.probe.rewinds.fetch_add(1, Ordering::SeqCst);
        if self.rewind_fails {
            return Err(DecodeError::Io(std::io::Error::other("source closed")));
        }
        self.position = 0;
        Ok(())
    }
}
