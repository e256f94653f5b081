//! Video frame sources.
//!
//! Decoding happens off the render thread. The render tick only calls
//! [`VideoFrameSource::pull_current_frame`], which asks the decoder for new
//! data at most once per frame interval and never waits for it.

mod decoder;
mod pattern;
mod y4m;

pub use decoder::ThreadedDecoder;
pub use pattern::TestPattern;
pub use y4m::Y4mReader;

use crate::error::DecodeError;
use crate::frame::{PlanarFrame, VideoFrame};
use instant::Instant;
use std::time::Duration;

/// Result of a non-blocking decoder poll.
#[derive(Debug)]
pub enum DecodePoll {
    Frame(VideoFrame),
    /// Nothing new yet.
    Pending,
    EndOfStream,
}

/// Non-blocking decoder as seen from the render thread.
pub trait FrameDecoder: Send {
    fn poll_frame(&mut self) -> Result<DecodePoll, DecodeError>;
    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<(), DecodeError>;
}

/// Blocking, sequential frame producer. Run it through [`ThreadedDecoder`]
/// to get a [`FrameDecoder`].
pub trait FrameReader: Send {
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, DecodeError>;
    fn rewind(&mut self) -> Result<(), DecodeError>;
    /// Nominal presentation rate in frames per second.
    fn frame_rate(&self) -> f64;
}

pub type FinishedHandler = Box<dyn FnMut() + Send>;

/// Playback policy around a [`FrameDecoder`].
pub struct VideoFrameSource<D: FrameDecoder> {
    decoder: Option<D>,
    poll_interval: Duration,
    loop_playback: bool,
    playing: bool,
    finished: bool,
    last_poll: Option<Instant>,
    current: Option<VideoFrame>,
    on_finished: Option<FinishedHandler>,
}

impl<D: FrameDecoder> VideoFrameSource<D> {
    pub fn new(decoder: D, frames_per_second: u32, loop_playback: bool) -> Self {
        Self {
            decoder: Some(decoder),
            poll_interval: Duration::from_secs_f64(1.0 / frames_per_second.max(1) as f64),
            loop_playback,
            playing: false,
            finished: false,
            last_poll: None,
            current: None,
            on_finished: None,
        }
    }

    /// Called once when a non-looping stream runs out.
    pub fn on_finished(&mut self, handler: impl FnMut() + Send + 'static) {
        self.on_finished = Some(Box::new(handler));
    }

    /// Begin or resume playback. A finished stream restarts from the top.
    pub fn start(&mut self) {
        let Some(decoder) = self.decoder.as_mut() else {
            log::warn!("[video] start ignored: source was stopped");
            return;
        };
        if self.finished {
            if let Err(e) = decoder.rewind() {
                log::warn!("[video] rewind failed on restart: {e}");
                return;
            }
            self.finished = false;
        }
        self.playing = true;
        self.last_poll = None;
        log::info!("[video] playing");
    }

    pub fn pause(&mut self) {
        if self.playing {
            log::info!("[video] paused");
        }
        self.playing = false;
    }

    /// Drop the decoder and the last frame. The source cannot be restarted.
    pub fn stop(&mut self) {
        self.playing = false;
        self.current = None;
        if self.decoder.take().is_some() {
            log::info!("[video] stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_stopped(&self) -> bool {
        self.decoder.is_none()
    }

    /// The most recent frame, whether or not it was already handed out.
    pub fn current_frame(&self) -> Option<PlanarFrame<'_>> {
        self.current.as_ref().map(VideoFrame::as_planar)
    }

    /// A frame that arrived since the last pull, or `None`.
    ///
    /// The decoder is polled at most once per `1 / fps`; between polls and
    /// while the decoder has nothing ready this returns `None` and the caller
    /// keeps showing what it already has.
    pub fn pull_current_frame(&mut self, now: Instant) -> Option<PlanarFrame<'_>> {
        if !self.playing {
            return None;
        }
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.poll_interval {
                return None;
            }
        }
        self.last_poll = Some(now);

        let fresh = self.poll_decoder()?;
        self.current = Some(fresh);
        self.current_frame()
    }

    fn poll_decoder(&mut self) -> Option<VideoFrame> {
        let decoder = self.decoder.as_mut()?;
        match decoder.poll_frame() {
            Ok(DecodePoll::Frame(frame)) => Some(frame),
            Ok(DecodePoll::Pending) => None,
            Ok(DecodePoll::EndOfStream) => self.end_of_stream(),
            Err(e) => {
                log::warn!("[video] decode failed: {e}");
                None
            }
        }
    }

    fn end_of_stream(&mut self) -> Option<VideoFrame> {
        if !self.loop_playback {
            log::info!("[video] end of stream");
            self.finish();
            return None;
        }

        let decoder = self.decoder.as_mut()?;
        log::debug!("[video] end of stream, looping");
        if let Err(e) = decoder.rewind() {
            log::warn!("[video] rewind failed, stopping: {e}");
            self.finish();
            return None;
        }
        // One more poll so the first frame can show up in the same tick.
        match decoder.poll_frame() {
            Ok(DecodePoll::Frame(frame)) => Some(frame),
            Ok(DecodePoll::Pending) => None,
            Ok(DecodePoll::EndOfStream) => {
                log::warn!("[video] stream is empty after rewind");
                None
            }
            Err(e) => {
                log::warn!("[video] decode failed after rewind: {e}");
                None
            }
        }
    }

    fn finish(&mut self) {
        self.playing = false;
        self.finished = true;
        if let Some(handler) = self.on_finished.as_mut() {
            handler();
        }
    }
}
