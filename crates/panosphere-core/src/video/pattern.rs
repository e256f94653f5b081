use super::FrameReader;
use crate::error::DecodeError;
use crate::frame::{chroma_extent, VideoFrame};

/// White, yellow, cyan, green, magenta, red, blue, black.
const BARS_RGB: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// BT.601 video-range `(Y, Cb, Cr)` for an RGB triple.
pub fn rgb_to_ycbcr([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
    let cb = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let cr = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    [y, cb, cr].map(|c| c.clamp(0, 255) as u8)
}

/// Synthetic colour bars that scroll one bar every `frames_per_bar` frames.
///
/// Wrapping the bars around the sphere makes the seam and the poles easy to
/// inspect without any media file.
#[derive(Clone, Debug)]
pub struct TestPattern {
    width: u32,
    height: u32,
    frame_rate: f64,
    frames_per_bar: u64,
    length: Option<u64>,
    next: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            width,
            height,
            frame_rate,
            frames_per_bar: 15,
            length: None,
            next: 0,
        }
    }

    /// End the stream after `frames` frames instead of running forever.
    pub fn with_length(mut self, frames: u64) -> Self {
        self.length = Some(frames);
        self
    }

    pub fn with_frames_per_bar(mut self, frames: u64) -> Self {
        self.frames_per_bar = frames.max(1);
        self
    }

    /// Frame `index` of the pattern.
    pub fn frame(&self, index: u64) -> VideoFrame {
        let (w, h) = (self.width as usize, self.height as usize);
        let shift = (index / self.frames_per_bar) as usize;
        let bar_width = (w / BARS_RGB.len()).max(1);
        let bar_at = |col: usize| rgb_to_ycbcr(BARS_RGB[(col / bar_width + shift) % BARS_RGB.len()]);

        let luma_row: Vec<u8> = (0..w).map(|col| bar_at(col)[0]).collect();
        let mut luma = Vec::with_capacity(w * h);
        for _ in 0..h {
            luma.extend_from_slice(&luma_row);
        }

        let (cw, ch) = chroma_extent(self.width, self.height);
        let chroma_row: Vec<u8> = (0..cw as usize)
            .flat_map(|col| {
                let [_, cb, cr] = bar_at(col * 2);
                [cb, cr]
            })
            .collect();
        let mut chroma = Vec::with_capacity(chroma_row.len() * ch as usize);
        for _ in 0..ch {
            chroma.extend_from_slice(&chroma_row);
        }

        VideoFrame {
            width: self.width,
            height: self.height,
            luma,
            chroma,
            sequence: index,
        }
    }
}

impl FrameReader for TestPattern {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, DecodeError> {
        if self.length.is_some_and(|len| self.next >= len) {
            return Ok(None);
        }
        let frame = self.frame(self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.next = 0;
        Ok(())
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }
}
