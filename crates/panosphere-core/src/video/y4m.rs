//! YUV4MPEG2 reader.
//!
//! Only 4:2:0 chroma is accepted. The three I420 planes of every frame are
//! repacked into NV12: luma as-is, Cb/Cr interleaved at `width/2 x height/2`.

use super::FrameReader;
use crate::error::DecodeError;
use crate::frame::{chroma_extent, VideoFrame};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const MAGIC: &str = "YUV4MPEG2";
const FRAME_TAG: &str = "FRAME";
const MAX_HEADER_LEN: usize = 1024;
// Largest accepted width or height; buffers are sized from the header.
const MAX_FRAME_DIMENSION: u32 = 16384;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Y4mHeader {
    pub width: u32,
    pub height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
}

impl Y4mHeader {
    fn parse(line: &str) -> Result<Self, DecodeError> {
        let mut tokens = line.split_ascii_whitespace();
        if tokens.next() != Some(MAGIC) {
            return Err(DecodeError::Format("missing YUV4MPEG2 signature".into()));
        }
        let mut width = None;
        let mut height = None;
        let mut rate = (25, 1);
        for token in tokens {
            let mut chars = token.chars();
            let tag = chars.next();
            let value = chars.as_str();
            match tag {
                Some('W') => width = Some(parse_number(value, "width")?),
                Some('H') => height = Some(parse_number(value, "height")?),
                Some('F') => {
                    let (num, den) = value
                        .split_once(':')
                        .ok_or_else(|| DecodeError::Format(format!("bad frame rate `{value}`")))?;
                    rate = (parse_number(num, "frame rate")?, parse_number(den, "frame rate")?);
                }
                Some('C') if !value.starts_with("420") => {
                    return Err(DecodeError::Unsupported(format!("chroma layout C{value}")));
                }
                _ => {}
            }
        }
        let width = width.ok_or_else(|| DecodeError::Format("missing width".into()))?;
        let height = height.ok_or_else(|| DecodeError::Format("missing height".into()))?;
        if width == 0 || height == 0 {
            return Err(DecodeError::Format(format!("empty frame size {width}x{height}")));
        }
        if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
            return Err(DecodeError::Unsupported(format!(
                "frame size {width}x{height} exceeds {MAX_FRAME_DIMENSION} per side"
            )));
        }
        if rate.0 == 0 || rate.1 == 0 {
            return Err(DecodeError::Format(format!("bad frame rate {}:{}", rate.0, rate.1)));
        }
        Ok(Self {
            width,
            height,
            frame_rate_num: rate.0,
            frame_rate_den: rate.1,
        })
    }

    fn luma_len(&self) -> Result<usize, DecodeError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| {
                DecodeError::Unsupported(format!("frame size {}x{}", self.width, self.height))
            })
    }

    /// Size of one I420 chroma plane as stored in the file (rounded up).
    fn stored_chroma_len(&self) -> usize {
        self.width.div_ceil(2) as usize * self.height.div_ceil(2) as usize
    }
}

fn parse_number(value: &str, what: &str) -> Result<u32, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::Format(format!("bad {what} `{value}`")))
}

pub struct Y4mReader<R: Read + Seek> {
    input: BufReader<R>,
    header: Y4mHeader,
    data_start: u64,
    sequence: u64,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl Y4mReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        log::info!("[video] opening {}", path.display());
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> Y4mReader<R> {
    pub fn new(input: R) -> Result<Self, DecodeError> {
        let mut input = BufReader::new(input);
        let line = read_line(&mut input)?
            .ok_or_else(|| DecodeError::Format("empty stream".into()))?;
        let header = Y4mHeader::parse(&line)?;
        let data_start = line.len() as u64 + 1;
        log::info!(
            "[video] y4m {}x{} @ {}/{} fps",
            header.width,
            header.height,
            header.frame_rate_num,
            header.frame_rate_den
        );
        Ok(Self {
            input,
            y: vec![0; header.luma_len()?],
            u: vec![0; header.stored_chroma_len()],
            v: vec![0; header.stored_chroma_len()],
            header,
            data_start,
            sequence: 0,
        })
    }

    pub fn header(&self) -> Y4mHeader {
        self.header
    }

    fn to_nv12(&self) -> VideoFrame {
        let Y4mHeader { width, height, .. } = self.header;
        let (cw, ch) = chroma_extent(width, height);
        let stored_cw = width.div_ceil(2) as usize;
        let mut chroma = Vec::with_capacity(cw as usize * ch as usize * 2);
        for row in 0..ch as usize {
            let start = row * stored_cw;
            let u = &self.u[start..start + cw as usize];
            let v = &self.v[start..start + cw as usize];
            for (&cb, &cr) in u.iter().zip(v) {
                chroma.push(cb);
                chroma.push(cr);
            }
        }
        VideoFrame {
            width,
            height,
            luma: self.y.clone(),
            chroma,
            sequence: self.sequence,
        }
    }
}

impl<R: Read + Seek + Send> FrameReader for Y4mReader<R> {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, DecodeError> {
        let Some(line) = read_line(&mut self.input)? else {
            return Ok(None);
        };
        if !line.starts_with(FRAME_TAG) {
            return Err(DecodeError::Format(format!(
                "expected FRAME marker at frame {}",
                self.sequence
            )));
        }
        let truncated = |e: std::io::Error| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                DecodeError::Format("stream ends inside a frame".into())
            }
            _ => DecodeError::Io(e),
        };
        self.input.read_exact(&mut self.y).map_err(truncated)?;
        self.input.read_exact(&mut self.u).map_err(truncated)?;
        self.input.read_exact(&mut self.v).map_err(truncated)?;

        let frame = self.to_nv12();
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.input.seek(SeekFrom::Start(self.data_start))?;
        self.sequence = 0;
        Ok(())
    }

    fn frame_rate(&self) -> f64 {
        self.header.frame_rate_num as f64 / self.header.frame_rate_den as f64
    }
}

/// One `\n`-terminated ASCII line without the terminator, `None` at a clean EOF.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, DecodeError> {
    let mut raw = Vec::new();
    let n = input
        .by_ref()
        .take(MAX_HEADER_LEN as u64 + 1)
        .read_until(b'\n', &mut raw)?;
    if n == 0 {
        return Ok(None);
    }
    if raw.last() != Some(&b'\n') {
        return Err(DecodeError::Format("unterminated header line".into()));
    }
    raw.pop();
    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| DecodeError::Format("header is not ASCII".into()))
}
