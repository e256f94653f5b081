//! Bi-planar (NV12-style) video frames.
//!
//! A frame has a full-resolution luma plane with one byte per texel and a
//! half-resolution chroma plane with interleaved Cb/Cr byte pairs. Decoders
//! produce owned [`VideoFrame`]s; the renderer only ever sees a borrowed
//! [`PlanarFrame`], so it cannot hold on to decoder memory past one upload.

use crate::error::TextureError;

/// Plane slot inside a bi-planar buffer. Also the texture unit it binds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneIndex {
    Luma = 0,
    Chroma = 1,
}

impl PlaneIndex {
    pub const ALL: [PlaneIndex; 2] = [PlaneIndex::Luma, PlaneIndex::Chroma];

    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }
}

/// Texel layout of a plane texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneFormat {
    /// One 8-bit channel.
    R8,
    /// Two interleaved 8-bit channels.
    Rg8,
}

impl PlaneFormat {
    #[inline]
    pub fn bytes_per_texel(self) -> usize {
        match self {
            PlaneFormat::R8 => 1,
            PlaneFormat::Rg8 => 2,
        }
    }
}

/// Chroma extent for a `width x height` frame. Odd dimensions truncate.
#[inline]
pub fn chroma_extent(width: u32, height: u32) -> (u32, u32) {
    (width / 2, height / 2)
}

/// One plane of a borrowed frame.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of two consecutive rows.
    pub stride: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }

    /// Check the plane can back a `width x height` texture of `format`.
    pub fn check(
        &self,
        plane: PlaneIndex,
        format: PlaneFormat,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyPlane {
                plane,
                width,
                height,
            });
        }
        let row_bytes = width as usize * format.bytes_per_texel();
        if self.stride < row_bytes {
            return Err(TextureError::StrideTooShort {
                plane,
                stride: self.stride,
                row_bytes,
            });
        }
        let required = self.stride * (height as usize - 1) + row_bytes;
        if self.data.len() < required {
            return Err(TextureError::PlaneTooSmall {
                plane,
                required,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Borrowed view of a decoded frame, valid for one `update_texture` call.
#[derive(Clone, Copy, Debug)]
pub struct PlanarFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub luma: Plane<'a>,
    pub chroma: Plane<'a>,
}

impl<'a> PlanarFrame<'a> {
    pub fn plane(&self, index: PlaneIndex) -> Plane<'a> {
        match index {
            PlaneIndex::Luma => self.luma,
            PlaneIndex::Chroma => self.chroma,
        }
    }
}

/// Owned NV12 frame with tightly packed planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
    /// Interleaved Cb/Cr pairs, `chroma_extent` texels.
    pub chroma: Vec<u8>,
    /// Presentation index within the stream, restarting at 0 after a rewind.
    pub sequence: u64,
}

impl VideoFrame {
    /// Frame with every luma byte set to `y` and every chroma pair to `(u, v)`.
    pub fn filled(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let (cw, ch) = chroma_extent(width, height);
        let luma = vec![y; width as usize * height as usize];
        let mut chroma = Vec::with_capacity(cw as usize * ch as usize * 2);
        for _ in 0..(cw as usize * ch as usize) {
            chroma.push(u);
            chroma.push(v);
        }
        Self {
            width,
            height,
            luma,
            chroma,
            sequence: 0,
        }
    }

    pub fn luma_stride(&self) -> usize {
        self.width as usize
    }

    pub fn chroma_stride(&self) -> usize {
        chroma_extent(self.width, self.height).0 as usize * 2
    }

    pub fn as_planar(&self) -> PlanarFrame<'_> {
        PlanarFrame {
            width: self.width,
            height: self.height,
            luma: Plane::new(&self.luma, self.luma_stride()),
            chroma: Plane::new(&self.chroma, self.chroma_stride()),
        }
    }
}
