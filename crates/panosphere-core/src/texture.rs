//! Per-frame luma/chroma texture handling.
//!
//! [`TextureUploader`] owns the pair bound for the current frame and swaps it
//! for a new one on every `update`. Released textures go back to a
//! [`TexturePool`] keyed by plane slot, so a steady stream of same-sized frames
//! reuses two GPU textures instead of allocating new ones every tick.
//! Backends only provide the raw allocate/write/destroy calls through
//! [`TextureAllocator`].

use crate::error::TextureError;
use crate::frame::{chroma_extent, PlanarFrame, Plane, PlaneFormat, PlaneIndex};

/// Shape of the texture backing one plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaneTextureDesc {
    pub plane: PlaneIndex,
    pub format: PlaneFormat,
    pub width: u32,
    pub height: u32,
}

impl PlaneTextureDesc {
    pub fn luma(frame: &PlanarFrame<'_>) -> Self {
        Self {
            plane: PlaneIndex::Luma,
            format: PlaneFormat::R8,
            width: frame.width,
            height: frame.height,
        }
    }

    pub fn chroma(frame: &PlanarFrame<'_>) -> Self {
        let (width, height) = chroma_extent(frame.width, frame.height);
        Self {
            plane: PlaneIndex::Chroma,
            format: PlaneFormat::Rg8,
            width,
            height,
        }
    }

    pub fn for_plane(frame: &PlanarFrame<'_>, plane: PlaneIndex) -> Self {
        match plane {
            PlaneIndex::Luma => Self::luma(frame),
            PlaneIndex::Chroma => Self::chroma(frame),
        }
    }

    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_texel()
    }
}

/// GPU-side texture primitives a backend must supply.
pub trait TextureAllocator {
    type Texture;

    fn allocate_texture(&mut self, desc: &PlaneTextureDesc) -> Result<Self::Texture, TextureError>;

    /// Copy `plane` (already validated against `desc`) into `texture`.
    fn write_texture(
        &mut self,
        texture: &Self::Texture,
        desc: &PlaneTextureDesc,
        plane: &Plane<'_>,
    ) -> Result<(), TextureError>;

    fn destroy_texture(&mut self, texture: Self::Texture);
}

/// A texture checked out of the pool together with its shape.
#[derive(Debug)]
pub struct PooledTexture<T> {
    pub texture: T,
    pub desc: PlaneTextureDesc,
}

struct IdleEntry<T> {
    texture: PooledTexture<T>,
    /// Survived one flush already; the next flush destroys it.
    stale: bool,
}

/// Counters for leak checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Checked out and not yet recycled.
    pub live: usize,
    /// Parked in the pool waiting for reuse.
    pub idle: usize,
    pub allocated_total: u64,
    pub reused_total: u64,
    pub destroyed_total: u64,
}

/// One cached texture per plane slot.
pub struct TexturePool<T> {
    idle: [Option<IdleEntry<T>>; 2],
    stats: PoolStats,
}

impl<T> Default for TexturePool<T> {
    fn default() -> Self {
        Self {
            idle: [None, None],
            stats: PoolStats::default(),
        }
    }
}

impl<T> TexturePool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Texture for `desc` holding the contents of `plane`.
    pub fn acquire<A>(
        &mut self,
        alloc: &mut A,
        desc: PlaneTextureDesc,
        plane: &Plane<'_>,
    ) -> Result<PooledTexture<T>, TextureError>
    where
        A: TextureAllocator<Texture = T>,
    {
        plane.check(desc.plane, desc.format, desc.width, desc.height)?;
        let slot = desc.plane.slot();
        let pooled = match self.idle[slot].take() {
            Some(entry) if entry.texture.desc == desc => {
                self.stats.idle -= 1;
                self.stats.reused_total += 1;
                entry.texture
            }
            other => {
                if let Some(entry) = other {
                    self.stats.idle -= 1;
                    self.destroy(alloc, entry.texture);
                }
                let texture = alloc.allocate_texture(&desc)?;
                self.stats.allocated_total += 1;
                PooledTexture { texture, desc }
            }
        };
        if let Err(e) = alloc.write_texture(&pooled.texture, &desc, plane) {
            self.destroy(alloc, pooled);
            return Err(e);
        }
        self.stats.live += 1;
        Ok(pooled)
    }

    /// Return a texture for reuse by the next frame.
    pub fn recycle<A>(&mut self, alloc: &mut A, texture: PooledTexture<T>)
    where
        A: TextureAllocator<Texture = T>,
    {
        self.stats.live = self.stats.live.saturating_sub(1);
        let slot = texture.desc.plane.slot();
        if let Some(previous) = self.idle[slot].take() {
            self.stats.idle -= 1;
            self.destroy(alloc, previous.texture);
        }
        self.idle[slot] = Some(IdleEntry {
            texture,
            stale: false,
        });
        self.stats.idle += 1;
    }

    /// Age idle entries; entries already idle at the previous flush are destroyed.
    pub fn flush<A>(&mut self, alloc: &mut A)
    where
        A: TextureAllocator<Texture = T>,
    {
        for slot in 0..self.idle.len() {
            match self.idle[slot].take() {
                Some(entry) if entry.stale => {
                    self.stats.idle -= 1;
                    self.destroy(alloc, entry.texture);
                }
                Some(mut entry) => {
                    entry.stale = true;
                    self.idle[slot] = Some(entry);
                }
                None => {}
            }
        }
    }

    /// Destroy every idle texture.
    pub fn purge<A>(&mut self, alloc: &mut A)
    where
        A: TextureAllocator<Texture = T>,
    {
        for slot in 0..self.idle.len() {
            if let Some(entry) = self.idle[slot].take() {
                self.stats.idle -= 1;
                self.destroy(alloc, entry.texture);
            }
        }
    }

    fn destroy<A>(&mut self, alloc: &mut A, texture: PooledTexture<T>)
    where
        A: TextureAllocator<Texture = T>,
    {
        alloc.destroy_texture(texture.texture);
        self.stats.destroyed_total += 1;
    }
}

/// Borrowed luma/chroma pair ready to bind.
#[derive(Debug)]
pub struct TexturePair<'a, T> {
    pub luma: &'a T,
    pub chroma: &'a T,
}

impl<T> Clone for TexturePair<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TexturePair<'_, T> {}

/// Holds the textures for the frame currently on screen.
pub struct TextureUploader<T> {
    luma: Option<PooledTexture<T>>,
    chroma: Option<PooledTexture<T>>,
}

impl<T> Default for TextureUploader<T> {
    fn default() -> Self {
        Self {
            luma: None,
            chroma: None,
        }
    }
}

impl<T> TextureUploader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bound pair with textures built from `frame`.
    ///
    /// The previous pair is always released first. If either plane fails,
    /// whatever this call created is released again and nothing stays bound.
    pub fn update<A>(
        &mut self,
        frame: &PlanarFrame<'_>,
        pool: &mut TexturePool<T>,
        alloc: &mut A,
    ) -> Result<(), TextureError>
    where
        A: TextureAllocator<Texture = T>,
    {
        self.release(pool, alloc);
        pool.flush(alloc);

        let luma = pool.acquire(alloc, PlaneTextureDesc::luma(frame), &frame.luma)?;
        let chroma = match pool.acquire(alloc, PlaneTextureDesc::chroma(frame), &frame.chroma) {
            Ok(chroma) => chroma,
            Err(e) => {
                pool.recycle(alloc, luma);
                return Err(e);
            }
        };
        self.luma = Some(luma);
        self.chroma = Some(chroma);
        Ok(())
    }

    /// Hand the bound textures back to the pool.
    pub fn release<A>(&mut self, pool: &mut TexturePool<T>, alloc: &mut A)
    where
        A: TextureAllocator<Texture = T>,
    {
        if let Some(t) = self.luma.take() {
            pool.recycle(alloc, t);
        }
        if let Some(t) = self.chroma.take() {
            pool.recycle(alloc, t);
        }
    }

    /// Both textures, or `None` while either is missing.
    pub fn bound(&self) -> Option<TexturePair<'_, T>> {
        match (&self.luma, &self.chroma) {
            (Some(l), Some(c)) => Some(TexturePair {
                luma: &l.texture,
                chroma: &c.texture,
            }),
            _ => None,
        }
    }

    pub fn bound_descs(&self) -> Option<(PlaneTextureDesc, PlaneTextureDesc)> {
        match (&self.luma, &self.chroma) {
            (Some(l), Some(c)) => Some((l.desc, c.desc)),
            _ => None,
        }
    }
}
