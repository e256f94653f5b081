//! UV-sphere mesh used as the projection surface for equirectangular video.
//!
//! The generator keeps the layout of the classic OpenGL ES sample sphere:
//! one shared angle step for latitude and longitude, a duplicated seam column
//! so texture coordinates run 0..1 without wrapping, and triangles wound so
//! they face the centre of the sphere.

use std::f32::consts::PI;

/// Triangle indices, 16-bit while every vertex is addressable that way.
#[derive(Clone, Debug, PartialEq)]
pub enum SphereIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl SphereIndices {
    pub fn len(&self) -> usize {
        match self {
            SphereIndices::U16(v) => v.len(),
            SphereIndices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at `i` widened to `u32`.
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            SphereIndices::U16(v) => v.get(i).map(|&x| x as u32),
            SphereIndices::U32(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SphereIndices::U16(v) => bytemuck::cast_slice(v),
            SphereIndices::U32(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn index_width(&self) -> IndexWidth {
        match self {
            SphereIndices::U16(_) => IndexWidth::U16,
            SphereIndices::U32(_) => IndexWidth::U32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

/// Immutable sphere mesh: positions and texture coordinates share one order.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereGeometry {
    /// `[x, y, z]` per vertex.
    pub positions: Vec<[f32; 3]>,
    /// `[u, v]` per vertex.
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: SphereIndices,
}

impl SphereGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn tex_coords_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tex_coords)
    }

    /// Build a UV sphere with `num_slices` longitude steps.
    ///
    /// `num_slices < 2` has no usable parallels and yields an empty mesh.
    pub fn generate(num_slices: u32, radius: f32) -> Self {
        if num_slices < 2 {
            return Self {
                positions: Vec::new(),
                tex_coords: Vec::new(),
                indices: SphereIndices::U16(Vec::new()),
            };
        }
        let slices = num_slices as usize;
        let parallels = slices / 2;
        let columns = slices + 1;
        let vertex_count = (parallels + 1) * columns;
        let index_count = parallels * slices * 6;
        let angle_step = (2.0 * PI) / num_slices as f32;

        let mut positions = Vec::with_capacity(vertex_count);
        let mut tex_coords = Vec::with_capacity(vertex_count);
        for i in 0..=parallels {
            let (sin_i, cos_i) = (angle_step * i as f32).sin_cos();
            for j in 0..=slices {
                let (sin_j, cos_j) = (angle_step * j as f32).sin_cos();
                positions.push([radius * sin_i * cos_j, radius * cos_i, radius * sin_i * sin_j]);
                tex_coords.push([j as f32 / slices as f32, i as f32 / parallels as f32]);
            }
        }

        let mut quads = Vec::with_capacity(index_count);
        for i in 0..parallels {
            for j in 0..slices {
                let top_left = (i * columns + j) as u32;
                let bottom_left = ((i + 1) * columns + j) as u32;
                let bottom_right = ((i + 1) * columns + j + 1) as u32;
                let top_right = (i * columns + j + 1) as u32;
                // Clockwise seen from the centre: the visible side faces inward.
                quads.extend_from_slice(&[
                    top_left,
                    bottom_right,
                    bottom_left,
                    top_left,
                    top_right,
                    bottom_right,
                ]);
            }
        }

        let indices = if vertex_count <= u16::MAX as usize + 1 {
            SphereIndices::U16(quads.into_iter().map(|i| i as u16).collect())
        } else {
            SphereIndices::U32(quads)
        };

        Self {
            positions,
            tex_coords,
            indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_slices_layout() {
        let g = SphereGeometry::generate(4, 1.0);
        assert_eq!(g.vertex_count(), 3 * 5);
        assert_eq!(g.index_count(), 2 * 4 * 6);
        // First quad of the first ring.
        let first: Vec<u32> = g.indices.iter().take(6).collect();
        assert_eq!(first, vec![0, 6, 5, 0, 1, 6]);
        // North pole sits on +Y.
        assert!((g.positions[0][1] - 1.0).abs() < 1e-6);
        assert_eq!(g.tex_coords[5], [0.0, 0.5]);
    }

    #[test]
    fn seam_column_repeats_first_column() {
        let g = SphereGeometry::generate(10, 1.0);
        let columns = 11;
        for ring in 0..=5 {
            let first = g.positions[ring * columns];
            let last = g.positions[ring * columns + 10];
            for k in 0..3 {
                assert!((first[k] - last[k]).abs() < 1e-5);
            }
            assert_eq!(g.tex_coords[ring * columns][0], 0.0);
            assert_eq!(g.tex_coords[ring * columns + 10][0], 1.0);
        }
    }

    #[test]
    fn large_meshes_switch_to_wide_indices() {
        assert_eq!(
            SphereGeometry::generate(200, 1.0).indices.index_width(),
            IndexWidth::U16
        );
        assert_eq!(
            SphereGeometry::generate(400, 1.0).indices.index_width(),
            IndexWidth::U32
        );
    }
}
