//! Projection and rotation helpers.
//!
//! These reproduce the GLKit matrix conventions column for column (right
//! handed, OpenGL clip space with z in [-1, 1]). Video shaders and existing
//! assets were tuned against that exact output, so the matrices are built
//! explicitly instead of going through a general-purpose constructor.

use crate::constants::{FAR_Z, NEAR_Z};
use glam::{Mat4, Vec4};

#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Symmetric perspective frustum, column-major.
pub fn perspective(fov_y_radians: f32, aspect: f32, near_z: f32, far_z: f32) -> Mat4 {
    let y_scale = 1.0 / (fov_y_radians * 0.5).tan();
    let x_scale = y_scale / aspect;
    let z_range = far_z - near_z;
    let z_scale = -(far_z + near_z) / z_range;
    let wz_scale = -2.0 * far_z * near_z / z_range;
    Mat4::from_cols(
        Vec4::new(x_scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y_scale, 0.0, 0.0),
        Vec4::new(0.0, 0.0, z_scale, -1.0),
        Vec4::new(0.0, 0.0, wz_scale, 0.0),
    )
}

/// Right-hand rotation about +X.
pub fn rotation_x(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, c, s, 0.0),
        Vec4::new(0.0, -s, c, 0.0),
        Vec4::W,
    )
}

/// Right-hand rotation about +Y.
pub fn rotation_y(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    Mat4::from_cols(
        Vec4::new(c, 0.0, -s, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(s, 0.0, c, 0.0),
        Vec4::W,
    )
}

/// `|width / height|`, or `None` for a zero-height (or non-finite) viewport.
pub fn aspect_ratio(width: f32, height: f32) -> Option<f32> {
    let aspect = (width / height).abs();
    (aspect.is_finite() && aspect > 0.0).then_some(aspect)
}

/// `perspective * (rotation_y(rotation_y_rad) * rotation_x(rotation_x_rad))`.
///
/// X is applied to the identity first, then Y, then the projection. Swapping
/// the rotations still renders but turns the camera around the wrong axis.
pub fn model_view_projection(
    field_of_view_deg: f32,
    aspect: f32,
    rotation_x_rad: f32,
    rotation_y_rad: f32,
) -> Mat4 {
    let projection = perspective(degrees_to_radians(field_of_view_deg), aspect, NEAR_Z, FAR_Z);
    let mut model_view = Mat4::IDENTITY;
    model_view = rotation_x(rotation_x_rad) * model_view;
    model_view = rotation_y(rotation_y_rad) * model_view;
    projection * model_view
}
