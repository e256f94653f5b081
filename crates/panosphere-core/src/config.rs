use crate::constants::*;
use crate::error::ConfigError;
use std::time::Duration;

/// Playback and camera options read once by the renderer and the frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    /// Rate at which the frame source asks the decoder for new data.
    pub frames_per_second: u32,
    /// Longitude divisions of the sphere mesh.
    pub sphere_slices: u32,
    /// Radians of rotation per pixel of drag.
    pub touch_sensitivity: f32,
    pub loop_playback: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            field_of_view: DEFAULT_FIELD_OF_VIEW_DEG,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            sphere_slices: DEFAULT_SPHERE_SLICES,
            touch_sensitivity: DEFAULT_TOUCH_SENSITIVITY,
            loop_playback: DEFAULT_LOOP_PLAYBACK,
        }
    }
}

impl ViewerConfig {
    /// Check every field and hand the config back if it is usable.
    ///
    /// Slice counts below [`MIN_SPHERE_SLICES`] or odd counts are rejected here
    /// so the sphere generator never sees a degenerate request.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(ConfigError::FieldOfView(self.field_of_view));
        }
        if self.frames_per_second == 0 {
            return Err(ConfigError::FramesPerSecond);
        }
        let slices = self.sphere_slices;
        if slices < MIN_SPHERE_SLICES || slices > MAX_SPHERE_SLICES || slices % 2 != 0 {
            return Err(ConfigError::SphereSlices {
                got: slices,
                min: MIN_SPHERE_SLICES,
                max: MAX_SPHERE_SLICES,
            });
        }
        if !self.touch_sensitivity.is_finite() {
            return Err(ConfigError::TouchSensitivity(self.touch_sensitivity));
        }
        Ok(self)
    }

    /// Minimum spacing between two decoder polls.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frames_per_second.max(1) as f64)
    }
}
