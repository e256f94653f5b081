use std::sync::{Arc, Mutex, PoisonError};

/// Accumulated look-around angles in radians. Unbounded; trig wraps them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
}

impl RotationState {
    /// Apply a drag of `(dx, dy)` pixels. Vertical drags pitch around X,
    /// horizontal drags yaw around Y, both inverted so content follows the finger.
    pub fn apply_drag(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.x += -sensitivity * dy;
        self.y += -sensitivity * dx;
    }
}

/// Rotation shared between the input path and the render tick.
///
/// The pair is read and written under one lock so a tick never sees an
/// x from one drag and a y from another.
#[derive(Clone, Debug, Default)]
pub struct SharedRotation {
    inner: Arc<Mutex<RotationState>>,
}

impl SharedRotation {
    pub fn new(initial: RotationState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn drag(&self, dx: f32, dy: f32, sensitivity: f32) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.apply_drag(dx, dy, sensitivity);
    }

    pub fn snapshot(&self) -> RotationState {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = RotationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_maps_axes_with_inverted_sign() {
        let mut r = RotationState::default();
        r.apply_drag(10.0, -4.0, 0.005);
        assert!((r.y - -0.05).abs() < 1e-7);
        assert!((r.x - 0.02).abs() < 1e-7);
    }

    #[test]
    fn shared_rotation_accumulates_across_threads() {
        let shared = SharedRotation::default();
        let writer = shared.clone();
        std::thread::spawn(move || {
            for _ in 0..100 {
                writer.drag(1.0, 1.0, 0.01);
            }
        })
        .join()
        .unwrap();
        let snap = shared.snapshot();
        assert!((snap.x - -1.0).abs() < 1e-4);
        assert!((snap.y - -1.0).abs() < 1e-4);
        shared.reset();
        assert_eq!(shared.snapshot(), RotationState::default());
    }
}
