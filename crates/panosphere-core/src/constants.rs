// Shared tuning constants used by the renderer, the frame source and both native backends.

// Viewer defaults
pub const DEFAULT_FIELD_OF_VIEW_DEG: f32 = 60.0;
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 60;
pub const DEFAULT_SPHERE_SLICES: u32 = 200;
pub const DEFAULT_TOUCH_SENSITIVITY: f32 = 0.005; // radians per pixel of drag
pub const DEFAULT_LOOP_PLAYBACK: bool = true;

// Slice count bounds enforced by `ViewerConfig::validate`
pub const MIN_SPHERE_SLICES: u32 = 4;
pub const MAX_SPHERE_SLICES: u32 = 1024;

// Projection
pub const NEAR_Z: f32 = 0.1;
pub const FAR_Z: f32 = 100.0;

// Sphere
pub const SPHERE_RADIUS: f32 = 1.0;

// Viewport used until the driver reports a real size (portrait phone).
pub const DEFAULT_VIEWPORT: [u32; 2] = [375, 667];

// Background shown when no video frame has been uploaded yet.
pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

// Bindings shared by the WGSL and GLSL programs
pub const LUMA_TEXTURE_UNIT: u32 = 0;
pub const CHROMA_TEXTURE_UNIT: u32 = 1;
pub const POSITION_LOCATION: u32 = 0;
pub const TEX_COORD_LOCATION: u32 = 1;
