// Strong typing over strings. Newtypes for timestamps and frame indices, serde config from JS.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// From a `performance.now()` style reading. Negative or NaN readings clamp to zero.
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp((ms * 1000.0) as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_add_micros(&self, us: u64) -> Self {
        Timestamp(self.0.saturating_add(us))
    }
}

/// Frame index into the image sequence. Always in `[0, frame_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct FrameIndex(u32);

impl FrameIndex {
    pub fn new(index: u32) -> Self {
        FrameIndex(index)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Move `steps` frames around a ring of `frame_count` frames, wrapping both ways.
    pub fn wrapping_offset(&self, steps: i64, frame_count: u32) -> Self {
        if frame_count == 0 {
            return FrameIndex(0);
        }
        let count = i64::from(frame_count);
        let wrapped = (i64::from(self.0) + steps.rem_euclid(count)).rem_euclid(count);
        FrameIndex(wrapped as u32)
    }
}

/// Translation applied to the zoomed image, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    pub const ZERO: PanOffset = PanOffset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        PanOffset { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Signed pointer movement between two consecutive samples of a drag.
///
/// Measured as `previous - current`, so a pointer moving left yields a
/// positive `dx`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DragDelta {
    pub dx: f64,
    pub dy: f64,
}

impl DragDelta {
    pub fn new(dx: f64, dy: f64) -> Self {
        DragDelta { dx, dy }
    }
}

/// Which input device opened a drag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// A single touch contact in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

/// Pointer event forwarded from the host surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PointerEvent {
    MouseDown { x: f64, y: f64 },
    MouseMove { x: f64, y: f64 },
    MouseUp,
    /// Pointer left the interactive surface.
    MouseLeave,
    /// Only the first touch is tracked.
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd,
    /// Positive `delta_y` scrolls down, which zooms out.
    Wheel { delta_y: f64 },
    HotspotEnter,
    HotspotLeave,
}

/// Interaction mode, derived from zoom level alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Zoom at minimum: horizontal drags scrub through frames.
    Rotate,
    /// Zoomed in: drags move the image.
    Pan,
}

/// Cursor the render surface should show over the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStyle {
    Default,
    Grab,
    Grabbing,
    Pointer,
}

impl CursorStyle {
    pub fn as_css(&self) -> &'static str {
        match self {
            CursorStyle::Default => "default",
            CursorStyle::Grab => "grab",
            CursorStyle::Grabbing => "grabbing",
            CursorStyle::Pointer => "pointer",
        }
    }
}

/// Viewer configuration passed from JS. Immutable for the lifetime of a mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Base path; frame `i` loads from `{image_path}{i + 1}.{image_extension}`.
    pub image_path: String,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    /// Pixels of horizontal drag per frame step.
    #[serde(default = "default_frame_sensitivity")]
    pub frame_sensitivity: f64,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f64,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    /// Maximum pan distance on each axis (pixels).
    #[serde(default = "default_pan_limit")]
    pub pan_limit: f64,
    #[serde(default = "default_auto_rotate_interval_ms")]
    pub auto_rotate_interval_ms: u32,
    /// Reset pan on every zoom-in instead of only when leaving or reaching the minimum.
    #[serde(default)]
    pub reset_pan_on_every_zoom_in: bool,
    /// Upper bound on ticks applied by one clock poll. Defaults to `frame_count`.
    #[serde(default)]
    pub max_catch_up_ticks: Option<u32>,
}

fn default_frame_count() -> u32 {
    91
}

fn default_image_extension() -> String {
    "webp".to_string()
}

fn default_frame_sensitivity() -> f64 {
    5.0
}

fn default_zoom_min() -> f64 {
    1.0
}

fn default_zoom_max() -> f64 {
    2.0
}

fn default_zoom_step() -> f64 {
    0.2
}

fn default_pan_limit() -> f64 {
    100.0
}

fn default_auto_rotate_interval_ms() -> u32 {
    100
}

/// Guards against configs that would need an absurd number of zoom steps.
const MAX_ZOOM_STEPS: f64 = 10_000.0;

/// Upper bound on frames per sequence; every frame gets its own load slot.
pub const MAX_FRAME_COUNT: u32 = 10_000;

impl ViewerConfig {
    /// Baseline configuration for an image path.
    pub fn new(image_path: impl Into<String>) -> Self {
        ViewerConfig {
            image_path: image_path.into(),
            frame_count: default_frame_count(),
            image_extension: default_image_extension(),
            frame_sensitivity: default_frame_sensitivity(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            zoom_step: default_zoom_step(),
            pan_limit: default_pan_limit(),
            auto_rotate_interval_ms: default_auto_rotate_interval_ms(),
            reset_pan_on_every_zoom_in: false,
            max_catch_up_ticks: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        let invalid = |msg: &str| Err(ViewerError::InvalidConfig(msg.to_string()));

        if self.frame_count == 0 {
            return invalid("frame_count must be positive");
        }
        if self.frame_count > MAX_FRAME_COUNT {
            return invalid("frame_count is too large");
        }
        if self.image_extension.is_empty() {
            return invalid("image_extension must not be empty");
        }
        if !(self.frame_sensitivity.is_finite() && self.frame_sensitivity > 0.0) {
            return invalid("frame_sensitivity must be a positive number");
        }
        if !(self.zoom_min.is_finite() && self.zoom_max.is_finite()) {
            return invalid("zoom bounds must be finite");
        }
        if self.zoom_min >= self.zoom_max {
            return invalid("zoom_min must be less than zoom_max");
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return invalid("zoom_step must be a positive number");
        }
        if (self.zoom_max - self.zoom_min) / self.zoom_step > MAX_ZOOM_STEPS {
            return invalid("zoom_step is too small for the zoom range");
        }
        if !(self.pan_limit.is_finite() && self.pan_limit >= 0.0) {
            return invalid("pan_limit must be a non-negative number");
        }
        if self.auto_rotate_interval_ms == 0 {
            return invalid("auto_rotate_interval_ms must be positive");
        }
        if self.max_catch_up_ticks == Some(0) {
            return invalid("max_catch_up_ticks must be positive when set");
        }
        Ok(())
    }
}

/// Aggregate loading progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoadProgress {
    pub loaded: u32,
    pub failed: u32,
    pub total: u32,
}

/// Everything the render surface needs to paint one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// False while frames are loading; the surface shows its loading indicator.
    pub ready: bool,
    pub load: LoadProgress,
    pub frame_index: FrameIndex,
    /// Resolved image for `frame_index`, once that frame has loaded.
    pub image: Option<String>,
    pub alt: String,
    pub zoom_level: f64,
    pub pan_offset: PanOffset,
    /// CSS transform for the image element.
    pub transform: String,
    pub mode: InteractionMode,
    pub cursor: CursorStyle,
    pub auto_rotating: bool,
    pub revision: u64,
}
