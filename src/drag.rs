// Pointer-drag tracking. Converts raw mouse/touch samples into per-axis drag deltas.
// Knows nothing about rotate vs. pan; the interaction state decides what a delta means.

use crate::types::*;

/// Ephemeral state of one drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub source: PointerSource,
    pub last_x: f64,
    pub last_y: f64,
}

/// Tracks at most one active drag session.
#[derive(Debug, Default)]
pub struct DragTracker {
    session: Option<DragSession>,
}

impl DragTracker {
    pub fn new() -> Self {
        DragTracker { session: None }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Open a session at `(x, y)`. Ignored until assets are ready.
    pub fn begin_drag(&mut self, source: PointerSource, x: f64, y: f64, ready: bool) -> bool {
        if !ready {
            return false;
        }
        self.session = Some(DragSession {
            source,
            last_x: x,
            last_y: y,
        });
        true
    }

    /// Delta since the previous sample, measured as `previous - current`.
    pub fn on_move(&mut self, x: f64, y: f64, ready: bool) -> Option<DragDelta> {
        if !ready {
            return None;
        }
        let session = self.session.as_mut()?;
        let delta = DragDelta::new(session.last_x - x, session.last_y - y);
        session.last_x = x;
        session.last_y = y;
        Some(delta)
    }

    /// Close the session. Safe to call with no session open.
    pub fn end_drag(&mut self) -> bool {
        self.session.take().is_some()
    }
}

/// First touch point of a touch event; extra fingers are not disambiguated.
pub fn primary_touch(touches: &[TouchPoint]) -> Option<TouchPoint> {
    touches.first().copied()
}
