// viewer_core: Rust/WASM engine for drag-to-rotate frame-sequence viewers.
// All interaction logic lives here; JS forwards events, reports image loads, and paints RenderState.

mod assets;
mod auto_rotate;
mod drag;
mod error;
mod interaction;
mod types;
mod viewer;

use wasm_bindgen::prelude::*;

pub use assets::{
    frame_url, load_all, AssetSet, CompletionEffect, FrameFetcher, FrameState, LoadOutcome,
    LoadRequest, LoadStatus, LoadTicket, MountId,
};
pub use auto_rotate::{AutoRotateTimer, TimerHandle};
pub use drag::{primary_touch, DragSession, DragTracker};
pub use error::ViewerError;
pub use interaction::InteractionState;
pub use types::*;
pub use viewer::{css_transform, Viewer};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(err: ViewerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Viewer interface exposed to JavaScript.
/// Structured data crosses the boundary as JSON; batch calls keep JS↔WASM crossings low.
#[wasm_bindgen]
pub struct ViewerEngine {
    viewer: Viewer,
}

#[wasm_bindgen]
impl ViewerEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<ViewerEngine, JsValue> {
        let viewer = Viewer::from_json(config_json).map_err(js_error)?;
        Ok(ViewerEngine { viewer })
    }

    /// JSON array of `{ ticket, url }`. Start every fetch; report each with
    /// `frame_loaded` or `frame_failed`, passing the ticket back as JSON.
    pub fn load_requests(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.viewer.load_requests())
            .map_err(|e| js_error(e.into()))
    }

    /// Returns true when this was the last frame needed.
    pub fn frame_loaded(&mut self, ticket_json: &str) -> Result<bool, JsValue> {
        self.complete(ticket_json, LoadOutcome::Loaded)
    }

    pub fn frame_failed(&mut self, ticket_json: &str, reason: &str) -> Result<bool, JsValue> {
        self.complete(ticket_json, LoadOutcome::Failed(reason.to_string()))
    }

    pub fn is_ready(&self) -> bool {
        self.viewer.is_ready()
    }

    /// Apply a JSON array of pointer events in order and return the render state as JSON.
    pub fn process_events(&mut self, events_json: &str) -> Result<String, JsValue> {
        let events: Vec<PointerEvent> =
            serde_json::from_str(events_json).map_err(|e| js_error(e.into()))?;
        let state = self.viewer.process_events(&events);
        serde_json::to_string(&state).map_err(|e| js_error(e.into()))
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.viewer.begin_drag(PointerSource::Mouse, x, y)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.viewer.drag_to(x, y)
    }

    /// Also used for touchend.
    pub fn pointer_up(&mut self) -> bool {
        self.viewer.end_drag()
    }

    /// Pointer left the viewer surface; ends the drag the same way a release does.
    pub fn pointer_leave(&mut self) -> bool {
        self.viewer.end_drag()
    }

    pub fn zoom_in(&mut self) -> bool {
        self.viewer.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.viewer.zoom_out()
    }

    pub fn wheel(&mut self, delta_y: f64) -> bool {
        self.viewer.wheel(delta_y)
    }

    pub fn reset_view(&mut self) -> bool {
        self.viewer.reset_view()
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.viewer.toggle_auto_rotate()
    }

    /// Call once per animation frame with `performance.now()`. Returns ticks applied.
    pub fn advance_clock(&mut self, now_ms: f64) -> u32 {
        self.viewer.advance_clock(Timestamp::from_millis_f64(now_ms))
    }

    pub fn set_hotspot_hover(&mut self, hovered: bool) -> bool {
        self.viewer.set_hotspot_hover(hovered)
    }

    pub fn revision(&self) -> u64 {
        self.viewer.revision()
    }

    /// Returns JSON with { ready, frame_index, image, zoom_level, pan_offset, transform, cursor, ... }.
    pub fn render_state(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.viewer.render_state()).map_err(|e| js_error(e.into()))
    }

    /// Call on unmount. Later load completions are ignored and the timer stops.
    pub fn teardown(&mut self) {
        self.viewer.teardown();
    }
}

impl ViewerEngine {
    fn complete(&mut self, ticket_json: &str, outcome: LoadOutcome) -> Result<bool, JsValue> {
        let ticket: LoadTicket =
            serde_json::from_str(ticket_json).map_err(|e| js_error(e.into()))?;
        let effect = self
            .viewer
            .complete_load(ticket, outcome)
            .map_err(js_error)?;
        Ok(effect == CompletionEffect::BecameReady)
    }
}
