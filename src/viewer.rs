// Viewer: composes asset loading, drag tracking, interaction state and the auto-rotate timer.
// Every interaction is a silent no-op until all frames have loaded, and after teardown.

use tracing::{debug, info};

use crate::assets::*;
use crate::auto_rotate::AutoRotateTimer;
use crate::drag::{primary_touch, DragTracker};
use crate::error::ViewerError;
use crate::interaction::InteractionState;
use crate::types::*;

/// One mounted frame-sequence viewer.
///
/// Owns all of its state exclusively. Meant for a single-threaded host: each
/// event, clock poll and load completion runs to completion before the next.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    assets: AssetSet,
    drag: DragTracker,
    interaction: InteractionState,
    auto_rotate: AutoRotateTimer,
    hotspot_hover: bool,
    mounted: bool,
    revision: u64,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;

        let assets = AssetSet::from_config(&config);
        info!(
            mount = ?assets.mount_id(),
            frames = config.frame_count,
            path = %config.image_path,
            "viewer mounted"
        );

        Ok(Viewer {
            interaction: InteractionState::new(&config)?,
            auto_rotate: AutoRotateTimer::from_config(&config),
            drag: DragTracker::new(),
            assets,
            config,
            hotspot_hover: false,
            mounted: true,
            revision: 0,
        })
    }

    pub fn from_json(config_json: &str) -> Result<Self, ViewerError> {
        Self::new(ViewerConfig::from_json(config_json)?)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_ready(&self) -> bool {
        self.mounted && self.assets.is_ready()
    }

    /// Bumped on every observable change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    // --- loading ---

    pub fn load_requests(&self) -> Vec<LoadRequest> {
        if !self.mounted {
            return Vec::new();
        }
        self.assets.requests()
    }

    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        outcome: LoadOutcome,
    ) -> Result<CompletionEffect, ViewerError> {
        let effect = self.assets.complete(ticket, outcome)?;
        self.touch(effect != CompletionEffect::Ignored);
        Ok(effect)
    }

    /// Fetch every pending frame through `fetcher`, concurrently.
    pub async fn load_with<F: FrameFetcher>(&mut self, fetcher: &F) -> LoadStatus {
        let before = self.assets.progress();
        let status = load_all(&mut self.assets, fetcher).await;
        let changed = self.assets.progress() != before;
        self.touch(changed);
        status
    }

    // --- pointer ---

    pub fn begin_drag(&mut self, source: PointerSource, x: f64, y: f64) -> bool {
        let ready = self.is_ready();
        let began = self.drag.begin_drag(source, x, y, ready);
        self.touch(began)
    }

    /// Feed a pointer sample into the active drag and apply the resulting delta.
    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        let ready = self.is_ready();
        match self.drag.on_move(x, y, ready) {
            Some(delta) => {
                let changed = self.interaction.apply_drag(delta);
                self.touch(changed)
            }
            None => false,
        }
    }

    pub fn end_drag(&mut self) -> bool {
        let ended = self.drag.end_drag();
        self.touch(ended)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn apply_drag(&mut self, delta: DragDelta) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.apply_drag(delta);
        self.touch(changed)
    }

    pub fn set_hotspot_hover(&mut self, hovered: bool) -> bool {
        if !self.mounted || self.hotspot_hover == hovered {
            return false;
        }
        self.hotspot_hover = hovered;
        self.touch(true)
    }

    /// Dispatch one host event. Returns whether render state changed.
    pub fn handle_event(&mut self, event: &PointerEvent) -> bool {
        if !self.mounted {
            return false;
        }
        match event {
            PointerEvent::MouseDown { x, y } => self.begin_drag(PointerSource::Mouse, *x, *y),
            PointerEvent::MouseMove { x, y } => self.drag_to(*x, *y),
            PointerEvent::MouseUp | PointerEvent::MouseLeave | PointerEvent::TouchEnd => {
                self.end_drag()
            }
            PointerEvent::TouchStart { touches } => match primary_touch(touches) {
                Some(point) => self.begin_drag(PointerSource::Touch, point.x, point.y),
                None => false,
            },
            PointerEvent::TouchMove { touches } => match primary_touch(touches) {
                Some(point) => self.drag_to(point.x, point.y),
                None => false,
            },
            PointerEvent::Wheel { delta_y } => self.wheel(*delta_y),
            PointerEvent::HotspotEnter => self.set_hotspot_hover(true),
            PointerEvent::HotspotLeave => self.set_hotspot_hover(false),
        }
    }

    /// Apply a batch of events in arrival order and return the resulting state.
    pub fn process_events(&mut self, events: &[PointerEvent]) -> RenderState {
        for event in events {
            self.handle_event(event);
        }
        self.render_state()
    }

    // --- zoom ---

    pub fn zoom_in(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.zoom_in();
        self.touch(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.zoom_out();
        self.touch(changed)
    }

    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.wheel(delta_y);
        self.touch(changed)
    }

    pub fn reset_view(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.reset_view();
        self.touch(changed)
    }

    // --- auto-rotate ---

    /// Flip auto-rotate. Returns the new flag; unchanged while not ready.
    pub fn toggle_auto_rotate(&mut self) -> bool {
        if !self.is_ready() {
            return self.auto_rotate.is_enabled();
        }
        let enabled = self.auto_rotate.toggle();
        self.touch(true);
        enabled
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.auto_rotate.is_enabled()
    }

    pub fn active_timers(&self) -> usize {
        self.auto_rotate.active_timers()
    }

    /// Advance one frame. Called for each auto-rotate tick.
    pub fn tick(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let changed = self.interaction.tick();
        self.touch(changed)
    }

    /// Poll the auto-rotate timer at `now` and apply any due ticks. Returns ticks applied.
    pub fn advance_clock(&mut self, now: Timestamp) -> u32 {
        if !self.is_ready() {
            return 0;
        }
        let ticks = self.auto_rotate.poll(now);
        if ticks > 0 {
            let changed = self.interaction.advance(ticks);
            self.touch(changed);
        }
        ticks
    }

    // --- output ---

    pub fn frame_index(&self) -> FrameIndex {
        self.interaction.frame()
    }

    pub fn zoom_level(&self) -> f64 {
        self.interaction.zoom_level()
    }

    pub fn pan_offset(&self) -> PanOffset {
        self.interaction.pan_offset()
    }

    pub fn mode(&self) -> InteractionMode {
        self.interaction.mode()
    }

    pub fn cursor(&self) -> CursorStyle {
        if self.hotspot_hover {
            CursorStyle::Pointer
        } else if self.drag.is_dragging() {
            CursorStyle::Grabbing
        } else {
            match self.interaction.mode() {
                InteractionMode::Rotate => CursorStyle::Default,
                InteractionMode::Pan => CursorStyle::Grab,
            }
        }
    }

    pub fn render_state(&self) -> RenderState {
        let frame = self.frame_index();
        let zoom = self.zoom_level();
        let pan = self.pan_offset();

        RenderState {
            ready: self.is_ready(),
            load: self.assets.progress(),
            frame_index: frame,
            image: self.assets.resolve(frame).map(str::to_string),
            alt: format!("Product View {}", frame.as_u32() + 1),
            zoom_level: zoom,
            pan_offset: pan,
            transform: css_transform(zoom, pan),
            mode: self.mode(),
            cursor: self.cursor(),
            auto_rotating: self.is_auto_rotating(),
            revision: self.revision,
        }
    }

    // --- lifecycle ---

    /// Release everything the mount acquired: pending loads, the timer, the drag session.
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        self.assets.abandon();
        self.auto_rotate.disable();
        self.drag.end_drag();
        self.hotspot_hover = false;
        self.mounted = false;
        debug!(mount = ?self.assets.mount_id(), "viewer torn down");
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// `scale(z) translate(xpx, ypx)`, the transform the image element is painted with.
pub fn css_transform(zoom: f64, pan: PanOffset) -> String {
    format!(
        "scale({}) translate({}px, {}px)",
        css_number(zoom),
        css_number(pan.x),
        css_number(pan.y)
    )
}

fn css_number(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    // Avoid "-0px".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
