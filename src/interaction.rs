// Interaction state machine: frame index, zoom level and pan offset.
// Zoom alone decides the mode. At minimum zoom drags rotate; above it drags pan.
// Zoom is kept as an integer step count so the minimum and maximum are hit exactly.

use tracing::debug;

use crate::error::ViewerError;
use crate::types::*;

/// Rotate/zoom/pan state of one viewer.
#[derive(Debug, Clone)]
pub struct InteractionState {
    frame_count: u32,
    frame_sensitivity: f64,
    zoom_min: f64,
    zoom_max: f64,
    zoom_step: f64,
    max_zoom_steps: u32,
    pan_limit: f64,
    reset_pan_on_every_zoom_in: bool,

    frame: FrameIndex,
    zoom_steps: u32,
    pan: PanOffset,
}

impl InteractionState {
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;
        Ok(InteractionState {
            frame_count: config.frame_count,
            frame_sensitivity: config.frame_sensitivity,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            zoom_step: config.zoom_step,
            max_zoom_steps: zoom_step_count(config.zoom_min, config.zoom_max, config.zoom_step),
            pan_limit: config.pan_limit,
            reset_pan_on_every_zoom_in: config.reset_pan_on_every_zoom_in,
            frame: FrameIndex::default(),
            zoom_steps: 0,
            pan: PanOffset::ZERO,
        })
    }

    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn pan_offset(&self) -> PanOffset {
        self.pan
    }

    pub fn zoom_level(&self) -> f64 {
        if self.zoom_steps == 0 {
            self.zoom_min
        } else if self.zoom_steps >= self.max_zoom_steps {
            self.zoom_max
        } else {
            let level = self.zoom_min + self.zoom_step * f64::from(self.zoom_steps);
            // 1.0 + 3 * 0.2 should read as 1.6, not 1.6000000000000001.
            ((level * 1e9).round() / 1e9).min(self.zoom_max)
        }
    }

    pub fn mode(&self) -> InteractionMode {
        if self.zoom_steps == 0 {
            InteractionMode::Rotate
        } else {
            InteractionMode::Pan
        }
    }

    /// Apply one drag delta. Returns whether anything changed.
    pub fn apply_drag(&mut self, delta: DragDelta) -> bool {
        match self.mode() {
            InteractionMode::Rotate => {
                if !delta.dx.is_finite() {
                    return false;
                }
                let steps = round_half_up(delta.dx / self.frame_sensitivity);
                let next = self.frame.wrapping_offset(steps, self.frame_count);
                let changed = next != self.frame;
                self.frame = next;
                changed
            }
            InteractionMode::Pan => {
                if !(delta.dx.is_finite() && delta.dy.is_finite()) {
                    return false;
                }
                let next = PanOffset::new(
                    clamp_axis(self.pan.x - delta.dx, self.pan_limit),
                    clamp_axis(self.pan.y - delta.dy, self.pan_limit),
                );
                let changed = next != self.pan;
                self.pan = next;
                changed
            }
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_steps >= self.max_zoom_steps {
            return false;
        }
        let leaving_min = self.zoom_steps == 0;
        self.zoom_steps += 1;
        if leaving_min || self.reset_pan_on_every_zoom_in {
            self.pan = PanOffset::ZERO;
        }
        debug!(zoom = self.zoom_level(), mode = ?self.mode(), "zoom in");
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_steps == 0 {
            return false;
        }
        self.zoom_steps -= 1;
        if self.zoom_steps == 0 {
            self.pan = PanOffset::ZERO;
        }
        debug!(zoom = self.zoom_level(), mode = ?self.mode(), "zoom out");
        true
    }

    /// Wheel zoom: scrolling down zooms out, anything else zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if delta_y > 0.0 {
            self.zoom_out()
        } else {
            self.zoom_in()
        }
    }

    /// Auto-rotate step. Ignores zoom mode and leaves pan alone.
    pub fn tick(&mut self) -> bool {
        self.advance(1)
    }

    pub fn advance(&mut self, frames: u32) -> bool {
        let next = self.frame.wrapping_offset(i64::from(frames), self.frame_count);
        let changed = next != self.frame;
        self.frame = next;
        changed
    }

    /// Back to minimum zoom with no pan. The current frame is kept.
    pub fn reset_view(&mut self) -> bool {
        let changed = self.zoom_steps != 0 || !self.pan.is_zero();
        self.zoom_steps = 0;
        self.pan = PanOffset::ZERO;
        changed
    }
}

/// Number of zoom-in steps between `min` and `max`. A partial last step lands on `max`.
fn zoom_step_count(min: f64, max: f64, step: f64) -> u32 {
    let steps = ((max - min) / step - 1e-9).ceil();
    if steps.is_finite() && steps >= 1.0 {
        steps as u32
    } else {
        1
    }
}

/// Rounds halves toward positive infinity, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn clamp_axis(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InteractionState {
        InteractionState::new(&ViewerConfig::new("/p/")).unwrap()
    }

    #[test]
    fn drag_left_advances_frames() {
        let mut s = state();
        assert!(s.apply_drag(DragDelta::new(25.0, 40.0)));
        assert_eq!(s.frame().as_u32(), 5);
        assert!(s.pan_offset().is_zero());
    }

    #[test]
    fn drag_right_wraps_backwards() {
        let mut s = state();
        s.apply_drag(DragDelta::new(-5.0, 0.0));
        assert_eq!(s.frame().as_u32(), 90);
    }

    #[test]
    fn full_turn_returns_to_start() {
        let mut s = state();
        s.apply_drag(DragDelta::new(-455.0, 0.0));
        assert_eq!(s.frame().as_u32(), 0);
    }

    #[test]
    fn small_drags_round_to_nearest_frame() {
        let mut s = state();
        assert!(!s.apply_drag(DragDelta::new(2.0, 0.0)));
        assert_eq!(s.frame().as_u32(), 0);
        s.apply_drag(DragDelta::new(3.0, 0.0));
        assert_eq!(s.frame().as_u32(), 1);
        // Half steps round up, in both directions.
        s.apply_drag(DragDelta::new(-12.5, 0.0));
        assert_eq!(s.frame().as_u32(), 90);
    }

    #[test]
    fn five_zoom_ins_reach_max_exactly() {
        let mut s = state();
        for _ in 0..5 {
            assert!(s.zoom_in());
        }
        assert_eq!(s.zoom_level(), 2.0);
        assert!(!s.zoom_in());
        assert_eq!(s.zoom_level(), 2.0);
    }

    #[test]
    fn intermediate_levels_are_clean() {
        let mut s = state();
        let mut levels = Vec::new();
        while s.zoom_in() {
            levels.push(s.zoom_level());
        }
        assert_eq!(levels, vec![1.2, 1.4, 1.6, 1.8, 2.0]);
    }

    #[test]
    fn zoom_out_back_to_min_is_exact() {
        let mut s = state();
        for _ in 0..5 {
            s.zoom_in();
        }
        for _ in 0..5 {
            assert!(s.zoom_out());
        }
        assert_eq!(s.zoom_level(), 1.0);
        assert_eq!(s.mode(), InteractionMode::Rotate);
        assert!(!s.zoom_out());
    }

    #[test]
    fn pan_mode_moves_offset_not_frame() {
        let mut s = state();
        s.zoom_in();
        assert_eq!(s.mode(), InteractionMode::Pan);

        s.apply_drag(DragDelta::new(-30.0, 20.0));
        assert_eq!(s.frame().as_u32(), 0);
        assert_eq!(s.pan_offset(), PanOffset::new(30.0, -20.0));
    }

    #[test]
    fn pan_is_clamped() {
        let mut s = state();
        s.zoom_in();
        s.apply_drag(DragDelta::new(-500.0, 500.0));
        assert_eq!(s.pan_offset(), PanOffset::new(100.0, -100.0));
        assert!(!s.apply_drag(DragDelta::new(-1.0, 1.0)));
    }

    #[test]
    fn intermediate_zoom_keeps_pan_by_default() {
        let mut s = state();
        s.zoom_in();
        s.apply_drag(DragDelta::new(-10.0, -10.0));
        s.zoom_in();
        assert_eq!(s.pan_offset(), PanOffset::new(10.0, 10.0));
        s.zoom_out();
        assert_eq!(s.pan_offset(), PanOffset::new(10.0, 10.0));
        s.zoom_out();
        assert!(s.pan_offset().is_zero());
    }

    #[test]
    fn every_zoom_in_resets_pan_when_configured() {
        let mut config = ViewerConfig::new("/p/");
        config.reset_pan_on_every_zoom_in = true;
        let mut s = InteractionState::new(&config).unwrap();
        s.zoom_in();
        s.apply_drag(DragDelta::new(-10.0, -10.0));
        s.zoom_in();
        assert!(s.pan_offset().is_zero());
    }

    #[test]
    fn tick_cycles_while_zoomed_without_touching_pan() {
        let mut s = state();
        s.zoom_in();
        s.apply_drag(DragDelta::new(-10.0, 0.0));
        s.advance(90);
        assert_eq!(s.frame().as_u32(), 90);
        s.tick();
        assert_eq!(s.frame().as_u32(), 0);
        assert_eq!(s.pan_offset(), PanOffset::new(10.0, 0.0));
    }

    #[test]
    fn wheel_direction() {
        let mut s = state();
        assert!(s.wheel(-120.0));
        assert_eq!(s.mode(), InteractionMode::Pan);
        assert!(s.wheel(120.0));
        assert_eq!(s.mode(), InteractionMode::Rotate);
    }

    #[test]
    fn uneven_step_lands_on_max() {
        let mut config = ViewerConfig::new("/p/");
        config.zoom_step = 0.3;
        let mut s = InteractionState::new(&config).unwrap();
        let mut steps = 0;
        while s.zoom_in() {
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert_eq!(s.zoom_level(), 2.0);
    }

    #[test]
    fn reset_view_keeps_frame() {
        let mut s = state();
        s.apply_drag(DragDelta::new(50.0, 0.0));
        s.zoom_in();
        s.apply_drag(DragDelta::new(5.0, 5.0));
        assert!(s.reset_view());
        assert_eq!(s.frame().as_u32(), 10);
        assert_eq!(s.zoom_level(), 1.0);
        assert!(s.pan_offset().is_zero());
    }

    #[test]
    fn construction_rejects_negative_pan_limit() {
        let mut config = ViewerConfig::new("/p/");
        config.pan_limit = -1.0;
        assert!(matches!(
            InteractionState::new(&config),
            Err(ViewerError::InvalidConfig(_))
        ));

        config.pan_limit = f64::NAN;
        assert!(InteractionState::new(&config).is_err());
    }

    #[test]
    fn zero_pan_limit_pins_the_image() {
        let mut config = ViewerConfig::new("/p/");
        config.pan_limit = 0.0;
        let mut s = InteractionState::new(&config).unwrap();
        s.zoom_in();
        s.apply_drag(DragDelta::new(5.0, 5.0));
        assert!(s.pan_offset().is_zero());
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let mut s = state();
        assert!(!s.apply_drag(DragDelta::new(f64::NAN, 0.0)));
        assert!(!s.apply_drag(DragDelta::new(f64::INFINITY, 0.0)));
        assert_eq!(s.frame().as_u32(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn delta_strategy() -> impl Strategy<Value = DragDelta> {
            (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(dx, dy)| DragDelta::new(dx, dy))
        }

        fn zoomed(steps: u32) -> InteractionState {
            let mut s = InteractionState::new(&ViewerConfig::new("/p/")).unwrap();
            for _ in 0..steps {
                s.zoom_in();
            }
            s
        }

        proptest! {
            /// A drag worth a whole number of full turns lands on the starting frame.
            #[test]
            fn full_turns_wrap_to_start(
                frame_count in 1u32..200,
                sensitivity in 1u32..20,
                start in 0u32..200,
                turns in -5i64..=5,
            ) {
                let mut config = ViewerConfig::new("/p/");
                config.frame_count = frame_count;
                config.frame_sensitivity = f64::from(sensitivity);
                let mut s = InteractionState::new(&config).unwrap();
                s.advance(start);
                let before = s.frame();

                let dx = (turns * i64::from(frame_count) * i64::from(sensitivity)) as f64;
                s.apply_drag(DragDelta::new(dx, 0.0));
                prop_assert_eq!(s.frame(), before);
                prop_assert!(s.frame().as_u32() < frame_count);
            }

            /// Zoomed in, drags never move the frame; at minimum zoom they never move the pan.
            #[test]
            fn drags_respect_mode(
                steps in 0u32..=5,
                deltas in prop::collection::vec(delta_strategy(), 1..40),
            ) {
                let mut s = zoomed(steps);
                let frame = s.frame();
                for delta in deltas {
                    s.apply_drag(delta);
                    match s.mode() {
                        InteractionMode::Pan => prop_assert_eq!(s.frame(), frame),
                        InteractionMode::Rotate => prop_assert!(s.pan_offset().is_zero()),
                    }
                }
            }

            #[test]
            fn pan_stays_within_limit(
                steps in 1u32..=5,
                deltas in prop::collection::vec(delta_strategy(), 1..60),
            ) {
                let mut s = zoomed(steps);
                for delta in deltas {
                    s.apply_drag(delta);
                    let pan = s.pan_offset();
                    prop_assert!(pan.x.abs() <= 100.0 && pan.y.abs() <= 100.0);
                }
            }

            /// Any mix of zoom commands stays in range, and minimum zoom always means no pan.
            #[test]
            fn zoom_stays_in_bounds(
                ops in prop::collection::vec((any::<bool>(), delta_strategy()), 1..60),
                reset_every_zoom_in in any::<bool>(),
            ) {
                let mut config = ViewerConfig::new("/p/");
                config.reset_pan_on_every_zoom_in = reset_every_zoom_in;
                let mut s = InteractionState::new(&config).unwrap();
                for (zoom_in, delta) in ops {
                    if zoom_in {
                        s.zoom_in();
                    } else {
                        s.zoom_out();
                    }
                    s.apply_drag(delta);

                    let level = s.zoom_level();
                    prop_assert!((1.0..=2.0).contains(&level));
                    if level == 1.0 {
                        prop_assert!(s.pan_offset().is_zero());
                        prop_assert_eq!(s.mode(), InteractionMode::Rotate);
                    } else {
                        prop_assert_eq!(s.mode(), InteractionMode::Pan);
                    }
                }
            }
        }
    }
}
