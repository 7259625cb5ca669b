// Auto-rotate timer driven by the host clock.
// One logical interval timer per viewer: enabling twice never creates a second one,
// and disabling drops the handle so no later poll can produce a tick.

use tracing::debug;

use crate::types::*;

/// Live timer. Dropping it is the only way to stop ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: u32,
    /// Unset until the first poll after enabling anchors the schedule.
    next_due: Option<Timestamp>,
}

impl TimerHandle {
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug)]
pub struct AutoRotateTimer {
    interval_us: u64,
    max_catch_up_ticks: u32,
    handle: Option<TimerHandle>,
    next_id: u32,
}

impl AutoRotateTimer {
    pub fn new(interval_ms: u32, max_catch_up_ticks: u32) -> Self {
        AutoRotateTimer {
            interval_us: u64::from(interval_ms.max(1)) * 1000,
            max_catch_up_ticks: max_catch_up_ticks.max(1),
            handle: None,
            next_id: 1,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            config.auto_rotate_interval_ms,
            config.max_catch_up_ticks.unwrap_or(config.frame_count),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&TimerHandle> {
        self.handle.as_ref()
    }

    /// Always 0 or 1.
    pub fn active_timers(&self) -> usize {
        usize::from(self.handle.is_some())
    }

    /// Returns false if a timer was already running.
    pub fn enable(&mut self) -> bool {
        if self.handle.is_some() {
            return false;
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.handle = Some(TimerHandle { id, next_due: None });
        debug!(timer = id, interval_us = self.interval_us, "auto-rotate enabled");
        true
    }

    /// Returns false if no timer was running.
    pub fn disable(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                debug!(timer = handle.id, "auto-rotate disabled");
                true
            }
            None => false,
        }
    }

    /// Flip the timer. Returns the new enabled state.
    pub fn toggle(&mut self) -> bool {
        if self.is_enabled() {
            self.disable();
            false
        } else {
            self.enable();
            true
        }
    }

    /// Number of ticks due at `now`, capped at `max_catch_up_ticks`.
    pub fn poll(&mut self, now: Timestamp) -> u32 {
        let interval = self.interval_us;
        let cap = self.max_catch_up_ticks;
        let Some(handle) = self.handle.as_mut() else {
            return 0;
        };

        let due = match handle.next_due {
            None => {
                handle.next_due = Some(now.saturating_add_micros(interval));
                return 0;
            }
            Some(due) if now < due => return 0,
            Some(due) => due,
        };

        let elapsed = now.as_micros() - due.as_micros();
        let ticks = 1 + elapsed / interval;
        if ticks > u64::from(cap) {
            // Host stopped polling for a while; skip ahead instead of spinning through the backlog.
            debug!(timer = handle.id, missed = ticks, "auto-rotate catching up");
            handle.next_due = Some(now.saturating_add_micros(interval));
            return cap;
        }
        handle.next_due = Some(due.saturating_add_micros(ticks * interval));
        ticks as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Timestamp {
        Timestamp::from_micros(value * 1000)
    }

    #[test]
    fn first_poll_anchors_schedule() {
        let mut timer = AutoRotateTimer::new(100, 91);
        timer.enable();
        assert_eq!(timer.poll(ms(5_000)), 0);
        assert_eq!(timer.poll(ms(5_099)), 0);
        assert_eq!(timer.poll(ms(5_100)), 1);
        assert_eq!(timer.poll(ms(5_150)), 0);
        assert_eq!(timer.poll(ms(5_200)), 1);
    }

    #[test]
    fn late_poll_delivers_all_due_ticks() {
        let mut timer = AutoRotateTimer::new(100, 91);
        timer.enable();
        timer.poll(ms(0));
        assert_eq!(timer.poll(ms(350)), 3);
        // Schedule stays on the 100ms grid.
        assert_eq!(timer.poll(ms(399)), 0);
        assert_eq!(timer.poll(ms(400)), 1);
    }

    #[test]
    fn backlog_is_capped() {
        let mut timer = AutoRotateTimer::new(100, 10);
        timer.enable();
        timer.poll(ms(0));
        assert_eq!(timer.poll(ms(60_000)), 10);
        assert_eq!(timer.poll(ms(60_050)), 0);
        assert_eq!(timer.poll(ms(60_100)), 1);
    }

    #[test]
    fn disabled_timer_never_ticks() {
        let mut timer = AutoRotateTimer::new(100, 91);
        timer.enable();
        timer.poll(ms(0));
        timer.disable();
        assert_eq!(timer.poll(ms(10_000)), 0);
    }

    #[test]
    fn enable_is_idempotent() {
        let mut timer = AutoRotateTimer::new(100, 91);
        assert!(timer.enable());
        let first = *timer.handle().unwrap();
        assert!(!timer.enable());
        assert_eq!(timer.active_timers(), 1);
        assert_eq!(timer.handle().unwrap().id(), first.id());
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut timer = AutoRotateTimer::new(100, 91);
        assert!(timer.toggle());
        assert!(!timer.toggle());
        assert_eq!(timer.active_timers(), 0);
        assert!(!timer.disable());
    }

    #[test]
    fn reenable_restarts_schedule() {
        let mut timer = AutoRotateTimer::new(100, 91);
        timer.enable();
        timer.poll(ms(0));
        timer.disable();
        timer.enable();
        assert_eq!(timer.poll(ms(1_000)), 0);
        assert_eq!(timer.poll(ms(1_100)), 1);
    }
}
