//! Cursor blink state machine.
//!
//! Poll-driven: the host calls [`CursorBlinkState::tick`] from its
//! animation loop and redraws the cursor row when it returns true. Cursor
//! movement restarts the phase so the cursor is always visible right after
//! activity; a restart arriving while a toggle is pending coalesces into
//! one rescheduled deadline instead of stacking timers.

use std::time::{Duration, Instant};

/// Time between visibility toggles.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(600);

#[derive(Debug)]
pub struct CursorBlinkState {
    enabled: bool,
    paused: bool,
    visible: bool,
    next_toggle: Option<Instant>,
    /// Set when activity restarted the phase after the current deadline was
    /// scheduled; consumed by the next tick to re-arm instead of toggling.
    restarted_at: Option<Instant>,
}

impl CursorBlinkState {
    pub fn new(enabled: bool, now: Instant) -> Self {
        Self {
            enabled,
            paused: false,
            visible: true,
            next_toggle: enabled.then(|| now + BLINK_INTERVAL),
            restarted_at: None,
        }
    }

    /// Whether the cursor should be drawn right now. While blink is
    /// disabled or paused (unfocused) the cursor is always drawn; the
    /// unfocused outline style is the renderer's concern.
    pub fn is_visible(&self) -> bool {
        !self.enabled || self.paused || self.visible
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Enable or disable blinking (options change).
    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        self.enabled = enabled;
        self.visible = true;
        self.restarted_at = None;
        self.next_toggle = (enabled && !self.paused).then(|| now + BLINK_INTERVAL);
    }

    /// Restart the phase from "visible" on cursor activity. If a toggle is
    /// already pending, it is rescheduled rather than queued.
    pub fn restart(&mut self, now: Instant) {
        if !self.enabled || self.paused {
            return;
        }
        self.visible = true;
        if self.next_toggle.is_some() {
            self.restarted_at = Some(now);
        } else {
            self.next_toggle = Some(now + BLINK_INTERVAL);
        }
    }

    /// Pause on focus loss: the timer stops and the cursor renders solid.
    pub fn pause(&mut self) {
        self.paused = true;
        self.visible = true;
        self.next_toggle = None;
        self.restarted_at = None;
    }

    /// Resume on focus gain, starting a fresh visible phase.
    pub fn resume(&mut self, now: Instant) {
        self.paused = false;
        self.visible = true;
        self.restarted_at = None;
        self.next_toggle = self.enabled.then(|| now + BLINK_INTERVAL);
    }

    /// Advance the machine. Returns true when visibility changed and the
    /// cursor row needs a redraw.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.next_toggle else {
            return false;
        };
        if now < deadline {
            return false;
        }
        if let Some(restarted) = self.restarted_at.take() {
            // Activity since the deadline was armed: push the toggle out to
            // a full interval after that activity instead of toggling.
            self.next_toggle = Some(restarted + BLINK_INTERVAL);
            // The re-armed deadline may itself already be due.
            return self.tick(now);
        }
        self.visible = !self.visible;
        self.next_toggle = Some(deadline + BLINK_INTERVAL);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_blink_is_always_visible() {
        let t0 = Instant::now();
        let mut blink = CursorBlinkState::new(false, t0);
        assert!(blink.is_visible());
        assert!(!blink.tick(t0 + BLINK_INTERVAL * 3));
        assert!(blink.is_visible());
    }

    #[test]
    fn toggles_at_each_interval() {
        let t0 = Instant::now();
        let mut blink = CursorBlinkState::new(true, t0);
        assert!(blink.is_visible());
        assert!(blink.tick(t0 + BLINK_INTERVAL));
        assert!(!blink.is_visible());
        assert!(blink.tick(t0 + BLINK_INTERVAL * 2));
        assert!(blink.is_visible());
    }

    #[test]
    fn restart_keeps_cursor_visible_and_delays_toggle() {
        let t0 = Instant::now();
        let mut blink = CursorBlinkState::new(true, t0);
        // Activity just before the first toggle would fire.
        let activity = t0 + BLINK_INTERVAL - Duration::from_millis(10);
        blink.restart(activity);
        assert!(blink.is_visible());
        // The old deadline passes without a visibility change.
        assert!(!blink.tick(t0 + BLINK_INTERVAL));
        assert!(blink.is_visible());
        // A full interval after the activity, the cursor finally hides.
        assert!(blink.tick(activity + BLINK_INTERVAL));
        assert!(!blink.is_visible());
    }

    #[test]
    fn repeated_restarts_coalesce() {
        let t0 = Instant::now();
        let mut blink = CursorBlinkState::new(true, t0);
        for i in 1..=5 {
            blink.restart(t0 + Duration::from_millis(i * 100));
        }
        // Only the latest restart matters.
        let last = t0 + Duration::from_millis(500);
        assert!(!blink.tick(t0 + BLINK_INTERVAL));
        assert!(blink.tick(last + BLINK_INTERVAL));
        assert!(!blink.is_visible());
    }

    #[test]
    fn pause_forces_solid_and_stops_the_timer() {
        let t0 = Instant::now();
        let mut blink = CursorBlinkState::new(true, t0);
        blink.tick(t0 + BLINK_INTERVAL);
        assert!(!blink.is_visible());
        blink.pause();
        assert!(blink.is_visible());
        assert!(!blink.tick(t0 + BLINK_INTERVAL * 10));
        assert!(blink.is_visible());
        // Resume starts a fresh visible phase.
        let t1 = t0 + BLINK_INTERVAL * 20;
        blink.resume(t1);
        assert!(blink.is_visible());
        assert!(blink.tick(t1 + BLINK_INTERVAL));
        assert!(!blink.is_visible());
    }
}
