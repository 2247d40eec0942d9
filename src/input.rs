//! Global keyboard/mouse gestures: double-tap Alt toggles the overlay,
//! Alt+wheel changes how strongly it dims.
//!
//! Work is split in two. The `screen_*` functions run inside the hook
//! callbacks and only decide whether to consume the event and what to
//! enqueue. [`InputStateMachine`] applies the queued events to the state on
//! the next tick.

use tracing::debug;

use crate::config::Tuning;
use crate::platform::{HookVerdict, KeyEvent, WheelEvent};
use crate::queue::OverlayEvent;
use crate::state::{GestureState, OverlayState, TapState};

/// Keyboard hook side. Alt is never consumed: other applications must keep
/// seeing it.
pub fn screen_key(event: &KeyEvent) -> (Option<OverlayEvent>, HookVerdict) {
    let queued = event
        .is_alt_release()
        .then_some(OverlayEvent::AltReleased {
            at_ms: event.time_ms,
        });
    (queued, HookVerdict::Forward)
}

/// Mouse hook side. The Alt state is queried only for wheel events, and a
/// wheel notch taken for an adjustment is consumed so the window under the
/// cursor does not scroll too.
pub fn screen_wheel(
    event: &WheelEvent,
    alt_held: impl FnOnce() -> bool,
) -> (Option<OverlayEvent>, HookVerdict) {
    if !alt_held() {
        return (None, HookVerdict::Forward);
    }
    (
        Some(OverlayEvent::WheelNotch { delta: event.delta }),
        HookVerdict::Suppress,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// First tap recorded; waiting for a second one.
    Armed,
    Toggled { active: bool },
    /// The Alt release closed an Alt+wheel adjustment.
    AdjustFinished,
    OpacityAdjusted { opacity: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct InputStateMachine {
    tuning: Tuning,
}

impl InputStateMachine {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    pub fn on_alt_released(
        &self,
        gesture: &mut GestureState,
        overlay: &mut OverlayState,
        at_ms: u32,
    ) -> GestureOutcome {
        if gesture.is_adjusting_opacity {
            // Ending an adjustment never counts as a tap, and a fresh pair
            // of taps is needed afterwards.
            gesture.is_adjusting_opacity = false;
            gesture.tap = TapState::Idle;
            return GestureOutcome::AdjustFinished;
        }

        let is_second_tap = gesture
            .last_alt_release_ms()
            .is_some_and(|previous| at_ms.wrapping_sub(previous) < self.tuning.double_tap_ms);

        if is_second_tap {
            overlay.is_active = !overlay.is_active;
            gesture.tap = TapState::Idle;
            debug!(active = overlay.is_active, "double-tap Alt");
            GestureOutcome::Toggled {
                active: overlay.is_active,
            }
        } else {
            gesture.tap = TapState::WaitingSecondTap {
                released_at_ms: at_ms,
            };
            GestureOutcome::Armed
        }
    }

    /// One Alt+wheel event moves the target by one step, whatever the delta's
    /// magnitude; high-resolution wheels send many small deltas.
    pub fn on_wheel(
        &self,
        gesture: &mut GestureState,
        overlay: &mut OverlayState,
        delta: i16,
    ) -> GestureOutcome {
        gesture.is_adjusting_opacity = true;

        let step = match delta.signum() {
            1 => self.tuning.opacity_step,
            -1 => -self.tuning.opacity_step,
            _ => 0.0,
        };
        overlay.target_opacity = self.tuning.clamp_opacity(overlay.target_opacity + step);
        debug!(opacity = overlay.target_opacity, "dim strength adjusted");

        GestureOutcome::OpacityAdjusted {
            opacity: overlay.target_opacity,
        }
    }
}
