//! The focus overlay core: owns the state, the hooks, and the per-tick pipeline.
//!
//! ```text
//! hook callbacks ──enqueue──▶ EventQueue
//!                                 │ drained once per tick
//!                                 ▼
//!        ForegroundTracker / InputStateMachine ──▶ OverlayState
//!                                                      │
//!                                    AnimationEngine ◀─┘ ──▶ OverlayRenderer
//! ```
//!
//! Hook callbacks only enqueue, so the order in which state changes is the
//! order the OS delivered the events, and a callback never does more than a
//! key-state query and a push.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::animation::{AnimationEngine, Frame, OverlayRenderer};
use crate::config::Tuning;
use crate::input::{screen_key, screen_wheel, GestureOutcome, InputStateMachine};
use crate::platform::{
    HookKind, HookRegistration, KeyboardHandler, MouseHandler, PlatformError,
    PlatformWindowService, WindowEvent, WindowEventHandler,
};
use crate::queue::{EventQueue, OverlayEvent};
use crate::state::{GestureState, OverlayState};
use crate::tracker::ForegroundTracker;

/// Which hooks failed to install at startup.
///
/// A failed hook stays inert for the life of the process; dimming still runs.
#[derive(Debug, Default)]
pub struct HookHealth {
    failures: Vec<(HookKind, PlatformError)>,
}

impl HookHealth {
    pub fn is_healthy(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, kind: HookKind) -> bool {
        self.failures.iter().any(|(k, _)| *k == kind)
    }

    /// Double-tap Alt needs the keyboard hook.
    pub fn toggle_available(&self) -> bool {
        !self.failed(HookKind::Keyboard)
    }

    /// Alt+wheel needs the mouse hook.
    pub fn adjust_available(&self) -> bool {
        !self.failed(HookKind::Mouse)
    }

    pub fn failures(&self) -> &[(HookKind, PlatformError)] {
        &self.failures
    }
}

impl fmt::Display for HookHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_healthy() {
            return f.write_str("all hooks installed");
        }
        let mut lines = Vec::new();
        if self.failed(HookKind::WindowEvents) {
            lines.push("Focus tracking is unavailable; the reveal will not follow windows.");
        }
        if !self.toggle_available() {
            lines.push("Double-tap Alt to toggle is unavailable.");
        }
        if !self.adjust_available() {
            lines.push("Alt+scroll to change dimming is unavailable.");
        }
        write!(f, "{} Restart to retry.", lines.join(" "))
    }
}

pub struct FocusMask<P: PlatformWindowService + 'static> {
    platform: Rc<P>,
    overlay: OverlayState,
    gesture: GestureState,
    tracker: ForegroundTracker,
    input: InputStateMachine,
    engine: AnimationEngine,
    queue: Rc<RefCell<EventQueue>>,
    scratch: VecDeque<OverlayEvent>,
    hooks: Vec<HookRegistration>,
}

impl<P: PlatformWindowService + 'static> FocusMask<P> {
    /// Creates the state, installs the window-event, keyboard and mouse hooks,
    /// and queues the current foreground window as the first target.
    pub fn start(platform: Rc<P>, tuning: Tuning) -> (Self, HookHealth) {
        let queue = Rc::new(RefCell::new(EventQueue::default()));
        let mut health = HookHealth::default();
        let mut hooks = Vec::with_capacity(3);

        let results = [
            platform.register_window_events(window_handler(&queue)),
            platform.register_keyboard_hook(keyboard_handler(&queue)),
            platform.register_mouse_hook(mouse_handler(&queue, &platform)),
        ];
        let kinds = [HookKind::WindowEvents, HookKind::Keyboard, HookKind::Mouse];
        for (kind, result) in kinds.into_iter().zip(results) {
            match result {
                Ok(registration) => hooks.push(registration),
                Err(e) => {
                    error!("{e}");
                    health.failures.push((kind, e));
                }
            }
        }

        let capacity = queue.borrow().capacity();
        queue
            .borrow_mut()
            .push(OverlayEvent::Window(WindowEvent::foreground(
                platform.foreground_window(),
            )));

        info!(hooks = hooks.len(), "focus overlay started");

        let mask = Self {
            platform,
            overlay: OverlayState::new(&tuning),
            gesture: GestureState::default(),
            tracker: ForegroundTracker::new(),
            input: InputStateMachine::new(tuning),
            engine: AnimationEngine::new(tuning),
            queue,
            scratch: VecDeque::with_capacity(capacity),
            hooks,
        };
        (mask, health)
    }

    /// One animation tick: apply queued events, smooth, and present.
    pub fn tick<R>(&mut self, renderer: &mut R) -> Frame
    where
        R: OverlayRenderer + ?Sized,
    {
        self.process_events();
        let frame = self.engine.step(&mut self.overlay);
        renderer.present(&frame);
        frame
    }

    /// Applies everything the hooks queued since the last tick.
    pub fn process_events(&mut self) {
        if self.tracker.pending().is_some() {
            self.tracker
                .retry_pending(self.platform.as_ref(), &mut self.overlay);
        }

        let dropped = {
            let mut queue = self.queue.borrow_mut();
            queue.drain_into(&mut self.scratch);
            queue.take_dropped()
        };
        if dropped > 0 {
            warn!(dropped, "event queue overflowed; oldest events discarded");
        }

        while let Some(event) = self.scratch.pop_front() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::Window(event) => {
                if self.tracker.accepts(self.platform.as_ref(), &event) {
                    self.tracker
                        .update_target(self.platform.as_ref(), &mut self.overlay, event.window);
                }
            }
            OverlayEvent::AltReleased { at_ms } => {
                let outcome = self
                    .input
                    .on_alt_released(&mut self.gesture, &mut self.overlay, at_ms);
                if let GestureOutcome::Toggled { active } = outcome {
                    info!(active, "overlay toggled");
                    let foreground = self.platform.foreground_window();
                    self.tracker
                        .update_target(self.platform.as_ref(), &mut self.overlay, foreground);
                }
            }
            OverlayEvent::WheelNotch { delta } => {
                self.input
                    .on_wheel(&mut self.gesture, &mut self.overlay, delta);
            }
        }
    }

    /// Releases every hook. Each release is attempted even if an earlier one
    /// failed; calling this again does nothing.
    pub fn shutdown(&mut self) -> Vec<PlatformError> {
        let mut errors = Vec::new();
        for mut registration in self.hooks.drain(..) {
            let kind = registration.kind();
            match registration.release() {
                Ok(()) => debug!(hook = %kind, "hook released"),
                Err(e) => {
                    warn!("{e}");
                    errors.push(e);
                }
            }
        }
        errors
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn live_hooks(&self) -> usize {
        self.hooks.iter().filter(|h| h.is_live()).count()
    }
}

impl<P: PlatformWindowService + 'static> Drop for FocusMask<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn push(queue: &Rc<RefCell<EventQueue>>, event: OverlayEvent) {
    // Never block or panic inside a hook; a busy queue only happens on
    // re-entry and losing that one event is harmless.
    if let Ok(mut queue) = queue.try_borrow_mut() {
        queue.push(event);
    }
}

fn window_handler(queue: &Rc<RefCell<EventQueue>>) -> WindowEventHandler {
    let queue = Rc::clone(queue);
    Box::new(move |event| {
        // Caret, cursor and scrollbar objects fire location changes constantly.
        if event.is_whole_window() {
            push(&queue, OverlayEvent::Window(*event));
        }
    })
}

fn keyboard_handler(queue: &Rc<RefCell<EventQueue>>) -> KeyboardHandler {
    let queue = Rc::clone(queue);
    Box::new(move |event| {
        let (queued, verdict) = screen_key(event);
        if let Some(queued) = queued {
            push(&queue, queued);
        }
        verdict
    })
}

fn mouse_handler<P: PlatformWindowService + 'static>(
    queue: &Rc<RefCell<EventQueue>>,
    platform: &Rc<P>,
) -> MouseHandler {
    let queue = Rc::clone(queue);
    // Weak, so the handler stored inside the platform does not keep it alive.
    let platform = Rc::downgrade(platform);
    Box::new(move |event| {
        let alt_held = || platform.upgrade().is_some_and(|p| p.is_alt_down());
        let (queued, verdict) = screen_wheel(event, alt_held);
        if let Some(queued) = queued {
            push(&queue, queued);
        }
        verdict
    })
}
