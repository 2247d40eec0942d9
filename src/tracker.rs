//! Decides what the overlay should reveal for the current foreground window.

use tracing::{debug, trace, warn};

use crate::config::is_excluded_class;
use crate::geometry::{to_overlay_logical, Rect};
use crate::platform::{PlatformWindowService, WindowEvent, WindowHandle};
use crate::state::OverlayState;

/// Result of recomputing the target for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetUpdate {
    /// Null handle, or the window vanished before it could be measured.
    Ignored,
    /// The overlay itself or a shell surface; the reveal rect stays frozen.
    Desktop,
    Revealed(Rect),
    /// The display transform was not available; retried on the next tick.
    Deferred,
}

#[derive(Debug, Default)]
pub struct ForegroundTracker {
    last_window: WindowHandle,
    pending: Option<WindowHandle>,
}

impl ForegroundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only whole-window events about the window that is in the foreground
    /// right now matter. A focus change that has since been superseded is
    /// stale and must not retarget the reveal.
    pub fn accepts<P>(&self, platform: &P, event: &WindowEvent) -> bool
    where
        P: PlatformWindowService + ?Sized,
    {
        event.is_whole_window() && event.window == platform.foreground_window()
    }

    pub fn pending(&self) -> Option<WindowHandle> {
        self.pending
    }

    /// Retries a window whose mapping was deferred on an earlier tick.
    pub fn retry_pending<P>(&mut self, platform: &P, state: &mut OverlayState) -> Option<TargetUpdate>
    where
        P: PlatformWindowService + ?Sized,
    {
        let window = self.pending.take()?;
        Some(self.update_target(platform, state, window))
    }

    pub fn update_target<P>(
        &mut self,
        platform: &P,
        state: &mut OverlayState,
        window: WindowHandle,
    ) -> TargetUpdate
    where
        P: PlatformWindowService + ?Sized,
    {
        if window.is_null() {
            return TargetUpdate::Ignored;
        }
        // A newer window always supersedes a deferred one.
        self.pending = None;

        if self.is_excluded(platform, window) {
            if !state.is_desktop {
                debug!(window = window.raw(), "foreground is a shell surface, freezing reveal");
            }
            state.is_desktop = true;
            self.last_window = window;
            return TargetUpdate::Desktop;
        }
        state.is_desktop = false;

        let bounds = match platform.extended_frame_bounds(window) {
            Ok(bounds) => bounds,
            Err(e) => {
                trace!("{e}; using window rect");
                match platform.window_rect(window) {
                    Ok(rect) => rect,
                    Err(e) => {
                        warn!(window = window.raw(), "cannot measure foreground window: {e}");
                        return TargetUpdate::Ignored;
                    }
                }
            }
        };

        let transform = match platform.display_transform() {
            Ok(transform) => transform,
            Err(e) => {
                trace!("{e}; deferring target for {:#x}", window.raw());
                self.pending = Some(window);
                return TargetUpdate::Deferred;
            }
        };

        let rect = to_overlay_logical(&bounds, &transform);
        if window != self.last_window {
            debug!(window = window.raw(), ?rect, "new reveal target");
            self.last_window = window;
        }
        state.target_rect = rect;
        TargetUpdate::Revealed(rect)
    }

    fn is_excluded<P>(&self, platform: &P, window: WindowHandle) -> bool
    where
        P: PlatformWindowService + ?Sized,
    {
        window == platform.overlay_window() || is_excluded_class(&platform.window_class_name(window))
    }
}
