//! The OS boundary the focus overlay is driven through.
//!
//! Everything the core needs from the window manager is behind
//! [`PlatformWindowService`]: window queries, the display transform, the
//! instantaneous Alt key state, and registration of the foreground/location
//! notifications plus the two low-level input hooks.
//!
//! # Real-time budget
//!
//! Hook handlers run on the thread that pumps messages, inside the OS hook
//! dispatch. Windows silently removes a low-level hook whose callback takes
//! longer than its timeout (a few hundred milliseconds), and nothing
//! re-installs it. Handlers must only classify the event and enqueue it.
//!
//! # Testability
//!
//! [`fake::FakePlatform`] replays scripted notifications and key/wheel events
//! so the tracker, gesture machine and animation can be tested without a
//! display.

use std::fmt;

use tracing::warn;

use crate::geometry::{DisplayTransform, PhysicalRect};

pub mod fake;

#[cfg(windows)]
pub mod win32;

/// Left and right Alt virtual-key codes.
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;

/// Opaque identifier of a top-level window. The core only compares handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> isize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEventKind {
    ForegroundChanged,
    LocationChanged,
}

/// A foreground or location notification from the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub kind: WindowEventKind,
    pub window: WindowHandle,
    /// Which part of the window the event is about; `OBJID_WINDOW` is the whole window.
    pub object_id: i32,
}

impl WindowEvent {
    pub const OBJID_WINDOW: i32 = 0;

    pub fn foreground(window: WindowHandle) -> Self {
        Self {
            kind: WindowEventKind::ForegroundChanged,
            window,
            object_id: Self::OBJID_WINDOW,
        }
    }

    pub fn location(window: WindowHandle) -> Self {
        Self {
            kind: WindowEventKind::LocationChanged,
            window,
            object_id: Self::OBJID_WINDOW,
        }
    }

    /// Caret, scrollbar and other in-window objects also raise location events.
    pub fn is_whole_window(&self) -> bool {
        self.object_id == Self::OBJID_WINDOW
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
}

/// One event from the low-level keyboard hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub vk_code: u32,
    pub transition: KeyTransition,
    /// Milliseconds since boot, stamped by the OS. Wraps after ~49.7 days.
    pub time_ms: u32,
}

impl KeyEvent {
    pub fn is_alt_release(&self) -> bool {
        self.transition == KeyTransition::Up
            && (self.vk_code == VK_LMENU || self.vk_code == VK_RMENU)
    }
}

/// A vertical wheel event from the low-level mouse hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelEvent {
    /// Positive means the wheel rotated away from the user.
    pub delta: i16,
    pub time_ms: u32,
}

/// What a hook handler wants done with the event.
///
/// `Forward` makes the binding return whatever the next handler in the chain
/// returns; `Suppress` stops the event from reaching anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    Forward,
    Suppress,
}

pub type WindowEventHandler = Box<dyn FnMut(&WindowEvent)>;
pub type KeyboardHandler = Box<dyn FnMut(&KeyEvent) -> HookVerdict>;
pub type MouseHandler = Box<dyn FnMut(&WheelEvent) -> HookVerdict>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    WindowEvents,
    Keyboard,
    Mouse,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::WindowEvents => "window event",
            HookKind::Keyboard => "keyboard",
            HookKind::Mouse => "mouse",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("failed to install {hook} hook: {reason}")]
    HookInstall { hook: HookKind, reason: String },
    #[error("failed to release {hook} hook: {reason}")]
    HookRelease { hook: HookKind, reason: String },
    #[error("extended frame bounds unavailable: {0}")]
    FrameBounds(String),
    #[error("display transform unavailable")]
    DisplayUnavailable,
    #[error("window query failed: {0}")]
    Window(String),
}

type ReleaseFn = Box<dyn FnOnce() -> Result<(), PlatformError>>;

/// Keeps a hook and its handler alive until released.
///
/// The release closure runs at most once: an explicit [`release`] consumes it
/// and the later drop does nothing. Dropping an unreleased registration
/// releases it.
///
/// [`release`]: HookRegistration::release
pub struct HookRegistration {
    kind: HookKind,
    release: Option<ReleaseFn>,
}

impl HookRegistration {
    pub fn new(kind: HookKind, release: impl FnOnce() -> Result<(), PlatformError> + 'static) -> Self {
        Self {
            kind,
            release: Some(Box::new(release)),
        }
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.release.is_some()
    }

    pub fn release(&mut self) -> Result<(), PlatformError> {
        match self.release.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistration")
            .field("kind", &self.kind)
            .field("live", &self.is_live())
            .finish()
    }
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{e}");
        }
    }
}

/// Window manager capabilities the overlay core depends on.
///
/// All methods are called from the message-pump thread. Queries must not
/// block; they are used while draining events on the animation tick.
pub trait PlatformWindowService {
    fn foreground_window(&self) -> WindowHandle;

    fn window_rect(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError>;

    /// Visible bounds without the invisible resize border. May fail, e.g. for
    /// windows the compositor does not manage.
    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError>;

    fn window_class_name(&self, window: WindowHandle) -> String;

    fn overlay_window(&self) -> WindowHandle;

    /// Device scale plus the overlay's own origin. Fails while the overlay
    /// surface does not exist yet.
    fn display_transform(&self) -> Result<DisplayTransform, PlatformError>;

    /// Instantaneous state of either Alt key, independent of any hook stream.
    fn is_alt_down(&self) -> bool;

    fn register_window_events(
        &self,
        handler: WindowEventHandler,
    ) -> Result<HookRegistration, PlatformError>;

    fn register_keyboard_hook(
        &self,
        handler: KeyboardHandler,
    ) -> Result<HookRegistration, PlatformError>;

    fn register_mouse_hook(&self, handler: MouseHandler) -> Result<HookRegistration, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn registration_releases_exactly_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut registration = HookRegistration::new(HookKind::Keyboard, move || {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert!(registration.is_live());
        registration.release().unwrap();
        registration.release().unwrap();
        drop(registration);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn dropping_a_live_registration_releases_it() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let registration = HookRegistration::new(HookKind::Mouse, move || {
            counter.set(counter.get() + 1);
            Err(PlatformError::HookRelease {
                hook: HookKind::Mouse,
                reason: "already gone".into(),
            })
        });

        drop(registration);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn alt_release_detection() {
        let up = |vk| KeyEvent {
            vk_code: vk,
            transition: KeyTransition::Up,
            time_ms: 0,
        };
        assert!(up(VK_LMENU).is_alt_release());
        assert!(up(VK_RMENU).is_alt_release());
        assert!(!up(0x41).is_alt_release());
        assert!(!KeyEvent {
            transition: KeyTransition::Down,
            ..up(VK_LMENU)
        }
        .is_alt_release());
    }

    #[test]
    fn whole_window_filter() {
        let mut event = WindowEvent::location(WindowHandle::from_raw(7));
        assert!(event.is_whole_window());
        event.object_id = -8; // OBJID_CARET
        assert!(!event.is_whole_window());
    }

    #[test]
    fn error_messages_name_the_hook() {
        let err = PlatformError::HookInstall {
            hook: HookKind::Keyboard,
            reason: "access denied".into(),
        };
        assert_eq!(err.to_string(), "failed to install keyboard hook: access denied");
    }
}
