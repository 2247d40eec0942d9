//! In-memory [`PlatformWindowService`] for tests.
//!
//! Windows, the foreground handle, Alt state and the display transform are
//! scripted by the test. Registered handlers are stored so the test can fire
//! notifications and input events at them exactly as the OS would.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::geometry::{DisplayTransform, PhysicalRect};

use super::{
    HookKind, HookRegistration, HookVerdict, KeyEvent, KeyTransition, KeyboardHandler,
    MouseHandler, PlatformError, PlatformWindowService, WheelEvent, WindowEvent,
    WindowEventHandler, WindowHandle, VK_LMENU,
};

#[derive(Debug, Clone)]
struct FakeWindow {
    class_name: String,
    rect: PhysicalRect,
    frame_bounds: Option<PhysicalRect>,
}

#[derive(Default)]
struct Handlers {
    window: Option<WindowEventHandler>,
    keyboard: Option<KeyboardHandler>,
    mouse: Option<MouseHandler>,
}

pub struct FakePlatform {
    overlay: WindowHandle,
    foreground: Cell<WindowHandle>,
    windows: RefCell<HashMap<WindowHandle, FakeWindow>>,
    transform: Cell<Option<DisplayTransform>>,
    alt_down: Cell<bool>,
    failing_hooks: RefCell<HashSet<HookKind>>,
    failing_releases: Rc<RefCell<HashSet<HookKind>>>,
    handlers: Rc<RefCell<Handlers>>,
}

impl FakePlatform {
    /// An empty desktop with an identity display transform.
    pub fn new(overlay: WindowHandle) -> Self {
        Self {
            overlay,
            foreground: Cell::new(WindowHandle::NULL),
            windows: RefCell::new(HashMap::new()),
            transform: Cell::new(Some(DisplayTransform::IDENTITY)),
            alt_down: Cell::new(false),
            failing_hooks: RefCell::new(HashSet::new()),
            failing_releases: Rc::new(RefCell::new(HashSet::new())),
            handlers: Rc::new(RefCell::new(Handlers::default())),
        }
    }

    /// Adds an application window whose frame bounds equal its rect.
    pub fn add_window(&self, window: WindowHandle, class_name: &str, rect: PhysicalRect) {
        self.windows.borrow_mut().insert(
            window,
            FakeWindow {
                class_name: class_name.to_string(),
                rect,
                frame_bounds: Some(rect),
            },
        );
    }

    /// `None` makes the extended frame bounds query fail for this window.
    pub fn set_frame_bounds(&self, window: WindowHandle, bounds: Option<PhysicalRect>) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&window) {
            w.frame_bounds = bounds;
        }
    }

    pub fn move_window(&self, window: WindowHandle, rect: PhysicalRect) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&window) {
            w.rect = rect;
            w.frame_bounds = Some(rect);
        }
    }

    pub fn set_foreground(&self, window: WindowHandle) {
        self.foreground.set(window);
    }

    pub fn set_display_transform(&self, transform: Option<DisplayTransform>) {
        self.transform.set(transform);
    }

    pub fn set_alt_down(&self, down: bool) {
        self.alt_down.set(down);
    }

    pub fn fail_hook(&self, kind: HookKind) {
        self.failing_hooks.borrow_mut().insert(kind);
    }

    /// Releasing a `kind` hook reports an error. The handler is still
    /// detached, as happens when the OS has already dropped the hook.
    pub fn fail_release(&self, kind: HookKind) {
        self.failing_releases.borrow_mut().insert(kind);
    }

    pub fn live_hooks(&self) -> usize {
        let handlers = self.handlers.borrow();
        [
            handlers.window.is_some(),
            handlers.keyboard.is_some(),
            handlers.mouse.is_some(),
        ]
        .iter()
        .filter(|live| **live)
        .count()
    }

    /// Delivers a window notification. Returns `false` when nothing is registered.
    pub fn fire_window_event(&self, event: WindowEvent) -> bool {
        match self.handlers.borrow_mut().window.as_mut() {
            Some(handler) => {
                handler(&event);
                true
            }
            None => false,
        }
    }

    /// Makes `window` the foreground window and raises the notification for it.
    pub fn focus(&self, window: WindowHandle) -> bool {
        self.set_foreground(window);
        self.fire_window_event(WindowEvent::foreground(window))
    }

    /// `None` when no keyboard hook is registered.
    pub fn fire_key(&self, event: KeyEvent) -> Option<HookVerdict> {
        self.handlers
            .borrow_mut()
            .keyboard
            .as_mut()
            .map(|handler| handler(&event))
    }

    pub fn release_alt(&self, time_ms: u32) -> Option<HookVerdict> {
        self.fire_key(KeyEvent {
            vk_code: VK_LMENU,
            transition: KeyTransition::Up,
            time_ms,
        })
    }

    /// `None` when no mouse hook is registered.
    pub fn fire_wheel(&self, delta: i16, time_ms: u32) -> Option<HookVerdict> {
        let event = WheelEvent { delta, time_ms };
        self.handlers
            .borrow_mut()
            .mouse
            .as_mut()
            .map(|handler| handler(&event))
    }

    fn window(&self, window: WindowHandle) -> Result<FakeWindow, PlatformError> {
        self.windows
            .borrow()
            .get(&window)
            .cloned()
            .ok_or_else(|| PlatformError::Window(format!("no window {:#x}", window.raw())))
    }

    fn check_install(&self, kind: HookKind) -> Result<(), PlatformError> {
        if self.failing_hooks.borrow().contains(&kind) {
            return Err(PlatformError::HookInstall {
                hook: kind,
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }

    fn registration(&self, kind: HookKind) -> HookRegistration {
        let handlers = Rc::clone(&self.handlers);
        let failing = Rc::clone(&self.failing_releases);
        HookRegistration::new(kind, move || {
            let mut handlers = handlers.borrow_mut();
            match kind {
                HookKind::WindowEvents => handlers.window = None,
                HookKind::Keyboard => handlers.keyboard = None,
                HookKind::Mouse => handlers.mouse = None,
            }
            if failing.borrow().contains(&kind) {
                return Err(PlatformError::HookRelease {
                    hook: kind,
                    reason: "scripted failure".into(),
                });
            }
            Ok(())
        })
    }
}

impl PlatformWindowService for FakePlatform {
    fn foreground_window(&self) -> WindowHandle {
        self.foreground.get()
    }

    fn window_rect(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError> {
        Ok(self.window(window)?.rect)
    }

    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError> {
        self.window(window)?
            .frame_bounds
            .ok_or_else(|| PlatformError::FrameBounds("not composited".into()))
    }

    fn window_class_name(&self, window: WindowHandle) -> String {
        self.window(window)
            .map(|w| w.class_name)
            .unwrap_or_default()
    }

    fn overlay_window(&self) -> WindowHandle {
        self.overlay
    }

    fn display_transform(&self) -> Result<DisplayTransform, PlatformError> {
        self.transform.get().ok_or(PlatformError::DisplayUnavailable)
    }

    fn is_alt_down(&self) -> bool {
        self.alt_down.get()
    }

    fn register_window_events(
        &self,
        handler: WindowEventHandler,
    ) -> Result<HookRegistration, PlatformError> {
        self.check_install(HookKind::WindowEvents)?;
        self.handlers.borrow_mut().window = Some(handler);
        Ok(self.registration(HookKind::WindowEvents))
    }

    fn register_keyboard_hook(
        &self,
        handler: KeyboardHandler,
    ) -> Result<HookRegistration, PlatformError> {
        self.check_install(HookKind::Keyboard)?;
        self.handlers.borrow_mut().keyboard = Some(handler);
        Ok(self.registration(HookKind::Keyboard))
    }

    fn register_mouse_hook(&self, handler: MouseHandler) -> Result<HookRegistration, PlatformError> {
        self.check_install(HookKind::Mouse)?;
        self.handlers.borrow_mut().mouse = Some(handler);
        Ok(self.registration(HookKind::Mouse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn handlers_receive_fired_events_until_released() {
        let platform = FakePlatform::new(WindowHandle::from_raw(1));
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);

        let mut registration = platform
            .register_window_events(Box::new(move |_| counter.set(counter.get() + 1)))
            .unwrap();
        assert!(platform.fire_window_event(WindowEvent::foreground(WindowHandle::from_raw(2))));
        registration.release().unwrap();

        assert!(!platform.fire_window_event(WindowEvent::foreground(WindowHandle::from_raw(2))));
        assert_eq!(seen.get(), 1);
        assert_eq!(platform.live_hooks(), 0);
    }

    #[test]
    fn scripted_hook_failure() {
        let platform = FakePlatform::new(WindowHandle::from_raw(1));
        platform.fail_hook(HookKind::Mouse);

        let result = platform.register_mouse_hook(Box::new(|_| HookVerdict::Forward));

        assert!(matches!(
            result,
            Err(PlatformError::HookInstall {
                hook: HookKind::Mouse,
                ..
            })
        ));
        assert_eq!(platform.fire_wheel(120, 0), None);
    }

    #[test]
    fn scripted_release_failure_still_detaches_the_handler() {
        let platform = FakePlatform::new(WindowHandle::from_raw(1));
        platform.fail_release(HookKind::Keyboard);
        let mut registration = platform
            .register_keyboard_hook(Box::new(|_| HookVerdict::Forward))
            .unwrap();

        let result = registration.release();

        assert!(matches!(
            result,
            Err(PlatformError::HookRelease {
                hook: HookKind::Keyboard,
                ..
            })
        ));
        assert_eq!(platform.live_hooks(), 0);
        assert_eq!(platform.release_alt(0), None);
    }

    #[test]
    fn frame_bounds_can_be_made_to_fail() {
        let platform = FakePlatform::new(WindowHandle::from_raw(1));
        let window = WindowHandle::from_raw(10);
        platform.add_window(window, "Notepad", PhysicalRect::from_xywh(0, 0, 10, 10));
        platform.set_frame_bounds(window, None);

        assert!(platform.extended_frame_bounds(window).is_err());
        assert!(platform.window_rect(window).is_ok());
    }
}
