// Win32 binding for PlatformWindowService.
//
// Hooks:
//   • SetWinEventHook(EVENT_SYSTEM_FOREGROUND..EVENT_OBJECT_LOCATIONCHANGE),
//     out of context, skipping our own process
//   • WH_KEYBOARD_LL and WH_MOUSE_LL via SetWindowsHookExW
//
// All three deliver their callbacks on the thread that installed them, while
// it pumps messages. Handlers are parked in thread-local slots for as long as
// the registration lives and removed together with the OS hook.

use std::cell::RefCell;
use std::ffi::c_void;

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_EXTENDED_FRAME_BOUNDS};
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::HiDpi::GetDpiForWindow;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_MENU};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetClassNameW, GetForegroundWindow, GetWindowRect, IsWindow,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP, WM_MOUSEWHEEL, WM_SYSKEYDOWN,
    WM_SYSKEYUP,
};

use crate::geometry::{DisplayTransform, PhysicalRect};

use super::{
    HookKind, HookRegistration, HookVerdict, KeyEvent, KeyTransition, KeyboardHandler,
    MouseHandler, PlatformError, PlatformWindowService, WheelEvent, WindowEvent, WindowEventKind,
    WindowEventHandler, WindowHandle,
};

// WinEvent constants
const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const EVENT_OBJECT_LOCATIONCHANGE: u32 = 0x800B;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const WINEVENT_SKIPOWNPROCESS: u32 = 0x0002;

const USER_DEFAULT_DPI: f64 = 96.0;

struct Installed<H> {
    hook: isize,
    handler: H,
}

thread_local! {
    static WINDOW_EVENTS: RefCell<Option<Installed<WindowEventHandler>>> = RefCell::new(None);
    static KEYBOARD: RefCell<Option<Installed<KeyboardHandler>>> = RefCell::new(None);
    static MOUSE: RefCell<Option<Installed<MouseHandler>>> = RefCell::new(None);
}

fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.raw() as *mut c_void)
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle::from_raw(hwnd.0 as isize)
}

fn to_physical(rect: RECT) -> PhysicalRect {
    PhysicalRect::new(rect.left, rect.top, rect.right, rect.bottom)
}

/// Window manager access for the overlay window `overlay`.
///
/// Must be created and used on the thread that runs the message loop: hook
/// handlers are stored per thread and only fire while that thread pumps.
pub struct Win32Platform {
    overlay: WindowHandle,
}

impl Win32Platform {
    pub fn new(overlay: HWND) -> Self {
        Self {
            overlay: to_handle(overlay),
        }
    }
}

impl PlatformWindowService for Win32Platform {
    fn foreground_window(&self) -> WindowHandle {
        unsafe { to_handle(GetForegroundWindow()) }
    }

    fn window_rect(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(to_hwnd(window), &mut rect) }
            .map_err(|e| PlatformError::Window(e.to_string()))?;
        Ok(to_physical(rect))
    }

    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<PhysicalRect, PlatformError> {
        let mut rect = RECT::default();
        // SAFETY: the buffer is a RECT and its exact size is passed along.
        unsafe {
            DwmGetWindowAttribute(
                to_hwnd(window),
                DWMWA_EXTENDED_FRAME_BOUNDS,
                &mut rect as *mut RECT as *mut c_void,
                std::mem::size_of::<RECT>() as u32,
            )
        }
        .map_err(|e| PlatformError::FrameBounds(e.to_string()))?;
        Ok(to_physical(rect))
    }

    fn window_class_name(&self, window: WindowHandle) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(to_hwnd(window), &mut buf) };
        String::from_utf16_lossy(&buf[..len.max(0) as usize])
    }

    fn overlay_window(&self) -> WindowHandle {
        self.overlay
    }

    fn display_transform(&self) -> Result<DisplayTransform, PlatformError> {
        let hwnd = to_hwnd(self.overlay);
        if self.overlay.is_null() || !unsafe { IsWindow(Some(hwnd)) }.as_bool() {
            return Err(PlatformError::DisplayUnavailable);
        }

        let dpi = unsafe { GetDpiForWindow(hwnd) };
        if dpi == 0 {
            return Err(PlatformError::DisplayUnavailable);
        }
        let scale = f64::from(dpi) / USER_DEFAULT_DPI;

        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }.map_err(|_| PlatformError::DisplayUnavailable)?;

        DisplayTransform::new(
            scale,
            scale,
            f64::from(rect.left) / scale,
            f64::from(rect.top) / scale,
        )
        .ok_or(PlatformError::DisplayUnavailable)
    }

    fn is_alt_down(&self) -> bool {
        let state = unsafe { GetAsyncKeyState(i32::from(VK_MENU.0)) };
        (state as u16 & 0x8000) != 0
    }

    fn register_window_events(
        &self,
        handler: WindowEventHandler,
    ) -> Result<HookRegistration, PlatformError> {
        let kind = HookKind::WindowEvents;
        ensure_free(&WINDOW_EVENTS, kind)?;

        let hook = unsafe {
            SetWinEventHook(
                EVENT_SYSTEM_FOREGROUND,
                EVENT_OBJECT_LOCATIONCHANGE,
                None,
                Some(win_event_proc),
                0,
                0,
                WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
            )
        };
        if hook.is_invalid() {
            return Err(PlatformError::HookInstall {
                hook: kind,
                reason: windows::core::Error::from_win32().to_string(),
            });
        }

        WINDOW_EVENTS.with(|slot| {
            *slot.borrow_mut() = Some(Installed {
                hook: hook.0 as isize,
                handler,
            })
        });

        Ok(HookRegistration::new(kind, move || {
            let installed = WINDOW_EVENTS.with(|slot| slot.borrow_mut().take());
            match installed {
                Some(installed) => {
                    let hook = HWINEVENTHOOK(installed.hook as *mut c_void);
                    if unsafe { UnhookWinEvent(hook) }.as_bool() {
                        Ok(())
                    } else {
                        Err(PlatformError::HookRelease {
                            hook: kind,
                            reason: "UnhookWinEvent failed".into(),
                        })
                    }
                }
                None => Ok(()),
            }
        }))
    }

    fn register_keyboard_hook(
        &self,
        handler: KeyboardHandler,
    ) -> Result<HookRegistration, PlatformError> {
        let kind = HookKind::Keyboard;
        ensure_free(&KEYBOARD, kind)?;

        let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) }
            .map_err(|e| PlatformError::HookInstall {
                hook: kind,
                reason: e.to_string(),
            })?;

        KEYBOARD.with(|slot| {
            *slot.borrow_mut() = Some(Installed {
                hook: hook.0 as isize,
                handler,
            })
        });

        Ok(HookRegistration::new(kind, move || {
            let installed = KEYBOARD.with(|slot| slot.borrow_mut().take());
            release_windows_hook(installed.map(|i| i.hook), kind)
        }))
    }

    fn register_mouse_hook(&self, handler: MouseHandler) -> Result<HookRegistration, PlatformError> {
        let kind = HookKind::Mouse;
        ensure_free(&MOUSE, kind)?;

        let hook = unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), None, 0) }.map_err(
            |e| PlatformError::HookInstall {
                hook: kind,
                reason: e.to_string(),
            },
        )?;

        MOUSE.with(|slot| {
            *slot.borrow_mut() = Some(Installed {
                hook: hook.0 as isize,
                handler,
            })
        });

        Ok(HookRegistration::new(kind, move || {
            let installed = MOUSE.with(|slot| slot.borrow_mut().take());
            release_windows_hook(installed.map(|i| i.hook), kind)
        }))
    }
}

fn ensure_free<H: 'static>(
    slot: &'static std::thread::LocalKey<RefCell<Option<Installed<H>>>>,
    kind: HookKind,
) -> Result<(), PlatformError> {
    let occupied = slot.with(|slot| slot.borrow().is_some());
    if occupied {
        return Err(PlatformError::HookInstall {
            hook: kind,
            reason: "already registered on this thread".into(),
        });
    }
    Ok(())
}

fn release_windows_hook(hook: Option<isize>, kind: HookKind) -> Result<(), PlatformError> {
    let Some(hook) = hook else {
        return Ok(());
    };
    unsafe { UnhookWindowsHookEx(HHOOK(hook as *mut c_void)) }.map_err(|e| {
        PlatformError::HookRelease {
            hook: kind,
            reason: e.to_string(),
        }
    })
}

/// WinEvent callback. Runs on the installing thread while it pumps messages.
unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    _id_child: i32,
    _id_event_thread: u32,
    _event_time: u32,
) {
    let kind = match event {
        EVENT_SYSTEM_FOREGROUND => WindowEventKind::ForegroundChanged,
        EVENT_OBJECT_LOCATIONCHANGE => WindowEventKind::LocationChanged,
        _ => return,
    };
    let event = WindowEvent {
        kind,
        window: to_handle(hwnd),
        object_id: id_object,
    };
    WINDOW_EVENTS.with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            if let Some(installed) = slot.as_mut() {
                (installed.handler)(&event);
            }
        }
    });
}

/// Low-level keyboard hook. Must return well inside the OS hook timeout.
unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        // SAFETY: for HC_ACTION, lparam points to a KBDLLHOOKSTRUCT.
        let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
        let transition = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyTransition::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyTransition::Up),
            _ => None,
        };
        if let Some(transition) = transition {
            let event = KeyEvent {
                vk_code: info.vkCode,
                transition,
                time_ms: info.time,
            };
            let verdict = KEYBOARD.with(|slot| match slot.try_borrow_mut() {
                Ok(mut slot) => slot.as_mut().map(|installed| (installed.handler)(&event)),
                Err(_) => None,
            });
            if verdict == Some(HookVerdict::Suppress) {
                return LRESULT(1);
            }
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}

/// Low-level mouse hook. Only vertical wheel events reach the handler.
unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 && wparam.0 as u32 == WM_MOUSEWHEEL {
        // SAFETY: for HC_ACTION, lparam points to a MSLLHOOKSTRUCT.
        let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        // High-order word of mouseData is the signed wheel delta.
        let event = WheelEvent {
            delta: (info.mouseData >> 16) as u16 as i16,
            time_ms: info.time,
        };
        let verdict = MOUSE.with(|slot| match slot.try_borrow_mut() {
            Ok(mut slot) => slot.as_mut().map(|installed| (installed.handler)(&event)),
            Err(_) => None,
        });
        if verdict == Some(HookVerdict::Suppress) {
            return LRESULT(1);
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}
