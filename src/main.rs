// Prevents console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
mod overlay;
#[cfg(windows)]
mod tray;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    app::run()
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("focusmask drives the Win32 window manager and only runs on Windows")
}

#[cfg(windows)]
mod app {
    use std::cell::RefCell;
    use std::ffi::c_void;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicIsize, Ordering};

    use anyhow::Result;
    use tracing::{error, info, warn};
    use windows::core::{BOOL, PCWSTR};
    use windows::Win32::Foundation::{
        CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, HWND, LPARAM, LRESULT, WPARAM,
    };
    use windows::Win32::System::Console::SetConsoleCtrlHandler;
    use windows::Win32::System::Threading::CreateMutexW;
    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        DefWindowProcW, DispatchMessageW, GetMessageW, KillTimer, PostMessageW, PostQuitMessage,
        SetTimer, TranslateMessage, MSG, WM_CLOSE, WM_COMMAND, WM_DESTROY, WM_ENDSESSION,
        WM_RBUTTONUP, WM_TIMER,
    };

    use focusmask::platform::win32::Win32Platform;
    use focusmask::{config, logging, FocusMask, Tuning};

    use crate::overlay::OverlayWindow;
    use crate::tray::{self, TrayIcon};

    const SINGLE_INSTANCE_MUTEX: &str = "FocusMaskMutex\0";
    const TICK_TIMER_ID: usize = 1;

    struct App {
        mask: FocusMask<Win32Platform>,
        renderer: OverlayWindow,
        tray: Option<TrayIcon>,
    }

    thread_local! {
        static APP: RefCell<Option<App>> = RefCell::new(None);
    }

    /// Overlay window for the console control handler, which runs on its own thread.
    static OVERLAY_HWND: AtomicIsize = AtomicIsize::new(0);

    pub fn run() -> Result<()> {
        let _log_guard = logging::init(&config::log_dir());

        let Some(_instance) = SingleInstance::acquire() else {
            info!("another instance is already running");
            return Ok(());
        };

        let dpi_aware =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) };
        if let Err(e) = dpi_aware {
            warn!("per-monitor DPI awareness unavailable: {e}");
        }

        let renderer = OverlayWindow::create(Some(wnd_proc))?;
        let hwnd = renderer.hwnd();
        OVERLAY_HWND.store(hwnd.0 as isize, Ordering::SeqCst);

        let tray = TrayIcon::add(hwnd);

        let platform = Rc::new(Win32Platform::new(hwnd));
        let (mask, health) = FocusMask::start(platform, Tuning::standard());
        if !health.is_healthy() {
            error!(%health, "running with reduced gestures");
            if let Some(tray) = &tray {
                tray.notify("Focus Mask", &health.to_string());
            }
        }

        APP.with(|app| {
            *app.borrow_mut() = Some(App {
                mask,
                renderer,
                tray,
            })
        });

        unsafe {
            let interval = config::TICK_INTERVAL.as_millis() as u32;
            if SetTimer(Some(hwnd), TICK_TIMER_ID, interval, None) == 0 {
                error!("animation timer could not be started");
            }
            let _ = SetConsoleCtrlHandler(Some(console_ctrl_handler), true);
        }

        // Win32 message loop: hooks, notifications and the tick all arrive here
        unsafe {
            let mut msg = MSG::default();
            while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        teardown();
        info!("focus overlay stopped");
        Ok(())
    }

    /// Releases hooks, then the tray icon, then the window. Runs at most once.
    fn teardown() {
        let Some(mut app) = APP.with(|app| app.borrow_mut().take()) else {
            return;
        };
        for e in app.mask.shutdown() {
            warn!("{e}");
        }
        if let Some(mut tray) = app.tray.take() {
            tray.remove();
        }
        unsafe {
            let _ = KillTimer(Some(app.renderer.hwnd()), TICK_TIMER_ID);
        }
        drop(app);
    }

    fn tick() {
        APP.with(|app| {
            // Busy only if a tick re-enters itself; skip rather than panic.
            let Ok(mut app) = app.try_borrow_mut() else {
                return;
            };
            if let Some(app) = app.as_mut() {
                app.mask.tick(&mut app.renderer);
            }
        });
    }

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_TIMER if wparam.0 == TICK_TIMER_ID => {
                tick();
                LRESULT(0)
            }

            tray::WM_TRAY_ICON => {
                if (lparam.0 & 0xFFFF) as u32 == WM_RBUTTONUP {
                    tray::show_context_menu(hwnd);
                }
                LRESULT(0)
            }

            WM_COMMAND => {
                if (wparam.0 & 0xFFFF) as u32 == tray::IDM_QUIT {
                    info!("exit requested from tray");
                    PostQuitMessage(0);
                }
                LRESULT(0)
            }

            WM_ENDSESSION => {
                // The process may be killed as soon as this returns.
                if wparam.0 != 0 {
                    teardown();
                }
                LRESULT(0)
            }

            WM_CLOSE | WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }

            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    /// Ctrl+C / console close in debug builds: route through the normal exit path.
    unsafe extern "system" fn console_ctrl_handler(_ctrl_type: u32) -> BOOL {
        let raw = OVERLAY_HWND.load(Ordering::SeqCst);
        if raw == 0 {
            return BOOL::from(false);
        }
        let hwnd = HWND(raw as *mut c_void);
        let _ = PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
        BOOL::from(true)
    }

    /// Named mutex held for the process lifetime so a second launch exits.
    struct SingleInstance(HANDLE);

    impl SingleInstance {
        fn acquire() -> Option<Self> {
            let name: Vec<u16> = SINGLE_INSTANCE_MUTEX.encode_utf16().collect();
            unsafe {
                match CreateMutexW(None, true, PCWSTR(name.as_ptr())) {
                    Ok(handle) if GetLastError() == ERROR_ALREADY_EXISTS => {
                        let _ = CloseHandle(handle);
                        None
                    }
                    Ok(handle) => Some(Self(handle)),
                    Err(e) => {
                        // Without the mutex we cannot tell; run rather than refuse.
                        warn!("single-instance mutex unavailable: {e}");
                        Some(Self(HANDLE::default()))
                    }
                }
            }
        }
    }

    impl Drop for SingleInstance {
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                unsafe {
                    let _ = CloseHandle(self.0);
                }
            }
        }
    }
}
