// Focus mask using one layered overlay window over the whole virtual desktop.
//
// The window is black, transparent to input, topmost, and never activates.
// Dim strength is the layered-window alpha; the reveal is a hole punched in
// the window region (full rect RGN_DIFF focused rect), so the focused window
// shows through undimmed and stays clickable.

use anyhow::{Context, Result};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND};
use windows::Win32::Graphics::Gdi::{
    CombineRgn, CreateRectRgn, CreateSolidBrush, DeleteObject, HGDIOBJ, RGN_DIFF, RGN_ERROR,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::GetDpiForWindow;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DestroyWindow, GetSystemMetrics, IsWindow, RegisterClassW,
    SetLayeredWindowAttributes, SetWindowPos, SetWindowRgn, ShowWindow, CS_HREDRAW, CS_VREDRAW,
    HWND_TOPMOST, LWA_ALPHA, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSENDCHANGING, SWP_NOSIZE, SW_SHOWNOACTIVATE,
    WNDCLASSW, WNDPROC, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

use focusmask::{Frame, OverlayRenderer, Rect};

const CLASS_NAME: &str = "FocusMaskOverlay\0";
const USER_DEFAULT_DPI: f64 = 96.0;

/// Hole in window-relative physical pixels: left, top, right, bottom.
type Hole = (i32, i32, i32, i32);

pub struct OverlayWindow {
    hwnd: HWND,
    width: i32,
    height: i32,
    last_alpha: Option<u8>,
    last_hole: Option<Option<Hole>>,
}

impl OverlayWindow {
    /// Creates the mask window over the virtual desktop. `wnd_proc` receives
    /// its messages (tick timer, tray callbacks).
    pub fn create(wnd_proc: WNDPROC) -> Result<Self> {
        unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null()).context("module handle")?;
            let class_name: Vec<u16> = CLASS_NAME.encode_utf16().collect();

            let wc = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: wnd_proc,
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                hbrBackground: CreateSolidBrush(COLORREF(0)),
                ..Default::default()
            };
            if RegisterClassW(&wc) == 0 {
                anyhow::bail!("RegisterClassW failed for the overlay window");
            }

            let x = GetSystemMetrics(SM_XVIRTUALSCREEN);
            let y = GetSystemMetrics(SM_YVIRTUALSCREEN);
            let width = GetSystemMetrics(SM_CXVIRTUALSCREEN);
            let height = GetSystemMetrics(SM_CYVIRTUALSCREEN);

            let hwnd = CreateWindowExW(
                WS_EX_LAYERED
                    | WS_EX_TRANSPARENT
                    | WS_EX_TOPMOST
                    | WS_EX_TOOLWINDOW
                    | WS_EX_NOACTIVATE,
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WS_POPUP,
                x,
                y,
                width,
                height,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
            .context("creating overlay window")?;

            let mut window = Self {
                hwnd,
                width,
                height,
                last_alpha: None,
                last_hole: None,
            };
            window.set_alpha(0);
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            let _ = SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_NOSENDCHANGING,
            );
            tracing::info!(x, y, width, height, "overlay window created");
            Ok(window)
        }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    fn scale(&self) -> f64 {
        match unsafe { GetDpiForWindow(self.hwnd) } {
            0 => 1.0,
            dpi => f64::from(dpi) / USER_DEFAULT_DPI,
        }
    }

    fn set_alpha(&mut self, alpha: u8) {
        let hwnd = self.hwnd;
        apply_if_changed(&mut self.last_alpha, alpha, |alpha| unsafe {
            SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha, LWA_ALPHA).is_ok()
        });
    }

    fn to_hole(&self, reveal: &Rect) -> Option<Hole> {
        if *reveal == Rect::ZERO {
            return None;
        }
        let scale = self.scale();
        let left = (reveal.x * scale).round() as i32;
        let top = (reveal.y * scale).round() as i32;
        let right = ((reveal.x + reveal.width) * scale).round() as i32;
        let bottom = ((reveal.y + reveal.height) * scale).round() as i32;
        Some((left, top, right, bottom))
    }

    fn set_hole(&mut self, hole: Option<Hole>) {
        let (hwnd, width, height) = (self.hwnd, self.width, self.height);
        apply_if_changed(&mut self.last_hole, hole, |hole| unsafe {
            apply_region(hwnd, width, height, hole)
        });
    }
}

/// Runs `apply` only when `value` differs from what was last applied, and
/// remembers `value` only if `apply` reports success.
fn apply_if_changed<T: PartialEq + Copy>(
    last: &mut Option<T>,
    value: T,
    apply: impl FnOnce(T) -> bool,
) {
    if *last == Some(value) {
        return;
    }
    if apply(value) {
        *last = Some(value);
    }
}

/// Sets the window region to the full window minus `hole`.
unsafe fn apply_region(hwnd: HWND, width: i32, height: i32, hole: Option<Hole>) -> bool {
    let region = CreateRectRgn(0, 0, width, height);
    if let Some((left, top, right, bottom)) = hole {
        let cut = CreateRectRgn(left, top, right, bottom);
        let combined = CombineRgn(Some(region), Some(region), Some(cut), RGN_DIFF);
        let _ = DeleteObject(HGDIOBJ::from(cut));
        if combined == RGN_ERROR {
            tracing::warn!(?hole, "could not cut the reveal out of the mask region");
            let _ = DeleteObject(HGDIOBJ::from(region));
            return false;
        }
    }
    // On success the system owns the region.
    if SetWindowRgn(hwnd, Some(region), true) == 0 {
        let _ = DeleteObject(HGDIOBJ::from(region));
        return false;
    }
    true
}

impl OverlayRenderer for OverlayWindow {
    fn present(&mut self, frame: &Frame) {
        let alpha = (frame.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.set_alpha(alpha);
        let hole = self.to_hole(&frame.reveal);
        self.set_hole(hole);
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        unsafe {
            if IsWindow(Some(self.hwnd)).as_bool() {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}
