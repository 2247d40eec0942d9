// System tray icon: tooltip, Quit menu, and balloon notices

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_WARNING, NIM_ADD,
    NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, LoadIconW, SetForegroundWindow,
    TrackPopupMenu, IDI_SHIELD, MF_STRING, TPM_BOTTOMALIGN, TPM_LEFTALIGN,
};

/// Custom message ID for tray icon callbacks
pub const WM_TRAY_ICON: u32 = 0x8001; // WM_APP + 1

pub const IDM_QUIT: u32 = 1001;

const TRAY_ID: u32 = 1;
const TOOLTIP: &str = "Focus Mask (double-tap Alt to toggle)";

fn wide_str(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Copies `text` into a fixed UTF-16 field, truncating and keeping the terminator.
fn fill(field: &mut [u16], text: &str) {
    let wide = wide_str(text);
    let len = wide.len().min(field.len());
    field[..len].copy_from_slice(&wide[..len]);
    if let Some(last) = field.last_mut() {
        if len == field.len() {
            *last = 0;
        }
    }
}

fn base_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: TRAY_ID,
        ..Default::default()
    }
}

/// Tray icon that removes itself when dropped.
pub struct TrayIcon {
    hwnd: HWND,
    removed: bool,
}

impl TrayIcon {
    pub fn add(hwnd: HWND) -> Option<Self> {
        unsafe {
            let mut nid = base_data(hwnd);
            nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP;
            nid.uCallbackMessage = WM_TRAY_ICON;
            if let Ok(icon) = LoadIconW(None, IDI_SHIELD) {
                nid.hIcon = icon;
            }
            fill(&mut nid.szTip, TOOLTIP);

            if Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
                Some(Self {
                    hwnd,
                    removed: false,
                })
            } else {
                tracing::warn!("tray icon could not be added");
                None
            }
        }
    }

    /// Shows a warning balloon from the tray icon.
    pub fn notify(&self, title: &str, message: &str) {
        unsafe {
            let mut nid = base_data(self.hwnd);
            nid.uFlags = NIF_INFO;
            nid.dwInfoFlags = NIIF_WARNING;
            fill(&mut nid.szInfoTitle, title);
            fill(&mut nid.szInfo, message);
            let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
        }
    }

    /// Safe to call more than once.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &base_data(self.hwnd));
        }
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Show the tray context menu
pub fn show_context_menu(hwnd: HWND) {
    unsafe {
        let Ok(menu) = CreatePopupMenu() else {
            return;
        };
        let quit_text = wide_str("Quit");
        let _ = AppendMenuW(menu, MF_STRING, IDM_QUIT as usize, PCWSTR(quit_text.as_ptr()));

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for TrackPopupMenu to work correctly with tray icons
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_LEFTALIGN | TPM_BOTTOMALIGN,
            pt.x,
            pt.y,
            Some(0),
            hwnd,
            None,
        );

        let _ = DestroyMenu(menu);
    }
}
