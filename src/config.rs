use std::path::PathBuf;
use std::time::Duration;

/// Dim strength the overlay starts with.
pub const INITIAL_OPACITY: f64 = 0.75;
/// Change applied by one Alt+wheel notch.
pub const OPACITY_STEP: f64 = 0.05;
pub const MIN_OPACITY: f64 = 0.1;
pub const MAX_OPACITY: f64 = 0.95;
/// Two Alt releases closer than this toggle the overlay.
pub const DOUBLE_TAP_MS: u32 = 400;
pub const OPACITY_SMOOTHING: f64 = 0.2;
pub const RECT_SMOOTHING: f64 = 0.25;
/// Opacity snaps to its goal once within this distance.
pub const OPACITY_SNAP: f64 = 0.01;
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Window classes that mean "nothing to reveal": taskbar, desktop, desktop worker.
pub const EXCLUDED_CLASSES: [&str; 3] = ["Shell_TrayWnd", "Progman", "WorkerW"];

/// Fixed tuning for the gesture machine and the animation filter.
///
/// These are compile-time constants; the struct exists so the engine is
/// parameterised by a value instead of reaching for globals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub initial_opacity: f64,
    pub opacity_step: f64,
    pub min_opacity: f64,
    pub max_opacity: f64,
    pub double_tap_ms: u32,
    pub opacity_smoothing: f64,
    pub rect_smoothing: f64,
    pub opacity_snap: f64,
}

impl Tuning {
    pub const fn standard() -> Self {
        Self {
            initial_opacity: INITIAL_OPACITY,
            opacity_step: OPACITY_STEP,
            min_opacity: MIN_OPACITY,
            max_opacity: MAX_OPACITY,
            double_tap_ms: DOUBLE_TAP_MS,
            opacity_smoothing: OPACITY_SMOOTHING,
            rect_smoothing: RECT_SMOOTHING,
            opacity_snap: OPACITY_SNAP,
        }
    }

    pub fn clamp_opacity(&self, value: f64) -> f64 {
        value.clamp(self.min_opacity, self.max_opacity)
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn is_excluded_class(class_name: &str) -> bool {
    EXCLUDED_CLASSES.contains(&class_name)
}

/// Where the rolling log files go. Falls back to the working directory when
/// the platform has no local data dir.
pub fn log_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("FocusMask").join("logs")
}
