//! FocusMask dims the whole virtual desktop except the focused window.
//!
//! The core is platform independent and driven through
//! [`platform::PlatformWindowService`]; the Win32 binding lives in
//! [`platform::win32`] on Windows.

pub mod animation;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod platform;
pub mod queue;
pub mod state;
pub mod tracker;

pub use animation::{AnimationEngine, Frame, OverlayRenderer};
pub use config::Tuning;
pub use controller::{FocusMask, HookHealth};
pub use geometry::{to_overlay_logical, DisplayTransform, PhysicalRect, Rect};
pub use platform::{PlatformError, PlatformWindowService, WindowHandle};
pub use state::{GestureState, OverlayState};
