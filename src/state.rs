use crate::config::Tuning;
use crate::geometry::Rect;

/// Everything the animation needs to know about the overlay.
///
/// The tracker writes `target_rect`/`is_desktop`, the gesture machine writes
/// `target_opacity`/`is_active`, and the engine writes the `current_*` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    pub target_opacity: f64,
    pub current_opacity: f64,
    pub target_rect: Rect,
    pub current_rect: Rect,
    pub is_active: bool,
    pub is_desktop: bool,
}

impl OverlayState {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            target_opacity: tuning.clamp_opacity(tuning.initial_opacity),
            current_opacity: tuning.initial_opacity,
            target_rect: Rect::ZERO,
            current_rect: Rect::ZERO,
            is_active: true,
            is_desktop: false,
        }
    }

    /// Whether the overlay should currently be dimming with a cut-out.
    pub fn is_revealing(&self) -> bool {
        self.is_active && !self.is_desktop
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(&Tuning::default())
    }
}

/// Double-tap recogniser position.
///
/// Expiry is lazy: a stale `WaitingSecondTap` simply fails the window check
/// on the next release and gets replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    #[default]
    Idle,
    WaitingSecondTap { released_at_ms: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureState {
    pub tap: TapState,
    /// Set by an Alt+wheel adjustment; the next Alt release ends the gesture.
    pub is_adjusting_opacity: bool,
}

impl GestureState {
    pub fn last_alt_release_ms(&self) -> Option<u32> {
        match self.tap {
            TapState::Idle => None,
            TapState::WaitingSecondTap { released_at_ms } => Some(released_at_ms),
        }
    }
}
