//! Fixed-rate smoothing of the dim strength and the reveal rectangle.
//!
//! Each tick moves the current value a fixed fraction of the remaining
//! distance toward its goal (first-order exponential smoothing). There is no
//! velocity term, so values converge monotonically and never overshoot.

use crate::config::Tuning;
use crate::geometry::Rect;
use crate::state::OverlayState;

/// What the renderer draws for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Mask opacity in `[0, 1]`.
    pub opacity: f64,
    /// Cut-out in logical units relative to the overlay's top-left.
    /// [`Rect::ZERO`] means no hole: the whole desktop is dimmed.
    pub reveal: Rect,
}

/// Paints the mask and its cut-out.
pub trait OverlayRenderer {
    fn present(&mut self, frame: &Frame);
}

#[derive(Debug, Clone, Default)]
pub struct AnimationEngine {
    tuning: Tuning,
}

impl AnimationEngine {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Advances `state` by one tick and returns the frame to publish.
    pub fn step(&self, state: &mut OverlayState) -> Frame {
        let goal = if state.is_revealing() {
            state.target_opacity
        } else {
            0.0
        };

        if (state.current_opacity - goal).abs() > self.tuning.opacity_snap {
            state.current_opacity += (goal - state.current_opacity) * self.tuning.opacity_smoothing;
        } else {
            state.current_opacity = goal;
        }
        state.current_opacity = state.current_opacity.clamp(0.0, 1.0);

        if state.is_revealing() {
            let next = state
                .current_rect
                .approach(&state.target_rect, self.tuning.rect_smoothing);
            state.current_rect = Rect {
                width: next.width.max(0.0),
                height: next.height.max(0.0),
                ..next
            };
        }

        Frame {
            opacity: state.current_opacity,
            reveal: reveal_for(&state.current_rect),
        }
    }
}

/// A rect too small to show is published as "no hole".
fn reveal_for(rect: &Rect) -> Rect {
    if rect.is_degenerate() {
        Rect::ZERO
    } else {
        *rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn close_rect(a: &Rect, b: &Rect) -> bool {
        close(a.x, b.x) && close(a.y, b.y) && close(a.width, b.width) && close(a.height, b.height)
    }

    #[test]
    fn one_tick_moves_a_quarter_of_the_way() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.target_rect = Rect::new(100.0, 100.0, 800.0, 600.0);

        let frame = engine.step(&mut state);

        assert!(close_rect(&state.current_rect, &Rect::new(25.0, 25.0, 200.0, 150.0)));
        assert_eq!(frame.reveal, state.current_rect);
    }

    #[test]
    fn opacity_smooths_then_snaps() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.current_opacity = 0.0;
        state.target_opacity = 0.5;

        engine.step(&mut state);
        assert!(close(state.current_opacity, 0.1));

        let mut ticks = 1;
        while state.current_opacity != 0.5 {
            let before = state.current_opacity;
            engine.step(&mut state);
            assert!(state.current_opacity > before, "must rise monotonically");
            assert!(state.current_opacity <= 0.5, "must not overshoot");
            ticks += 1;
            assert!(ticks < 100, "never snapped");
        }
    }

    #[test]
    fn inactive_fades_to_zero_and_freezes_rect() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.current_rect = Rect::new(10.0, 20.0, 300.0, 200.0);
        state.target_rect = Rect::new(500.0, 500.0, 100.0, 100.0);
        state.is_active = false;

        for _ in 0..60 {
            let frame = engine.step(&mut state);
            assert_eq!(frame.reveal, Rect::new(10.0, 20.0, 300.0, 200.0));
        }

        assert_eq!(state.current_opacity, 0.0);
        assert_eq!(state.current_rect, Rect::new(10.0, 20.0, 300.0, 200.0));

        for _ in 0..10 {
            assert_eq!(engine.step(&mut state).opacity, 0.0);
        }
    }

    #[test]
    fn desktop_fades_to_zero_and_freezes_rect() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.current_rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        state.target_rect = Rect::new(100.0, 100.0, 100.0, 100.0);
        state.is_desktop = true;

        for _ in 0..60 {
            engine.step(&mut state);
        }

        assert!(state.current_opacity.abs() <= 0.01);
        assert_eq!(state.current_rect, Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn reactivating_restores_target_opacity() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.is_active = false;
        for _ in 0..60 {
            engine.step(&mut state);
        }

        state.is_active = true;
        for _ in 0..60 {
            engine.step(&mut state);
        }

        assert_eq!(state.current_opacity, state.target_opacity);
    }

    #[test]
    fn degenerate_target_publishes_no_hole() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.target_rect = Rect::new(50.0, 50.0, 0.5, 400.0);

        for _ in 0..100 {
            let frame = engine.step(&mut state);
            assert_eq!(frame.reveal, Rect::ZERO);
            assert!(frame.reveal.width >= 0.0 && !frame.reveal.width.is_nan());
        }
        assert!(state.current_rect.width >= 0.0);
    }

    #[test]
    fn negative_target_size_never_goes_negative() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.target_rect = Rect::new(0.0, 0.0, -40.0, -40.0);

        for _ in 0..20 {
            let frame = engine.step(&mut state);
            assert!(state.current_rect.width >= 0.0);
            assert!(state.current_rect.height >= 0.0);
            assert_eq!(frame.reveal, Rect::ZERO);
        }
    }

    #[test]
    fn rect_keeps_converging_without_snapping() {
        let engine = AnimationEngine::default();
        let mut state = OverlayState::default();
        state.target_rect = Rect::new(100.0, 100.0, 800.0, 600.0);

        for _ in 0..40 {
            engine.step(&mut state);
        }

        assert!(state.current_rect.x < 100.0);
        assert!(100.0 - state.current_rect.x < 0.01);
    }
}
