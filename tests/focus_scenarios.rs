//! End-to-end behaviour of the focus overlay driven through the in-memory platform.

use std::rc::Rc;

use focusmask::platform::fake::FakePlatform;
use focusmask::platform::{HookVerdict, WindowEvent};
use focusmask::{
    DisplayTransform, FocusMask, Frame, OverlayRenderer, PhysicalRect, Rect, Tuning, WindowHandle,
};

const OVERLAY: WindowHandle = WindowHandle::from_raw(0x100);
const BROWSER: WindowHandle = WindowHandle::from_raw(0x200);
const TERMINAL: WindowHandle = WindowHandle::from_raw(0x300);
const TASKBAR: WindowHandle = WindowHandle::from_raw(0x400);

#[derive(Default)]
struct Screen {
    frames: Vec<Frame>,
}

impl OverlayRenderer for Screen {
    fn present(&mut self, frame: &Frame) {
        self.frames.push(*frame);
    }
}

impl Screen {
    fn last(&self) -> Frame {
        *self.frames.last().expect("no frame presented")
    }
}

fn desktop() -> Rc<FakePlatform> {
    let platform = FakePlatform::new(OVERLAY);
    platform.add_window(BROWSER, "Chrome_WidgetWin_1", PhysicalRect::from_xywh(100, 100, 800, 600));
    platform.add_window(TERMINAL, "CASCADIA_HOSTING_WINDOW_CLASS", PhysicalRect::from_xywh(960, 0, 960, 1080));
    platform.add_window(TASKBAR, "Shell_TrayWnd", PhysicalRect::from_xywh(0, 1040, 1920, 40));
    platform.set_foreground(BROWSER);
    Rc::new(platform)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn first_tick_moves_a_quarter_of_the_way_to_the_focused_window() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    let mut screen = Screen::default();

    mask.tick(&mut screen);

    assert_eq!(screen.last().reveal, Rect::new(25.0, 25.0, 200.0, 150.0));
    assert!(close(screen.last().opacity, 0.75));
}

#[test]
fn reveal_settles_on_the_focused_window() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    let mut screen = Screen::default();

    platform.focus(TERMINAL);
    for _ in 0..120 {
        mask.tick(&mut screen);
    }

    let reveal = screen.last().reveal;
    assert!(close(reveal.x, 960.0));
    assert!(close(reveal.y, 0.0));
    assert!(close(reveal.width, 960.0));
    assert!(close(reveal.height, 1080.0));
}

#[test]
fn scaled_display_maps_into_logical_units() {
    let platform = desktop();
    platform.set_display_transform(DisplayTransform::new(2.0, 2.0, 0.0, 0.0));
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    mask.process_events();

    assert_eq!(mask.overlay().target_rect, Rect::new(50.0, 50.0, 400.0, 300.0));
}

#[test]
fn missing_display_defers_mapping_until_it_returns() {
    let platform = desktop();
    platform.set_display_transform(None);
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    mask.process_events();
    assert_eq!(mask.overlay().target_rect, Rect::ZERO);

    platform.set_display_transform(Some(DisplayTransform::IDENTITY));
    mask.process_events();
    assert_eq!(mask.overlay().target_rect, Rect::new(100.0, 100.0, 800.0, 600.0));
}

#[test]
fn double_tap_inside_the_window_toggles() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    platform.release_alt(5_000);
    platform.release_alt(5_399);
    mask.process_events();
    assert!(!mask.overlay().is_active);

    platform.release_alt(6_000);
    platform.release_alt(6_150);
    mask.process_events();
    assert!(mask.overlay().is_active);
}

#[test]
fn taps_400ms_apart_do_not_toggle() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    platform.release_alt(5_000);
    platform.release_alt(5_400);
    platform.release_alt(5_800);
    mask.process_events();

    assert!(mask.overlay().is_active);
}

#[test]
fn deactivated_overlay_fades_to_clear() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    let mut screen = Screen::default();
    mask.tick(&mut screen);

    platform.release_alt(100);
    platform.release_alt(200);
    for _ in 0..60 {
        mask.tick(&mut screen);
    }

    assert_eq!(screen.last().opacity, 0.0);
}

#[test]
fn releasing_alt_after_scrolling_never_toggles() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    platform.release_alt(1_000);
    platform.set_alt_down(true);
    assert_eq!(platform.fire_wheel(120, 1_050), Some(HookVerdict::Suppress));
    platform.set_alt_down(false);
    platform.release_alt(1_100);
    mask.process_events();

    assert!(mask.overlay().is_active);
    assert!(!mask.gesture().is_adjusting_opacity);
    assert!(close(mask.overlay().target_opacity, 0.80));
}

#[test]
fn opacity_stays_within_bounds_while_scrolling() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    platform.set_alt_down(true);

    for t in 0..40 {
        platform.fire_wheel(120, t);
    }
    mask.process_events();
    assert!(close(mask.overlay().target_opacity, 0.95));

    for t in 0..40 {
        platform.fire_wheel(-120, t);
    }
    mask.process_events();
    assert!(close(mask.overlay().target_opacity, 0.1));
}

#[test]
fn plain_scrolling_is_passed_through() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    assert_eq!(platform.fire_wheel(-120, 0), Some(HookVerdict::Forward));
    mask.process_events();

    assert!(close(mask.overlay().target_opacity, 0.75));
    assert!(!mask.gesture().is_adjusting_opacity);
}

#[test]
fn focusing_the_taskbar_clears_the_mask_and_freezes_the_reveal() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    let mut screen = Screen::default();
    for _ in 0..10 {
        mask.tick(&mut screen);
    }
    let before = mask.overlay().current_rect;

    platform.focus(TASKBAR);
    for _ in 0..60 {
        mask.tick(&mut screen);
    }

    assert!(mask.overlay().is_desktop);
    assert_eq!(screen.last().opacity, 0.0);
    assert_eq!(mask.overlay().current_rect, before);

    platform.focus(BROWSER);
    for _ in 0..60 {
        mask.tick(&mut screen);
    }
    assert!(!mask.overlay().is_desktop);
    assert!(close(screen.last().opacity, 0.75));
}

#[test]
fn focusing_the_overlay_itself_counts_as_desktop() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    mask.process_events();

    platform.focus(OVERLAY);
    mask.process_events();

    assert!(mask.overlay().is_desktop);
}

#[test]
fn sub_pixel_target_publishes_no_hole() {
    let platform = desktop();
    let sliver = WindowHandle::from_raw(0x500);
    platform.add_window(sliver, "Sliver", PhysicalRect::from_xywh(10, 10, 1, 400));
    platform.set_display_transform(DisplayTransform::new(2.0, 2.0, 0.0, 0.0));
    platform.set_foreground(sliver);
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    let mut screen = Screen::default();

    for _ in 0..60 {
        mask.tick(&mut screen);
    }

    assert!(close(mask.overlay().current_rect.width, 0.5));
    assert_eq!(screen.last().reveal, Rect::ZERO);
}

#[test]
fn child_object_notifications_are_ignored() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());
    mask.process_events();

    platform.set_foreground(TERMINAL);
    platform.fire_window_event(WindowEvent {
        object_id: -4,
        ..WindowEvent::foreground(TERMINAL)
    });
    mask.process_events();

    assert_eq!(mask.overlay().target_rect, Rect::new(100.0, 100.0, 800.0, 600.0));
}

#[test]
fn no_events_reach_the_core_after_shutdown() {
    let platform = desktop();
    let (mut mask, _) = FocusMask::start(Rc::clone(&platform), Tuning::standard());

    assert!(mask.shutdown().is_empty());

    assert!(!platform.focus(TERMINAL));
    assert_eq!(platform.release_alt(0), None);
    assert_eq!(platform.fire_wheel(120, 0), None);
    assert_eq!(platform.live_hooks(), 0);
}
