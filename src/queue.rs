use std::collections::VecDeque;

use crate::platform::WindowEvent;

pub const DEFAULT_CAPACITY: usize = 256;

/// Something a hook callback observed, waiting for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    Window(WindowEvent),
    AltReleased { at_ms: u32 },
    /// An Alt+wheel notch that was already consumed by the mouse hook.
    WheelNotch { delta: i16 },
}

impl OverlayEvent {
    pub fn is_window(&self) -> bool {
        matches!(self, OverlayEvent::Window(_))
    }
}

/// Bounded FIFO between the hook callbacks and the animation tick.
///
/// Storage is allocated once and never grows inside a hook callback. When
/// full, the oldest window notification is discarded; a later notification
/// supersedes it anyway. Gesture events have already been acted on by the
/// hook (a consumed wheel notch, an Alt release that may end an adjustment),
/// so one is evicted only when the queue holds nothing else.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<OverlayEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Returns `false` if an older event had to be discarded to make room.
    pub fn push(&mut self, event: OverlayEvent) -> bool {
        let mut kept_all = true;
        if self.events.len() == self.capacity {
            let victim = self
                .events
                .iter()
                .position(OverlayEvent::is_window)
                .unwrap_or(0);
            self.events.remove(victim);
            self.dropped += 1;
            kept_all = false;
        }
        self.events.push_back(event);
        kept_all
    }

    /// Moves every pending event, oldest first, onto the back of `out`.
    pub fn drain_into(&mut self, out: &mut VecDeque<OverlayEvent>) {
        out.extend(self.events.drain(..));
    }

    /// Number of events discarded since the last call.
    pub fn take_dropped(&mut self) -> u64 {
        std::mem::take(&mut self.dropped)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::WindowHandle;

    fn alt(at_ms: u32) -> OverlayEvent {
        OverlayEvent::AltReleased { at_ms }
    }

    #[test]
    fn drains_in_arrival_order() {
        let mut queue = EventQueue::with_capacity(4);
        queue.push(alt(1));
        queue.push(OverlayEvent::WheelNotch { delta: 120 });
        queue.push(alt(2));

        let mut out = VecDeque::new();
        queue.drain_into(&mut out);

        assert!(queue.is_empty());
        assert_eq!(
            out.into_iter().collect::<Vec<_>>(),
            vec![alt(1), OverlayEvent::WheelNotch { delta: 120 }, alt(2)]
        );
    }

    #[test]
    fn overflow_discards_oldest_and_counts() {
        let mut queue = EventQueue::with_capacity(2);
        assert!(queue.push(alt(1)));
        assert!(queue.push(alt(2)));
        assert!(!queue.push(alt(3)));
        assert!(!queue.push(alt(4)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take_dropped(), 2);
        assert_eq!(queue.take_dropped(), 0);

        let mut out = VecDeque::new();
        queue.drain_into(&mut out);
        assert_eq!(out.into_iter().collect::<Vec<_>>(), vec![alt(3), alt(4)]);
    }

    #[test]
    fn overflow_evicts_window_notifications_before_gestures() {
        let mut queue = EventQueue::with_capacity(3);
        let moved = OverlayEvent::Window(WindowEvent::location(WindowHandle::from_raw(7)));
        queue.push(alt(1));
        queue.push(moved);
        queue.push(OverlayEvent::WheelNotch { delta: 120 });

        assert!(!queue.push(alt(2)));
        assert!(!queue.push(alt(3)));

        let mut out = VecDeque::new();
        queue.drain_into(&mut out);
        assert_eq!(
            out.into_iter().collect::<Vec<_>>(),
            vec![OverlayEvent::WheelNotch { delta: 120 }, alt(2), alt(3)]
        );
        assert_eq!(queue.take_dropped(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one_event() {
        let mut queue = EventQueue::with_capacity(0);
        queue.push(alt(1));
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.len(), 1);
    }
}
