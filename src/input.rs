//! Input Event Handling
//!
//! Pointer events are queued as they arrive and drained once per frame. The
//! [`InputTracker`] turns the drained events into segments: it converts pixel
//! positions to NDC, decimates samples closer than the track step, and runs
//! the `Idle -> Drawing/Panning -> Idle` gesture state machine.

use std::collections::VecDeque;
use std::ops::Range;

use crate::brush::BrushConfig;
use crate::error::CanvasError;
use crate::segment::{distance, Segment};
use crate::store::StrokeStore;
use crate::view::View;

/// A pointer input event (mouse, touch, or stylus)
#[derive(Debug, Clone)]
pub struct PointerEvent {
    /// Position in canvas space (pixels from top-left)
    pub position: [f32; 2],
    /// Button that changed, for Down and Up
    pub button: Option<PointerButton>,
    pub event_type: PointerEventType,
}

impl PointerEvent {
    pub fn new(event_type: PointerEventType, position: [f32; 2], button: Option<PointerButton>) -> Self {
        Self {
            position,
            button,
            event_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventType {
    /// Button pressed
    Down,
    /// Pointer moved
    Move,
    /// Button released
    Up,
    /// The gesture was interrupted (pointer left the canvas, focus lost)
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Draws
    Primary,
    /// Pans
    Middle,
    Secondary,
}

impl PointerButton {
    fn mask(self) -> u8 {
        match self {
            PointerButton::Primary => 0b001,
            PointerButton::Middle => 0b010,
            PointerButton::Secondary => 0b100,
        }
    }
}

/// Queue for input events that coalesces events between frames
pub struct InputQueue {
    events: VecDeque<PointerEvent>,
    /// Bit per held button
    held: u8,
    last_position: Option<[f32; 2]>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            held: 0,
            last_position: None,
        }
    }

    /// Add an event to the queue
    pub fn push_event(&mut self, event: PointerEvent) {
        let event_type = event.event_type;

        match event.event_type {
            PointerEventType::Down => {
                if let Some(button) = event.button {
                    self.held |= button.mask();
                }
            }
            PointerEventType::Move => {
                self.last_position = Some(event.position);
                // Hover moves never reach the tracker
                if self.held == 0 {
                    return;
                }
            }
            PointerEventType::Up => match event.button {
                Some(button) => self.held &= !button.mask(),
                None => self.held = 0,
            },
            PointerEventType::Cancel => {
                if self.held == 0 {
                    return;
                }
                self.held = 0;
            }
        }
        self.last_position = Some(event.position);

        self.events.push_back(event);
        log::debug!("Input event queued: {:?} (queue size: {})", event_type, self.events.len());
    }

    /// Drain all pending events for processing
    pub fn drain_events(&mut self) -> impl Iterator<Item = PointerEvent> + '_ {
        self.events.drain(..)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Last known pointer position, hover included
    pub fn last_position(&self) -> Option<[f32; 2]> {
        self.last_position
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a canvas pixel position (top-left origin) to NDC (+y up)
pub fn pixel_to_ndc(pixel: [f32; 2], size: [f32; 2]) -> [f32; 2] {
    [
        (pixel[0] / size[0]) * 2.0 - 1.0,
        (1.0 - pixel[1] / size[1]) * 2.0 - 1.0,
    ]
}

/// Gesture state of the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerState {
    Idle,
    Drawing {
        /// End of the last appended segment, or the down point (world NDC)
        last: [f32; 2],
        /// Segments this gesture has appended
        appended: usize,
    },
    Panning {
        /// Previous pointer position (screen NDC)
        anchor: [f32; 2],
    },
}

/// Everything a tracker event may touch
pub struct TrackerContext<'a> {
    pub store: &'a mut StrokeStore,
    pub view: &'a mut View,
    pub brush: &'a BrushConfig,
    /// Canvas size in pixels
    pub viewport: [f32; 2],
}

pub struct InputTracker {
    state: TrackerState,
    /// Minimum travel in NDC before a new segment is appended
    track_step: f32,
    capacity_warned: bool,
}

impl InputTracker {
    pub fn new(track_step: f32) -> Self {
        Self {
            state: TrackerState::Idle,
            track_step,
            capacity_warned: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, TrackerState::Drawing { .. })
    }

    /// Abandon any gesture without touching the store (after clear or import)
    pub fn reset(&mut self) {
        self.state = TrackerState::Idle;
    }

    /// Apply one pointer event
    ///
    /// Returns the slots of the gesture this event finished, if any.
    pub fn handle_event(&mut self, event: &PointerEvent, ctx: &mut TrackerContext<'_>) -> Option<Range<usize>> {
        let screen = pixel_to_ndc(event.position, ctx.viewport);

        match (self.state, event.event_type) {
            (TrackerState::Idle, PointerEventType::Down) => {
                match event.button {
                    Some(PointerButton::Primary) => {
                        ctx.store.begin_gesture();
                        self.capacity_warned = false;
                        self.state = TrackerState::Drawing {
                            last: ctx.view.screen_to_world(screen),
                            appended: 0,
                        };
                    }
                    Some(PointerButton::Middle) => {
                        self.state = TrackerState::Panning { anchor: screen };
                    }
                    _ => {
                        log::debug!("Ignoring {:?} button", event.button);
                    }
                }
                None
            }
            (TrackerState::Drawing { last, appended }, PointerEventType::Move) => {
                let candidate = ctx.view.screen_to_world(screen);
                if distance(candidate, last) > self.track_step {
                    if self.append(Segment::with_brush(last, candidate, ctx.brush), ctx.store) {
                        self.state = TrackerState::Drawing {
                            last: candidate,
                            appended: appended + 1,
                        };
                    }
                }
                None
            }
            (TrackerState::Drawing { last, appended }, PointerEventType::Up | PointerEventType::Cancel)
                if ends_gesture(event, PointerButton::Primary) =>
            {
                let candidate = ctx.view.screen_to_world(screen);
                // The final flush also gives a click its dot
                if appended == 0 || distance(candidate, last) > self.track_step {
                    self.append(Segment::with_brush(last, candidate, ctx.brush), ctx.store);
                }
                self.state = TrackerState::Idle;
                let gesture = ctx.store.end_gesture();
                if let Some(range) = &gesture {
                    log::debug!("Gesture finished: {} segments ({:?})", range.len(), range);
                }
                gesture
            }
            (TrackerState::Panning { anchor }, PointerEventType::Move) => {
                ctx.view.pan([screen[0] - anchor[0], screen[1] - anchor[1]]);
                self.state = TrackerState::Panning { anchor: screen };
                None
            }
            (TrackerState::Panning { .. }, PointerEventType::Up | PointerEventType::Cancel)
                if ends_gesture(event, PointerButton::Middle) =>
            {
                self.state = TrackerState::Idle;
                None
            }
            (_, PointerEventType::Down | PointerEventType::Up) => {
                log::debug!("Ignoring {:?} {:?} during {:?}", event.button, event.event_type, self.state);
                None
            }
            _ => None,
        }
    }

    fn append(&mut self, segment: Segment, store: &mut StrokeStore) -> bool {
        match store.append(segment) {
            Ok(_) => true,
            Err(CanvasError::CapacityExceeded { capacity }) => {
                if !self.capacity_warned {
                    log::warn!("Segment buffer full ({} segments), dropping samples until undo or clear", capacity);
                    self.capacity_warned = true;
                }
                false
            }
            Err(e) => {
                log::error!("Failed to append segment: {}", e);
                false
            }
        }
    }
}

/// Cancel ends any gesture; Up only ends the one its button started
fn ends_gesture(event: &PointerEvent, button: PointerButton) -> bool {
    match event.event_type {
        PointerEventType::Cancel => true,
        _ => event.button == Some(button),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: [f32; 2] = [800.0, 600.0];

    struct Harness {
        tracker: InputTracker,
        store: StrokeStore,
        view: View,
        brush: BrushConfig,
    }

    impl Harness {
        fn new(capacity: usize) -> Self {
            Self {
                tracker: InputTracker::new(0.01),
                store: StrokeStore::new(capacity, 10),
                view: View::default(),
                brush: BrushConfig::default(),
            }
        }

        fn send(&mut self, event_type: PointerEventType, ndc: [f32; 2], button: Option<PointerButton>) -> Option<Range<usize>> {
            // Invert pixel_to_ndc so tests can speak in NDC
            let pixel = [
                (ndc[0] + 1.0) * 0.5 * VIEWPORT[0],
                (1.0 - (ndc[1] + 1.0) * 0.5) * VIEWPORT[1],
            ];
            let event = PointerEvent::new(event_type, pixel, button);
            let mut ctx = TrackerContext {
                store: &mut self.store,
                view: &mut self.view,
                brush: &self.brush,
                viewport: VIEWPORT,
            };
            self.tracker.handle_event(&event, &mut ctx)
        }

        fn down(&mut self, ndc: [f32; 2]) {
            self.send(PointerEventType::Down, ndc, Some(PointerButton::Primary));
        }

        fn moved(&mut self, ndc: [f32; 2]) {
            self.send(PointerEventType::Move, ndc, None);
        }

        fn up(&mut self, ndc: [f32; 2]) -> Option<Range<usize>> {
            self.send(PointerEventType::Up, ndc, Some(PointerButton::Primary))
        }
    }

    #[test]
    fn test_pixel_to_ndc() {
        assert_eq!(pixel_to_ndc([0.0, 0.0], VIEWPORT), [-1.0, 1.0]);
        assert_eq!(pixel_to_ndc([800.0, 600.0], VIEWPORT), [1.0, -1.0]);
        assert_eq!(pixel_to_ndc([400.0, 300.0], VIEWPORT), [0.0, 0.0]);
    }

    #[test]
    fn test_samples_within_threshold_make_one_segment() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        for i in 1..20 {
            // Jitter around the down point, never more than 0.008 away
            let x = if i % 2 == 0 { 0.004 } else { -0.004 };
            h.moved([x, 0.004]);
        }
        let gesture = h.up([0.002, 0.0]);
        assert_eq!(h.store.instance_count(), 1);
        assert_eq!(gesture, Some(0..1));
    }

    #[test]
    fn test_drag_appends_past_threshold() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.005, 0.0]);
        h.moved([0.02, 0.0]);
        h.moved([0.025, 0.0]);
        h.moved([0.04, 0.0]);
        assert_eq!(h.store.instance_count(), 2);

        let segments = h.store.visible_segments();
        assert!((segments[0].start[0]).abs() < 1e-5);
        assert!((segments[0].end[0] - 0.02).abs() < 1e-5);
        // Contiguous polyline
        assert_eq!(segments[1].start, segments[0].end);

        // Release right at the last endpoint: no extra flush segment
        let gesture = h.up([0.04, 0.0]);
        assert_eq!(gesture, Some(0..2));
        assert_eq!(h.store.instance_count(), 2);
    }

    #[test]
    fn test_up_flushes_final_segment() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.02, 0.0]);
        h.up([0.05, 0.0]);
        assert_eq!(h.store.instance_count(), 2);
        assert!((h.store.visible_segments()[1].end[0] - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_gesture_gets_cumulative_lengths() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.1, 0.0]);
        h.moved([0.1, 0.1]);
        h.up([0.1, 0.1]);

        let segments = h.store.visible_segments();
        assert!((segments[0].cumulative_length - 0.1).abs() < 1e-4);
        assert!((segments[1].cumulative_length - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_middle_button_pans_without_segments() {
        let mut h = Harness::new(100);
        h.send(PointerEventType::Down, [0.0, 0.0], Some(PointerButton::Middle));
        assert!(matches!(h.tracker.state(), TrackerState::Panning { .. }));
        h.moved([0.2, 0.1]);
        h.moved([0.4, 0.2]);
        h.send(PointerEventType::Up, [0.4, 0.2], Some(PointerButton::Middle));

        assert_eq!(h.store.instance_count(), 0);
        assert!((h.view.offset[0] - 0.4).abs() < 1e-4);
        assert!((h.view.offset[1] - 0.2).abs() < 1e-4);
        assert_eq!(h.tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_segments_are_stored_in_world_space() {
        let mut h = Harness::new(100);
        h.view.pan([0.5, 0.0]);
        h.down([0.5, 0.0]);
        h.up([0.6, 0.0]);
        let segment = h.store.visible_segments()[0];
        assert!(segment.start[0].abs() < 1e-4);
        assert!((segment.end[0] - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_cancel_ends_gesture() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.1, 0.0]);
        let gesture = h.send(PointerEventType::Cancel, [0.1, 0.0], None);
        assert_eq!(gesture, Some(0..1));
        assert_eq!(h.tracker.state(), TrackerState::Idle);
        assert!(!h.store.in_gesture());
    }

    #[test]
    fn test_secondary_button_is_ignored() {
        let mut h = Harness::new(100);
        h.send(PointerEventType::Down, [0.0, 0.0], Some(PointerButton::Secondary));
        h.moved([0.5, 0.5]);
        h.send(PointerEventType::Up, [0.5, 0.5], Some(PointerButton::Secondary));
        assert_eq!(h.store.instance_count(), 0);
    }

    #[test]
    fn test_brush_is_read_at_append_time() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.1, 0.0]);
        h.brush.radius = 0.05;
        h.moved([0.2, 0.0]);
        h.up([0.2, 0.0]);

        let segments = h.store.visible_segments();
        assert_eq!(segments[0].radius, 0.01);
        assert_eq!(segments[1].radius, 0.05);
    }

    #[test]
    fn test_full_store_drops_samples() {
        let mut h = Harness::new(2);
        h.down([0.0, 0.0]);
        for i in 1..10 {
            h.moved([i as f32 * 0.1, 0.0]);
        }
        h.up([1.0, 0.0]);
        assert_eq!(h.store.instance_count(), 2);
        assert_eq!(h.tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_queue_drops_hover_moves() {
        let mut queue = InputQueue::new();
        queue.push_event(PointerEvent::new(PointerEventType::Move, [1.0, 1.0], None));
        assert!(!queue.has_events());
        assert_eq!(queue.last_position(), Some([1.0, 1.0]));

        queue.push_event(PointerEvent::new(PointerEventType::Down, [1.0, 1.0], Some(PointerButton::Primary)));
        queue.push_event(PointerEvent::new(PointerEventType::Move, [2.0, 1.0], None));
        queue.push_event(PointerEvent::new(PointerEventType::Up, [2.0, 1.0], Some(PointerButton::Primary)));
        queue.push_event(PointerEvent::new(PointerEventType::Cancel, [2.0, 1.0], None));

        let types: Vec<_> = queue.drain_events().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![PointerEventType::Down, PointerEventType::Move, PointerEventType::Up]
        );
        assert!(!queue.has_events());
    }

    #[test]
    fn test_other_button_release_keeps_drawing() {
        let mut h = Harness::new(100);
        h.down([0.0, 0.0]);
        h.moved([0.1, 0.0]);
        h.send(PointerEventType::Down, [0.1, 0.0], Some(PointerButton::Secondary));
        let gesture = h.send(PointerEventType::Up, [0.1, 0.0], Some(PointerButton::Secondary));
        assert_eq!(gesture, None);
        assert!(h.tracker.is_drawing());

        h.moved([0.2, 0.0]);
        h.moved([0.3, 0.0]);
        let gesture = h.up([0.3, 0.0]);
        assert_eq!(gesture, Some(0..3));
        assert_eq!(h.store.instance_count(), 3);
    }

    #[test]
    fn test_primary_release_does_not_end_pan() {
        let mut h = Harness::new(100);
        h.send(PointerEventType::Down, [0.0, 0.0], Some(PointerButton::Middle));
        h.send(PointerEventType::Up, [0.0, 0.0], Some(PointerButton::Primary));
        assert!(matches!(h.tracker.state(), TrackerState::Panning { .. }));
        h.send(PointerEventType::Up, [0.0, 0.0], Some(PointerButton::Middle));
        assert_eq!(h.tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_queue_tracks_buttons_separately() {
        let mut queue = InputQueue::new();
        queue.push_event(PointerEvent::new(PointerEventType::Down, [0.0, 0.0], Some(PointerButton::Primary)));
        queue.push_event(PointerEvent::new(PointerEventType::Down, [0.0, 0.0], Some(PointerButton::Secondary)));
        queue.push_event(PointerEvent::new(PointerEventType::Up, [0.0, 0.0], Some(PointerButton::Secondary)));
        // Primary is still held
        queue.push_event(PointerEvent::new(PointerEventType::Move, [5.0, 0.0], None));
        queue.push_event(PointerEvent::new(PointerEventType::Up, [5.0, 0.0], Some(PointerButton::Primary)));
        queue.push_event(PointerEvent::new(PointerEventType::Move, [9.0, 0.0], None));

        let types: Vec<_> = queue.drain_events().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                PointerEventType::Down,
                PointerEventType::Down,
                PointerEventType::Up,
                PointerEventType::Move,
                PointerEventType::Up,
            ]
        );
    }
}
