//! Stroke Store
//!
//! The authoritative, CPU-side list of segments plus the instance count that
//! decides how many of them are drawn. The GPU segment buffer is a cache of
//! this list; the store records what changed since the last frame in a
//! [`SyncState`] and the renderer consumes it.
//!
//! Undo only lowers the instance count, so the indirect draw record is the
//! only GPU data it touches.

use std::ops::Range;

use crate::arc_length;
use crate::brush::BrushType;
use crate::error::CanvasError;
use crate::segment::Segment;

/// Vertices per segment instance (one triangle-strip quad)
pub const VERTICES_PER_INSTANCE: u32 = 4;

/// Arguments of the indirect draw, laid out as wgpu expects them
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl IndirectArgs {
    pub fn new(instance_count: u32) -> Self {
        Self {
            vertex_count: VERTICES_PER_INSTANCE,
            instance_count,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// GPU cache updates owed since the last [`StrokeStore::take_sync`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Zero both GPU buffers before applying `dirty`
    pub cleared: bool,
    /// Slots whose instance data must be re-uploaded
    pub dirty: Option<Range<usize>>,
    /// The indirect args changed
    pub indirect: bool,
    /// Gestures whose arc lengths were recomputed
    pub finished_gestures: Vec<Range<usize>>,
}

impl SyncState {
    fn mark_dirty(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(dirty) => dirty.start.min(range.start)..dirty.end.max(range.end),
            None => range,
        });
    }

    pub fn is_empty(&self) -> bool {
        !self.cleared && self.dirty.is_none() && !self.indirect && self.finished_gestures.is_empty()
    }
}

pub struct StrokeStore {
    /// Appended segments; `[instance_count..]` is the redo tail
    segments: Vec<Segment>,
    instance_count: usize,
    max_segments: usize,
    undo_step: usize,
    /// First slot of the gesture in progress, lowered while undo hides it
    gesture_start: Option<usize>,
    /// Where the gesture in progress began, restored by redo
    gesture_origin: usize,
    sync: SyncState,
}

impl StrokeStore {
    pub fn new(max_segments: usize, undo_step: usize) -> Self {
        Self {
            segments: Vec::with_capacity(max_segments),
            instance_count: 0,
            max_segments,
            undo_step: undo_step.max(1),
            gesture_start: None,
            gesture_origin: 0,
            sync: SyncState::default(),
        }
    }

    /// Append a segment at slot `instance_count` and return the slot
    ///
    /// Discards any redo tail first. When the store is full this returns
    /// `CapacityExceeded` and nothing changes.
    pub fn append(&mut self, mut segment: Segment) -> Result<usize, CanvasError> {
        if self.instance_count >= self.max_segments {
            return Err(CanvasError::CapacityExceeded {
                capacity: self.max_segments,
            });
        }

        let index = self.instance_count;
        if index < self.segments.len() {
            self.segments.truncate(index);
            // The slots redo could have given back to the gesture are gone
            self.gesture_origin = self.gesture_origin.min(index);
        }

        segment.cumulative_length = match self.gesture_start {
            Some(start) if start < index => self.segments[index - 1].cumulative_length + segment.length(),
            _ => segment.length(),
        };
        self.segments.push(segment);
        self.instance_count += 1;

        self.sync.mark_dirty(index..index + 1);
        self.sync.indirect = true;
        Ok(index)
    }

    /// Hide the last `undo_step` segments
    pub fn undo(&mut self) {
        self.undo_by(self.undo_step);
    }

    pub fn undo_by(&mut self, count: usize) {
        let new_count = self.instance_count.saturating_sub(count);
        if new_count == self.instance_count {
            return;
        }
        self.instance_count = new_count;
        if let Some(start) = self.gesture_start.as_mut() {
            *start = (*start).min(new_count);
        }
        self.sync.indirect = true;
        log::debug!("Undo: {} segments visible", self.instance_count);
    }

    /// Restore up to `undo_step` segments hidden by undo
    pub fn redo(&mut self) {
        let new_count = (self.instance_count + self.undo_step).min(self.segments.len());
        if new_count == self.instance_count {
            return;
        }
        self.instance_count = new_count;
        if let Some(start) = self.gesture_start.as_mut() {
            *start = (*start).max(self.gesture_origin.min(new_count));
        }
        self.sync.indirect = true;
        log::debug!("Redo: {} segments visible", self.instance_count);
    }

    /// Drop every segment and zero the GPU cache
    pub fn clear(&mut self) {
        self.segments.clear();
        self.instance_count = 0;
        self.gesture_start = None;
        self.sync = SyncState {
            cleared: true,
            indirect: true,
            ..Default::default()
        };
        log::debug!("Stroke store cleared");
    }

    pub fn begin_gesture(&mut self) {
        self.gesture_start = Some(self.instance_count);
        self.gesture_origin = self.instance_count;
    }

    /// Close the gesture in progress and recompute its arc lengths
    ///
    /// Returns the gesture's slots, or `None` if it left no visible segment.
    pub fn end_gesture(&mut self) -> Option<Range<usize>> {
        let start = self.gesture_start.take()?;
        let range = start..self.instance_count;
        if range.is_empty() {
            return None;
        }
        arc_length::prefix_sum_lengths(&mut self.segments[range.clone()]);
        self.sync.mark_dirty(range.clone());
        self.sync.finished_gestures.push(range.clone());
        Some(range)
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture_start.is_some()
    }

    /// Slot of the newest segment of the gesture in progress
    pub fn gesture_last(&self) -> Option<usize> {
        match self.gesture_start {
            Some(start) if start < self.instance_count => Some(self.instance_count - 1),
            _ => None,
        }
    }

    /// Live-edit the color of the gesture's newest segment
    pub fn set_brush_color(&mut self, color: [f32; 4]) -> bool {
        self.edit_last(|segment| segment.color = color)
    }

    /// Live-edit the radius of the gesture's newest segment
    pub fn set_brush_radius(&mut self, radius: f32) -> bool {
        self.edit_last(|segment| segment.radius = radius)
    }

    /// Live-edit the brush type of the gesture's newest segment
    pub fn set_brush_type(&mut self, brush_type: BrushType) -> bool {
        self.edit_last(|segment| segment.brush_type = brush_type)
    }

    fn edit_last(&mut self, edit: impl FnOnce(&mut Segment)) -> bool {
        let Some(index) = self.gesture_last() else {
            return false;
        };
        edit(&mut self.segments[index]);
        self.sync.mark_dirty(index..index + 1);
        true
    }

    /// The visible segments, in draw order
    pub fn export_snapshot(&self) -> Vec<Segment> {
        self.visible_segments().to_vec()
    }

    /// Replace the store contents with `segments`
    ///
    /// Gestures are recovered from endpoint continuity so arc lengths restart
    /// wherever a segment does not begin at the previous one's end.
    pub fn import_snapshot(&mut self, segments: Vec<Segment>) -> Result<(), CanvasError> {
        if segments.len() > self.max_segments {
            return Err(CanvasError::CapacityExceeded {
                capacity: self.max_segments,
            });
        }

        self.clear();
        if segments.is_empty() {
            return Ok(());
        }

        self.segments = segments;
        self.instance_count = self.segments.len();

        for range in continuous_runs(&self.segments) {
            arc_length::prefix_sum_lengths(&mut self.segments[range.clone()]);
            self.sync.finished_gestures.push(range);
        }
        self.sync.mark_dirty(0..self.instance_count);
        log::info!("Imported {} segments", self.instance_count);
        Ok(())
    }

    /// Take the pending GPU updates, leaving none behind
    pub fn take_sync(&mut self) -> SyncState {
        std::mem::take(&mut self.sync)
    }

    /// Mark every retained slot for re-upload (after a color space switch)
    pub fn invalidate(&mut self) {
        if !self.segments.is_empty() {
            self.sync.mark_dirty(0..self.segments.len());
        }
        self.sync.indirect = true;
    }

    pub fn visible_segments(&self) -> &[Segment] {
        &self.segments[..self.instance_count]
    }

    /// Every retained segment, the redo tail included
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn indirect_args(&self) -> IndirectArgs {
        IndirectArgs::new(self.instance_count as u32)
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Appended segments, including the redo tail
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instance_count == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_segments
    }

    pub fn is_full(&self) -> bool {
        self.instance_count >= self.max_segments
    }
}

/// Split `segments` into runs where each segment starts at the previous end
fn continuous_runs(segments: &[Segment]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..segments.len() {
        if segments[i].start != segments[i - 1].end {
            runs.push(start..i);
            start = i;
        }
    }
    if start < segments.len() {
        runs.push(start..segments.len());
    }
    runs
}
