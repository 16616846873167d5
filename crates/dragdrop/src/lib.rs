//! DragDrop Utilities
//!
//! Simple pointer drag-and-drop session tracking.
//! Uses movement threshold to distinguish click from drag.
//!
//! The host forwards raw pointer events; the session decides when a press
//! becomes a drag, which target is hovered, and what the release means.

/// Drop target types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// Drop on an item (take its place)
    Item(u32),
    /// Drop on a gap between items, before the item at this index
    Zone(usize),
}

/// Completed drag gesture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropEvent {
    pub dragged: u32,
    pub target: DropTarget,
}

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// DnD session state
#[derive(Clone, Debug, Default)]
pub struct DragSession {
    dragging_id: Option<u32>,
    drop_target: Option<DropTarget>,
    drag_just_ended: bool,
    /// Pending item id (pointer down but not yet dragging)
    pending_id: Option<u32>,
    /// Start position for movement detection
    start_x: i32,
    start_y: i32,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging_id(&self) -> Option<u32> {
        self.dragging_id
    }

    pub fn pending_id(&self) -> Option<u32> {
        self.pending_id
    }

    pub fn drop_target(&self) -> Option<DropTarget> {
        self.drop_target
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging_id.is_some()
    }

    /// True right after a drag finished, so the host can swallow the trailing click.
    pub fn drag_just_ended(&self) -> bool {
        self.drag_just_ended
    }

    pub fn clear_just_ended(&mut self) {
        self.drag_just_ended = false;
    }

    /// Record a pending drag with start position.
    /// Hosts forward primary-button presses that did not land on an input or button.
    pub fn pointer_down(&mut self, item_id: u32, x: i32, y: i32) {
        self.pending_id = Some(item_id);
        self.start_x = x;
        self.start_y = y;
    }

    /// Starts the drag once the pointer moved beyond the threshold.
    /// Returns true when this move started the drag.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        if self.pending_id.is_none() || self.dragging_id.is_some() {
            return false;
        }

        let dx = (x - self.start_x).abs();
        let dy = (y - self.start_y).abs();

        if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
            self.dragging_id = self.pending_id;
            log::debug!("[DND] drag started: {:?}", self.dragging_id);
            true
        } else {
            false
        }
    }

    /// Pointer entered an item; it becomes the drop target unless it is the dragged item.
    pub fn enter_item(&mut self, item_id: u32) {
        if let Some(dragging) = self.dragging_id {
            // Don't allow dropping on self
            if dragging != item_id {
                self.drop_target = Some(DropTarget::Item(item_id));
            }
        }
    }

    /// Pointer entered the gap before `index`.
    pub fn enter_zone(&mut self, index: usize) {
        if self.dragging_id.is_some() {
            self.drop_target = Some(DropTarget::Zone(index));
        }
    }

    pub fn leave(&mut self) {
        if self.dragging_id.is_some() {
            self.drop_target = None;
        }
    }

    /// Release. Returns the drop when a real drag ended over a target;
    /// `None` for plain clicks and drops outside any target.
    pub fn pointer_up(&mut self) -> Option<DropEvent> {
        let dragging_id = self.dragging_id;
        let drop_target = self.drop_target;

        // Clear pending state first
        self.pending_id = None;

        let was_dragging = dragging_id.is_some();
        self.end_drag(was_dragging);

        match (dragging_id, drop_target) {
            (Some(dragged), Some(target)) => Some(DropEvent { dragged, target }),
            _ => None,
        }
    }

    /// Abort without dropping (e.g. escape key, pointer lost).
    pub fn cancel(&mut self) {
        let was_dragging = self.dragging_id.is_some();
        self.pending_id = None;
        self.end_drag(was_dragging);
    }

    fn end_drag(&mut self, was_dragging: bool) {
        self.dragging_id = None;
        self.drop_target = None;
        self.pending_id = None;
        self.drag_just_ended = was_dragging;
    }
}
