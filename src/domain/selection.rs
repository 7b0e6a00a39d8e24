// Selection controller - creation and move/resize interactions as an explicit state machine
//
// Creation:  Idle -> Anchored -> PendingConfirm -> Idle
// Editing:   Idle -> Dragging -> Idle
//
// Every commit goes through WidgetStore, which re-validates the bounds.
use super::error::DashboardError;
use super::geometry::{normalize, Bounds, CellPos, GridRect, GridSpec};
use super::store::WidgetStore;
use super::widget::{Widget, WidgetDraft, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeHandle {
    fn moves_top(self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }
}

/// Which of the nine handles is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragMode {
    Move,
    Resize(ResizeHandle),
}

impl DragMode {
    /// Derives new bounds from the bounds captured at press time and a whole-cell delta.
    ///
    /// Every widget stays at least 1x1: a moving edge is clamped against the fixed
    /// opposite edge as well as the grid extents. `Move` keeps the widget size and
    /// stops at the grid border.
    pub fn apply(self, origin: Bounds, delta_row: i64, delta_col: i64, grid: &GridSpec) -> Bounds {
        let max_row = grid.max_row();
        let max_col = grid.max_col();

        match self {
            Self::Move => {
                let dr = clamp_i64(
                    delta_row,
                    -i64::from(origin.start_row),
                    i64::from(max_row) - i64::from(origin.end_row),
                );
                let dc = clamp_i64(
                    delta_col,
                    -i64::from(origin.start_col),
                    i64::from(max_col) - i64::from(origin.end_col),
                );
                Bounds {
                    start_row: offset(origin.start_row, dr, 0, max_row),
                    end_row: offset(origin.end_row, dr, 0, max_row),
                    start_col: offset(origin.start_col, dc, 0, max_col),
                    end_col: offset(origin.end_col, dc, 0, max_col),
                }
            }
            Self::Resize(handle) => {
                let mut bounds = origin;
                if handle.moves_top() {
                    bounds.start_row = offset(origin.start_row, delta_row, 0, origin.end_row);
                }
                if handle.moves_bottom() {
                    bounds.end_row = offset(origin.end_row, delta_row, origin.start_row, max_row);
                }
                if handle.moves_left() {
                    bounds.start_col = offset(origin.start_col, delta_col, 0, origin.end_col);
                }
                if handle.moves_right() {
                    bounds.end_col = offset(origin.end_col, delta_col, origin.start_col, max_col);
                }
                bounds
            }
        }
    }
}

fn clamp_i64(value: i64, lo: i64, hi: i64) -> i64 {
    value.max(lo).min(hi.max(lo))
}

fn offset(value: u32, delta: i64, lo: u32, hi: u32) -> u32 {
    let moved = clamp_i64(i64::from(value) + delta, i64::from(lo), i64::from(hi));
    u32::try_from(moved).unwrap_or(lo)
}

/// Candidate bounds shown while selecting or dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub bounds: Bounds,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub widget_id: WidgetId,
    pub mode: DragMode,
    pub origin: Bounds,
    pub preview: Preview,
    pointer_origin: (f64, f64),
    rect: GridRect,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Anchored { anchor: CellPos, preview: Preview },
    PendingConfirm { bounds: Bounds },
    Dragging(DragSession),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellClick {
    /// First corner of a new widget region was set.
    Anchored(CellPos),
    /// Region is free; the content form should open.
    Confirming(Bounds),
    /// Region overlaps a widget; still anchored.
    Rejected(Bounds),
    /// The cell belongs to a widget; route to widget selection.
    OnWidget(WidgetId),
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Committed { widget_id: WidgetId, bounds: Bounds },
    Unchanged { widget_id: WidgetId },
    Reverted { widget_id: WidgetId, bounds: Bounds },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Moved { widget_id: WidgetId, bounds: Bounds },
    Removed(Widget),
    NoOp,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    selected: Option<WidgetId>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Global pointer tracking is only needed while a handle is held.
    pub fn is_tracking_pointer(&self) -> bool {
        matches!(self.state, SelectionState::Dragging(_))
    }

    /// Live bounds to render: the creation preview or the drag preview.
    pub fn preview(&self) -> Option<Preview> {
        match &self.state {
            SelectionState::Anchored { preview, .. } => Some(*preview),
            SelectionState::PendingConfirm { bounds } => Some(Preview {
                bounds: *bounds,
                valid: true,
            }),
            SelectionState::Dragging(session) => Some(session.preview),
            SelectionState::Idle => None,
        }
    }

    pub fn click_cell(&mut self, cell: CellPos, store: &WidgetStore) -> CellClick {
        if let Some(widget) = store.widget_at(cell) {
            return CellClick::OnWidget(widget.id.clone());
        }

        match &self.state {
            SelectionState::Idle => {
                self.selected = None;
                self.state = SelectionState::Anchored {
                    anchor: cell,
                    preview: Preview {
                        bounds: normalize(cell, cell),
                        valid: true,
                    },
                };
                CellClick::Anchored(cell)
            }
            SelectionState::Anchored { anchor, .. } => {
                let anchor = *anchor;
                let preview = Self::selection_preview(anchor, cell, store);
                if preview.valid {
                    self.state = SelectionState::PendingConfirm {
                        bounds: preview.bounds,
                    };
                    CellClick::Confirming(preview.bounds)
                } else {
                    self.state = SelectionState::Anchored { anchor, preview };
                    CellClick::Rejected(preview.bounds)
                }
            }
            SelectionState::PendingConfirm { .. } | SelectionState::Dragging(_) => CellClick::Ignored,
        }
    }

    pub fn hover_cell(&mut self, cell: CellPos, store: &WidgetStore) -> Option<Preview> {
        let SelectionState::Anchored { anchor, .. } = &self.state else {
            return None;
        };
        let anchor = *anchor;
        let preview = Self::selection_preview(anchor, cell, store);
        self.state = SelectionState::Anchored { anchor, preview };
        Some(preview)
    }

    fn selection_preview(anchor: CellPos, cell: CellPos, store: &WidgetStore) -> Preview {
        let bounds = normalize(anchor, cell);
        Preview {
            bounds,
            valid: store.is_free(&bounds, None),
        }
    }

    /// Submits the content form for the pending region and adds the widget.
    pub fn confirm(&mut self, draft: WidgetDraft, store: &mut WidgetStore) -> Result<WidgetId, DashboardError> {
        let SelectionState::PendingConfirm { bounds } = self.state else {
            return Err(DashboardError::InvalidState(
                "no selection awaiting confirmation".to_string(),
            ));
        };
        self.state = SelectionState::Idle;

        let widget = Widget::new(bounds, draft);
        let id = widget.id.clone();
        store.add(widget)?;
        Ok(id)
    }

    /// Abandons creation or discards an in-progress drag.
    pub fn cancel(&mut self) {
        if let SelectionState::Dragging(session) = &self.state {
            tracing::debug!("Drag of widget {} cancelled", session.widget_id);
        }
        self.state = SelectionState::Idle;
    }

    /// Leaves edit mode: no selection, no drag, nothing committed.
    pub fn reset(&mut self) {
        self.cancel();
        self.selected = None;
    }

    /// Toggles selection of a widget and abandons any pending anchor.
    pub fn click_widget(&mut self, widget_id: &str) -> Option<&str> {
        if self.is_tracking_pointer() {
            return self.selected();
        }
        if matches!(self.state, SelectionState::Anchored { .. }) {
            self.state = SelectionState::Idle;
        }
        if self.selected.as_deref() == Some(widget_id) {
            self.selected = None;
        } else {
            self.selected = Some(widget_id.to_string());
        }
        self.selected()
    }

    pub fn press_handle(
        &mut self,
        widget_id: &str,
        mode: DragMode,
        pointer: (f64, f64),
        rect: GridRect,
        store: &WidgetStore,
    ) -> Result<Preview, DashboardError> {
        if !matches!(self.state, SelectionState::Idle) {
            return Err(DashboardError::InvalidState(
                "another interaction is in progress".to_string(),
            ));
        }
        let widget = store
            .get(widget_id)
            .ok_or_else(|| DashboardError::NotFound(widget_id.to_string()))?;

        let preview = Preview {
            bounds: widget.bounds,
            valid: true,
        };
        self.selected = Some(widget.id.clone());
        self.state = SelectionState::Dragging(DragSession {
            widget_id: widget.id.clone(),
            mode,
            origin: widget.bounds,
            preview,
            pointer_origin: pointer,
            rect,
        });
        Ok(preview)
    }

    pub fn pointer_move(&mut self, pointer: (f64, f64), store: &WidgetStore) -> Option<Preview> {
        let SelectionState::Dragging(session) = &mut self.state else {
            return None;
        };
        let grid = store.grid();
        let (delta_row, delta_col) = grid.pixel_delta_to_cells(
            pointer.0 - session.pointer_origin.0,
            pointer.1 - session.pointer_origin.1,
            &session.rect,
        );
        let bounds = session.mode.apply(session.origin, delta_row, delta_col, grid);
        session.preview = Preview {
            bounds,
            valid: store.is_free(&bounds, Some(&session.widget_id)),
        };
        Some(session.preview)
    }

    /// Ends a drag: a valid preview is committed, anything else reverts.
    pub fn release(&mut self, store: &mut WidgetStore) -> Option<DragOutcome> {
        if !self.is_tracking_pointer() {
            return None;
        }
        let SelectionState::Dragging(session) = std::mem::take(&mut self.state) else {
            return None;
        };
        let DragSession {
            widget_id,
            origin,
            preview,
            mode,
            ..
        } = session;

        if preview.bounds == origin {
            return Some(DragOutcome::Unchanged { widget_id });
        }
        if !preview.valid {
            tracing::debug!("Invalid {:?} of widget {} reverted", mode, widget_id);
            return Some(DragOutcome::Reverted {
                widget_id,
                bounds: origin,
            });
        }

        match store.update_bounds(&widget_id, preview.bounds) {
            Ok(()) => Some(DragOutcome::Committed {
                widget_id,
                bounds: preview.bounds,
            }),
            Err(e) => {
                tracing::debug!("Commit of widget {} rejected: {}", widget_id, e);
                Some(DragOutcome::Reverted {
                    widget_id,
                    bounds: origin,
                })
            }
        }
    }

    /// Arrow keys nudge the selected widget one cell; Delete/Backspace remove it.
    pub fn key_press(&mut self, key: GridKey, store: &mut WidgetStore) -> KeyOutcome {
        if self.is_tracking_pointer() {
            return KeyOutcome::NoOp;
        }
        let Some(widget_id) = self.selected.clone() else {
            return KeyOutcome::NoOp;
        };
        let Some(current) = store.get(&widget_id).map(|w| w.bounds) else {
            self.selected = None;
            return KeyOutcome::NoOp;
        };

        let (delta_row, delta_col) = match key {
            GridKey::ArrowUp => (-1, 0),
            GridKey::ArrowDown => (1, 0),
            GridKey::ArrowLeft => (0, -1),
            GridKey::ArrowRight => (0, 1),
            GridKey::Delete | GridKey::Backspace => {
                self.selected = None;
                return match store.remove(&widget_id) {
                    Some(removed) => KeyOutcome::Removed(removed),
                    None => KeyOutcome::NoOp,
                };
            }
        };

        let bounds = DragMode::Move.apply(current, delta_row, delta_col, store.grid());
        if bounds == current {
            return KeyOutcome::NoOp;
        }
        match store.update_bounds(&widget_id, bounds) {
            Ok(()) => KeyOutcome::Moved { widget_id, bounds },
            Err(_) => KeyOutcome::NoOp,
        }
    }
}
