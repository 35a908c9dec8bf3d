//! Selection capture over one rendered page
//!
//! A [`SelectionCapture`] turns pointer drags in container-pixel space into
//! normalized [`Region`]s. It never mutates its owner: every change is reported
//! as a [`SelectionEvent`] for the owner to apply.

use crate::geometry::{NormalizedRect, Point};
use crate::region::{Region, RegionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Drags must move more than this many pixels along both axes to count.
pub const MIN_SELECTION_PX: f64 = 10.0;

/// The rendered page a capture sits on, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
}

impl PageView {
    pub fn new(page_number: u32, width: f64, height: f64) -> Self {
        Self {
            page_number,
            width,
            height,
        }
    }

    fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    fn clamp(&self, pointer: Point) -> Point {
        Point::new(
            pointer.x.clamp(0.0, self.width.max(0.0)),
            pointer.y.clamp(0.0, self.height.max(0.0)),
        )
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The page image itself
    Surface,
    /// A control drawn over the page, such as a region's delete button
    Control,
}

/// What a completed drag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Store the rectangle as a mask region
    #[default]
    Mask,
    /// Ask the owner to copy the rectangle's content
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Selecting { start: Point, current: Point },
}

/// Data carried by a drag-and-drop onto the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DropPayload {
    /// Content cropped from a source page, sized as a fraction of a page
    #[serde(rename_all = "camelCase")]
    NewCrop {
        content: String,
        width: f64,
        height: f64,
    },
    /// An existing paste region being moved
    #[serde(rename_all = "camelCase")]
    Reposition { id: RegionId, width: f64, height: f64 },
}

impl DropPayload {
    /// Parse drag data. Payloads without usable geometry yield `None`.
    pub fn from_json(data: &str) -> Option<Self> {
        let payload: Self = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring malformed drop payload: {}", e);
                return None;
            }
        };

        let (width, height) = payload.size();
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!("Ignoring drop payload with unusable size {}x{}", width, height);
            return None;
        }
        Some(payload)
    }

    pub fn size(&self) -> (f64, f64) {
        match self {
            DropPayload::NewCrop { width, height, .. }
            | DropPayload::Reposition { width, height, .. } => (*width, *height),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Messages from a capture to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// A mask was added; carries the page's full updated list
    RegionAdded {
        page_number: u32,
        regions: Vec<Region>,
    },
    /// A mask was removed; carries what is left, possibly nothing
    RegionRemoved {
        page_number: u32,
        regions: Vec<Region>,
    },
    /// A copy-mode drag finished over `region`
    CopyRequested { region: Region },
    /// Content dropped at normalized `(x, y)`
    ContentDropped {
        page_number: u32,
        x: f64,
        y: f64,
        payload: DropPayload,
    },
}

/// Drag-to-select state for one page instance.
#[derive(Debug, Clone)]
pub struct SelectionCapture {
    view: PageView,
    mode: SelectionMode,
    allow_drop: bool,
    drag: DragState,
    regions: Vec<Region>,
}

impl SelectionCapture {
    pub fn new(view: PageView) -> Self {
        Self {
            view,
            mode: SelectionMode::Mask,
            allow_drop: false,
            drag: DragState::Idle,
            regions: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_drop(mut self, allow_drop: bool) -> Self {
        self.allow_drop = allow_drop;
        self
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Replace the local list with the owner's current one.
    pub fn sync_regions(&mut self, regions: Vec<Region>) {
        self.regions = regions;
    }

    pub fn begin_selection(&mut self, pointer: Point, target: PointerTarget) {
        if target == PointerTarget::Control {
            return;
        }
        self.drag = DragState::Selecting {
            start: pointer,
            current: pointer,
        };
    }

    /// Move the live corner, clamped to the container.
    pub fn update_selection(&mut self, pointer: Point) {
        if let DragState::Selecting { current, .. } = &mut self.drag {
            *current = self.view.clamp(pointer);
        }
    }

    /// Finish the drag. Returns `None` for clicks and drags too small to be
    /// deliberate.
    pub fn complete_selection(&mut self) -> Option<SelectionEvent> {
        let DragState::Selecting { start, current } = std::mem::take(&mut self.drag) else {
            return None;
        };

        let dx = (current.x - start.x).abs();
        let dy = (current.y - start.y).abs();
        if dx <= MIN_SELECTION_PX || dy <= MIN_SELECTION_PX {
            debug!(
                "Ignoring {:.1}x{:.1} px selection on page {}",
                dx, dy, self.view.page_number
            );
            return None;
        }
        if !self.view.has_area() {
            warn!(
                "Ignoring selection on page {} with empty view {}x{}",
                self.view.page_number, self.view.width, self.view.height
            );
            return None;
        }

        let rect = NormalizedRect::from_corners(start, current, self.view.width, self.view.height);
        let region = Region::new(RegionId::generate(), self.view.page_number, rect);

        match self.mode {
            SelectionMode::Copy => Some(SelectionEvent::CopyRequested { region }),
            SelectionMode::Mask => {
                self.regions.push(region);
                Some(SelectionEvent::RegionAdded {
                    page_number: self.view.page_number,
                    regions: self.regions.clone(),
                })
            }
        }
    }

    /// The pointer left the container; treated as a release.
    pub fn pointer_leave(&mut self) -> Option<SelectionEvent> {
        self.complete_selection()
    }

    pub fn remove_selection(&mut self, id: &RegionId) -> SelectionEvent {
        self.regions.retain(|region| &region.id != id);
        SelectionEvent::RegionRemoved {
            page_number: self.view.page_number,
            regions: self.regions.clone(),
        }
    }

    /// Forward dropped drag data with the drop point normalized to the page.
    pub fn drop_content(&self, pointer: Point, data: &str) -> Option<SelectionEvent> {
        if !self.allow_drop || !self.view.has_area() {
            return None;
        }
        let payload = DropPayload::from_json(data)?;

        Some(SelectionEvent::ContentDropped {
            page_number: self.view.page_number,
            x: pointer.x / self.view.width,
            y: pointer.y / self.view.height,
            payload,
        })
    }
}
