//! Owner-side state for one editing session
//!
//! Collects what the per-page captures report and turns it into the
//! [`SelectionData`] a composition needs.

use crate::crop::crop_page_region;
use crate::error::PayloadError;
use crate::geometry::NormalizedRect;
use crate::region::{MaskRegion, PasteRegion, Region, RegionId, SelectionData};
use crate::selection::{DropPayload, SelectionEvent};
use image::DynamicImage;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A copy-mode selection waiting to be dropped somewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardCrop {
    /// Where the crop was taken from
    pub source: Region,
    /// `data:image/png;base64,...`, once the source page has been cropped
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSession {
    masks: BTreeMap<u32, Vec<Region>>,
    pastes: Vec<PasteRegion>,
    clipboard: Option<ClipboardCrop>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one capture event.
    pub fn apply(&mut self, event: SelectionEvent) {
        match event {
            SelectionEvent::RegionAdded {
                page_number,
                regions,
            }
            | SelectionEvent::RegionRemoved {
                page_number,
                regions,
            } => self.set_page_masks(page_number, regions),
            SelectionEvent::CopyRequested { region } => {
                debug!("Clipboard now holds region {} from page {}", region.id, region.page_number);
                self.clipboard = Some(ClipboardCrop {
                    source: region,
                    content: None,
                });
            }
            SelectionEvent::ContentDropped {
                page_number,
                x,
                y,
                payload,
            } => self.drop_content(page_number, x, y, payload),
        }
    }

    fn set_page_masks(&mut self, page_number: u32, regions: Vec<Region>) {
        if regions.is_empty() {
            self.masks.remove(&page_number);
        } else {
            self.masks.insert(page_number, regions);
        }
    }

    /// Both kinds of drop are centered on `(x, y)` with the payload's size.
    fn drop_content(&mut self, page_number: u32, x: f64, y: f64, payload: DropPayload) {
        let (width, height) = payload.size();
        let rect = match NormalizedRect::centered_at(x, y, width, height) {
            Some(rect) if width > 0.0 && height > 0.0 => rect,
            _ => {
                warn!(
                    "Ignoring drop on page {} at ({}, {}) with size {}x{}",
                    page_number, x, y, width, height
                );
                return;
            }
        };

        match payload {
            DropPayload::NewCrop { content, .. } => {
                let region = Region::new(RegionId::generate(), page_number, rect);
                debug!("Pasting {} on page {}", region.id, page_number);
                self.pastes.push(PasteRegion::new(region, content));
            }
            DropPayload::Reposition { id, .. } => {
                let Some(paste) = self.pastes.iter_mut().find(|p| p.region.id == id) else {
                    warn!("Cannot reposition unknown paste {}", id);
                    return;
                };
                debug!("Moving {} to page {}", id, page_number);
                paste.region.rect = rect;
                paste.region.page_number = page_number;
            }
        }
    }

    /// Crop the pending copy out of `bitmap`, the rendered source page it was
    /// selected on.
    pub fn fill_clipboard(&mut self, bitmap: &DynamicImage) -> Result<(), PayloadError> {
        let Some(clipboard) = &mut self.clipboard else {
            return Ok(());
        };
        clipboard.content = Some(crop_page_region(bitmap, &clipboard.source.rect)?);
        Ok(())
    }

    pub fn clipboard(&self) -> Option<&ClipboardCrop> {
        self.clipboard.as_ref()
    }

    /// Drag data for dropping the clipboard onto a page, once it has content.
    pub fn clipboard_payload(&self) -> Option<DropPayload> {
        let clipboard = self.clipboard.as_ref()?;
        Some(DropPayload::NewCrop {
            content: clipboard.content.clone()?,
            width: clipboard.source.rect.width,
            height: clipboard.source.rect.height,
        })
    }

    pub fn remove_paste(&mut self, id: &RegionId) -> bool {
        let before = self.pastes.len();
        self.pastes.retain(|paste| &paste.region.id != id);
        self.pastes.len() != before
    }

    pub fn masks_for(&self, page_number: u32) -> &[Region] {
        self.masks.get(&page_number).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pastes(&self) -> &[PasteRegion] {
        &self.pastes
    }

    /// Everything selected so far, in page order, ready to compose.
    pub fn selection_data(&self) -> SelectionData {
        SelectionData {
            custom_selections: self
                .masks
                .values()
                .flatten()
                .cloned()
                .map(MaskRegion::new)
                .collect(),
            pasted_selections: self.pastes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::selection::{PageView, PointerTarget, SelectionCapture, SelectionMode};
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn drag(capture: &mut SelectionCapture, from: (f64, f64), to: (f64, f64)) -> SelectionEvent {
        capture.begin_selection(Point::new(from.0, from.1), PointerTarget::Surface);
        capture.update_selection(Point::new(to.0, to.1));
        capture.complete_selection().unwrap()
    }

    #[test]
    fn test_masks_follow_capture_events() {
        let mut session = SelectionSession::new();
        let mut page1 = SelectionCapture::new(PageView::new(1, 100.0, 100.0));
        let mut page3 = SelectionCapture::new(PageView::new(3, 100.0, 100.0));

        session.apply(drag(&mut page1, (0.0, 0.0), (50.0, 50.0)));
        session.apply(drag(&mut page3, (10.0, 10.0), (90.0, 40.0)));
        session.apply(drag(&mut page1, (60.0, 60.0), (90.0, 90.0)));

        assert_eq!(session.masks_for(1).len(), 2);
        assert_eq!(session.masks_for(3).len(), 1);

        let data = session.selection_data();
        let pages: Vec<u32> = data
            .custom_selections
            .iter()
            .map(|m| m.region.page_number)
            .collect();
        assert_eq!(pages, vec![1, 1, 3]);

        let id = page3.regions()[0].id.clone();
        session.apply(page3.remove_selection(&id));
        assert!(session.masks_for(3).is_empty());
        assert_eq!(session.selection_data().custom_selections.len(), 2);
    }

    #[test]
    fn test_copy_then_drop_creates_centered_paste() {
        let mut session = SelectionSession::new();
        let mut source = SelectionCapture::new(PageView::new(1, 100.0, 100.0))
            .with_mode(SelectionMode::Copy);
        session.apply(drag(&mut source, (0.0, 0.0), (40.0, 20.0)));
        assert!(session.clipboard().is_some());
        assert_eq!(session.clipboard_payload(), None);

        let bitmap = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([9, 9, 9, 255])));
        session.fill_clipboard(&bitmap).unwrap();
        let payload = session.clipboard_payload().unwrap();

        let target = SelectionCapture::new(PageView::new(2, 200.0, 200.0)).with_drop(true);
        let event = target
            .drop_content(Point::new(100.0, 100.0), &payload.to_json())
            .unwrap();
        session.apply(event);

        let pastes = session.pastes();
        assert_eq!(pastes.len(), 1);
        assert_eq!(pastes[0].region.page_number, 2);
        assert!(pastes[0].content.starts_with("data:image/png;base64,"));
        let rect = pastes[0].region.rect;
        assert!((rect.left - 0.3).abs() < 1e-9);
        assert!((rect.top - 0.4).abs() < 1e-9);
        assert!((rect.width - 0.4).abs() < 1e-9);
        assert!((rect.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_reposition_uses_payload_size_and_keeps_content() {
        let mut session = SelectionSession::new();
        session.apply(SelectionEvent::ContentDropped {
            page_number: 1,
            x: 0.5,
            y: 0.5,
            payload: DropPayload::NewCrop {
                content: "data:image/png;base64,AA==".to_string(),
                width: 0.2,
                height: 0.2,
            },
        });
        let id = session.pastes()[0].region.id.clone();

        session.apply(SelectionEvent::ContentDropped {
            page_number: 4,
            x: 0.95,
            y: 0.05,
            payload: DropPayload::Reposition {
                id: id.clone(),
                width: 0.3,
                height: 0.1,
            },
        });

        let paste = &session.pastes()[0];
        assert_eq!(paste.region.id, id);
        assert_eq!(paste.region.page_number, 4);
        assert_eq!(paste.content, "data:image/png;base64,AA==");
        let rect = paste.region.rect;
        assert!((rect.width - 0.3).abs() < 1e-9);
        assert!((rect.height - 0.1).abs() < 1e-9);
        assert!((rect.left - 0.7).abs() < 1e-9);
        assert!((rect.top - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_with_unusable_size_is_ignored() {
        let mut session = SelectionSession::new();
        for (width, height) in [(f64::NAN, 0.2), (0.2, f64::INFINITY), (0.0, 0.2), (-0.1, 0.2)] {
            session.apply(SelectionEvent::ContentDropped {
                page_number: 1,
                x: 0.5,
                y: 0.5,
                payload: DropPayload::NewCrop {
                    content: "data:image/png;base64,AA==".to_string(),
                    width,
                    height,
                },
            });
        }
        assert!(session.pastes().is_empty());

        session.apply(SelectionEvent::ContentDropped {
            page_number: 1,
            x: f64::NAN,
            y: 0.5,
            payload: DropPayload::NewCrop {
                content: "data:image/png;base64,AA==".to_string(),
                width: 0.2,
                height: 0.2,
            },
        });
        assert!(session.pastes().is_empty());
    }

    #[test]
    fn test_reposition_with_nan_size_leaves_paste_in_place() {
        let mut session = SelectionSession::new();
        session.apply(SelectionEvent::ContentDropped {
            page_number: 1,
            x: 0.5,
            y: 0.5,
            payload: DropPayload::NewCrop {
                content: "data:image/png;base64,AA==".to_string(),
                width: 0.2,
                height: 0.2,
            },
        });
        let before = session.pastes()[0].clone();

        session.apply(SelectionEvent::ContentDropped {
            page_number: 2,
            x: 0.1,
            y: 0.1,
            payload: DropPayload::Reposition {
                id: before.region.id.clone(),
                width: f64::NAN,
                height: 0.2,
            },
        });
        assert_eq!(session.pastes()[0], before);
    }

    #[test]
    fn test_reposition_unknown_is_ignored() {
        let mut session = SelectionSession::new();
        session.apply(SelectionEvent::ContentDropped {
            page_number: 1,
            x: 0.5,
            y: 0.5,
            payload: DropPayload::Reposition {
                id: RegionId::new("missing"),
                width: 0.1,
                height: 0.1,
            },
        });
        assert!(session.pastes().is_empty());
    }

    #[test]
    fn test_remove_paste() {
        let mut session = SelectionSession::new();
        for _ in 0..2 {
            session.apply(SelectionEvent::ContentDropped {
                page_number: 1,
                x: 0.5,
                y: 0.5,
                payload: DropPayload::NewCrop {
                    content: "data:image/png;base64,AA==".to_string(),
                    width: 0.1,
                    height: 0.1,
                },
            });
        }
        let id = session.pastes()[0].region.id.clone();

        assert!(session.remove_paste(&id));
        assert!(!session.remove_paste(&id));
        assert_eq!(session.pastes().len(), 1);
        assert_eq!(session.selection_data().pasted_selections.len(), 1);
    }
}
