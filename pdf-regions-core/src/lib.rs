//! # pdf-regions
//!
//! Mask and overlay rectangular regions of existing PDF pages without
//! re-rendering them.
//!
//! ## Features
//!
//! - **Selection capture**: turn pointer drags over a rendered page into
//!   normalized regions, reported as events
//! - **Masking**: paint regions opaque white, with an optional label
//! - **Pasting**: fill regions with PNG or JPEG content, such as a crop of
//!   another document's page
//! - **Preservation**: original page content, size and order are kept as-is
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_regions::{Compositor, CompositionRequest, ComposeOptions, SelectionData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pdf = std::fs::read("worksheet.pdf")?;
//! let selections = SelectionData::from_json(
//!     r#"{"customSelections":[{"id":"a","pageNumber":1,"left":0.1,"top":0.1,"width":0.3,"height":0.1}]}"#,
//! )?;
//!
//! let output = Compositor::new(ComposeOptions::default())
//!     .compose(CompositionRequest::new(pdf, selections))?;
//!
//! println!("{} masks drawn", output.report.masks_drawn);
//! std::fs::write("masked.pdf", output.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Coordinates
//!
//! Regions are fractions of the page measured from its visual top-left
//! corner. They are converted to PDF points against each page's actual
//! `/MediaBox` at composition time; see [`geometry::to_pdf_rect`].

pub mod compositor;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod graphics;
pub mod payload;
pub mod region;
pub mod selection;
pub mod session;

pub use compositor::{
    page_boxes, ComposeOptions, CompositionOutput, CompositionReport,
    CompositionRequest, Compositor, SkippedPaste,
};
pub use crop::crop_page_region;
pub use error::{ComposeError, PayloadError, Result};
pub use geometry::{to_pdf_rect, NormalizedRect, PageBox, Point, Rectangle};
pub use payload::{ImageFormat, ImagePayload};
pub use region::{BoundsPolicy, MaskRegion, PageRegions, PasteRegion, Region, RegionId, SelectionData};
pub use selection::{
    DragState, DropPayload, PageView, PointerTarget, SelectionCapture, SelectionEvent,
    SelectionMode,
};
pub use session::{ClipboardCrop, SelectionSession};
