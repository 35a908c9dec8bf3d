//! Region composition over existing PDF pages
//!
//! Every page keeps its original content stream. Masks and pastes are drawn in
//! an extra content stream appended after it, with the original wrapped in
//! `q … Q` so whatever graphics state it leaves behind cannot move the overlay.

use crate::error::{ComposeError, Result};
use crate::geometry::{to_pdf_rect, PageBox};
use crate::graphics::{Color, Image, OverlayContent};
use crate::payload::ImagePayload;
use crate::region::{BoundsPolicy, MaskRegion, PageRegions, PasteRegion, RegionId, SelectionData};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Label drawn on masks large enough to hold it.
pub const DEFAULT_MASK_LABEL: &str = "[Masked]";

/// Smallest output accepted as a real PDF.
pub const MIN_OUTPUT_LEN: usize = 100;

const LABEL_FONT_SIZE: f64 = 10.0;
const LABEL_GRAY: f64 = 0.7;
const LABEL_MIN_WIDTH: f64 = 50.0;
const LABEL_MIN_HEIGHT: f64 = 20.0;
/// Rough half-width of the label, so it sits near the middle of the mask.
const LABEL_OFFSET_X: f64 = 20.0;

/// Bound on `/Parent` hops when looking up inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Options for composition
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Text drawn on large masks, `None` to draw plain white boxes
    pub mask_label: Option<String>,
    /// How rectangles reaching outside the page are handled
    pub bounds: BoundsPolicy,
    /// Output shorter than this is treated as a failed composition
    pub min_output_len: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            mask_label: Some(DEFAULT_MASK_LABEL.to_string()),
            bounds: BoundsPolicy::Clamp,
            min_output_len: MIN_OUTPUT_LEN,
        }
    }
}

impl ComposeOptions {
    pub fn without_label(mut self) -> Self {
        self.mask_label = None;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }
}

/// One preview or export: the source PDF and the regions to apply to it.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub pdf: Vec<u8>,
    pub selections: SelectionData,
}

impl CompositionRequest {
    pub fn new(pdf: Vec<u8>, selections: SelectionData) -> Self {
        Self { pdf, selections }
    }

    /// Build a request from raw upload parts. A missing or blank
    /// `selectionData` means no regions at all.
    pub fn from_upload(pdf: Option<Vec<u8>>, selection_json: Option<&str>) -> Result<Self> {
        let pdf = pdf.filter(|bytes| !bytes.is_empty()).ok_or(ComposeError::MissingPdf)?;
        let selections = SelectionData::from_json(selection_json.unwrap_or_default())?;
        Ok(Self { pdf, selections })
    }
}

/// A paste that was left out of the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPaste {
    pub id: RegionId,
    pub page_number: u32,
    pub reason: String,
}

/// What a composition actually drew.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompositionReport {
    /// Pages in the output document
    pub pages: usize,
    pub masks_drawn: usize,
    pub labels_drawn: usize,
    pub pastes_drawn: usize,
    pub skipped: Vec<SkippedPaste>,
    /// Regions whose page number is past the last page
    pub ignored_regions: usize,
}

#[derive(Debug, Clone)]
pub struct CompositionOutput {
    pub bytes: Vec<u8>,
    pub report: CompositionReport,
}

/// Applies mask and paste regions to PDF documents.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    options: ComposeOptions,
}

impl Compositor {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Consume `request` and produce the composed document.
    ///
    /// Input problems (no PDF, unusable regions) are reported before the PDF
    /// is parsed. A paste whose payload cannot be decoded is skipped and
    /// recorded in the report; everything else is fatal.
    pub fn compose(&self, request: CompositionRequest) -> Result<CompositionOutput> {
        let CompositionRequest { pdf, selections } = request;
        if pdf.is_empty() {
            return Err(ComposeError::MissingPdf);
        }
        let selections = selections.validated(self.options.bounds)?;

        let mut doc = Document::load_mem(&pdf).map_err(|e| ComposeError::Parse(e.to_string()))?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ComposeError::InvalidStructure(
                "document has no pages".to_string(),
            ));
        }

        info!(
            "Composing {} masks and {} pastes over {} pages",
            selections.custom_selections.len(),
            selections.pasted_selections.len(),
            pages.len()
        );

        let regions = PageRegions::from_selection(&selections);
        let mut report = CompositionReport {
            pages: pages.len(),
            ignored_regions: regions.count_beyond(pages.len()),
            ..Default::default()
        };
        if report.ignored_regions > 0 {
            warn!(
                "Ignoring {} regions on pages past the last page ({})",
                report.ignored_regions,
                pages.len()
            );
        }

        let mut state = DocumentState::default();
        for (index, page_id) in pages.values().copied().enumerate() {
            let masks = regions.masks_for(index);
            let pastes = regions.pastes_for(index);
            if masks.is_empty() && pastes.is_empty() {
                continue;
            }
            self.compose_page(&mut doc, page_id, masks, pastes, &mut state, &mut report)?;
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ComposeError::Output(e.to_string()))?;
        if bytes.len() < self.options.min_output_len {
            return Err(ComposeError::Output(format!(
                "output is only {} bytes",
                bytes.len()
            )));
        }

        info!(
            "Composed {} bytes: {} masks, {} pastes, {} skipped",
            bytes.len(),
            report.masks_drawn,
            report.pastes_drawn,
            report.skipped.len()
        );

        Ok(CompositionOutput { bytes, report })
    }

    fn compose_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        masks: &[&MaskRegion],
        pastes: &[&PasteRegion],
        state: &mut DocumentState,
        report: &mut CompositionReport,
    ) -> Result<()> {
        let page_box = page_box(doc, page_id);
        let mut resources = PageResources::resolve(doc, page_id);
        let mut overlay = OverlayContent::new();
        let mut label_font: Option<String> = None;

        for mask in masks {
            let rect = to_pdf_rect(&mask.region.rect, &page_box);
            debug!(
                "Mask {} on page {} at ({:.2}, {:.2}) {:.2}x{:.2}",
                mask.region.id,
                mask.region.page_number,
                rect.x(),
                rect.y(),
                rect.width(),
                rect.height()
            );
            overlay.fill_rect(&rect, Color::white());
            report.masks_drawn += 1;

            let Some(label) = &self.options.mask_label else {
                continue;
            };
            if rect.width() > LABEL_MIN_WIDTH && rect.height() > LABEL_MIN_HEIGHT {
                let font = match &label_font {
                    Some(name) => name.clone(),
                    None => {
                        let font_id = state.label_font(doc);
                        let name = resources.add_font(font_id);
                        label_font = Some(name.clone());
                        name
                    }
                };
                let center = rect.center();
                overlay.draw_text(
                    &font,
                    LABEL_FONT_SIZE,
                    center.x - LABEL_OFFSET_X,
                    center.y,
                    label,
                    Color::gray(LABEL_GRAY),
                );
                report.labels_drawn += 1;
            }
        }

        for paste in pastes {
            let image = match ImagePayload::parse(&paste.content)
                .and_then(|payload| Image::from_payload(&payload))
            {
                Ok(image) => image,
                Err(e) => {
                    warn!(
                        "Skipping paste {} on page {}: {}",
                        paste.region.id, paste.region.page_number, e
                    );
                    report.skipped.push(SkippedPaste {
                        id: paste.region.id.clone(),
                        page_number: paste.region.page_number,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let rect = to_pdf_rect(&paste.region.rect, &page_box);
            let image_id = image.embed(doc);
            let name = resources.add_image(image_id);
            debug!(
                "Paste {} ({}x{} {:?}) on page {} as /{}",
                paste.region.id,
                image.width(),
                image.height(),
                image.format(),
                paste.region.page_number,
                name
            );
            overlay.draw_image(&name, &rect);
            report.pastes_drawn += 1;
        }

        if overlay.is_empty() {
            return Ok(());
        }

        resources.store(doc, page_id)?;
        append_overlay(doc, page_id, overlay)
    }
}

/// Page boxes of every page, in page order.
pub fn page_boxes(pdf: &[u8]) -> Result<Vec<PageBox>> {
    let doc = Document::load_mem(pdf).map_err(|e| ComposeError::Parse(e.to_string()))?;
    Ok(doc
        .get_pages()
        .values()
        .map(|&page_id| page_box(&doc, page_id))
        .collect())
}

/// Objects shared by every page of one document.
#[derive(Default)]
struct DocumentState {
    label_font: Option<ObjectId>,
}

impl DocumentState {
    fn label_font(&mut self, doc: &mut Document) -> ObjectId {
        *self.label_font.get_or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }
}

/// A direct copy of a page's resources that overlay names are added to.
struct PageResources {
    resources: Dictionary,
    xobjects: Dictionary,
    fonts: Dictionary,
}

impl PageResources {
    /// Copy the page's own or inherited `/Resources`, with `/XObject` and
    /// `/Font` resolved to direct dictionaries.
    fn resolve(doc: &Document, page_id: ObjectId) -> Self {
        let resources = inherited(doc, page_id, b"Resources")
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);

        let subdictionary = |key: &[u8]| {
            resources
                .get(key)
                .ok()
                .and_then(|obj| resolve(doc, obj).as_dict().ok())
                .cloned()
                .unwrap_or_else(Dictionary::new)
        };
        let xobjects = subdictionary(b"XObject");
        let fonts = subdictionary(b"Font");

        Self {
            resources,
            xobjects,
            fonts,
        }
    }

    fn add_image(&mut self, id: ObjectId) -> String {
        let name = fresh_name(&self.xobjects, "RgnIm");
        self.xobjects.set(name.as_bytes(), Object::Reference(id));
        name
    }

    fn add_font(&mut self, id: ObjectId) -> String {
        let name = fresh_name(&self.fonts, "RgnHelv");
        self.fonts.set(name.as_bytes(), Object::Reference(id));
        name
    }

    /// Write the resources back onto the page itself.
    fn store(mut self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        if !self.xobjects.is_empty() {
            self.resources.set("XObject", Object::Dictionary(self.xobjects));
        }
        if !self.fonts.is_empty() {
            self.resources.set("Font", Object::Dictionary(self.fonts));
        }

        page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(self.resources));
        Ok(())
    }
}

/// `prefix1`, `prefix2`, ... whichever is first unused in `existing`.
fn fresh_name(existing: &Dictionary, prefix: &str) -> String {
    (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|name| !existing.has(name.as_bytes()))
        .unwrap_or_else(|| prefix.to_string())
}

/// Wrap the page's existing content in `q … Q` and append `overlay` after it.
fn append_overlay(doc: &mut Document, page_id: ObjectId, overlay: OverlayContent) -> Result<()> {
    let existing = page_dict(doc, page_id)?.get(b"Contents").ok().cloned();

    let mut contents = match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![Object::Reference(doc.add_object(stream))],
        _ => Vec::new(),
    };

    let mut overlay_bytes = Vec::new();
    if !contents.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.insert(0, Object::Reference(open));
        overlay_bytes.extend_from_slice(b"Q\n");
    }
    overlay_bytes.extend(overlay.into_bytes());

    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay_bytes));
    contents.push(Object::Reference(overlay_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's `/MediaBox`, inherited if needed, US Letter if unusable.
fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let values: Option<Vec<f64>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match resolve(doc, item) {
                    Object::Integer(i) => Some(*i as f64),
                    Object::Real(r) => Some(*r as f64),
                    _ => None,
                })
                .collect()
        });

    match values.as_deref() {
        Some(&[llx, lly, urx, ury]) if llx != urx && lly != ury => {
            PageBox::from_corners(llx, lly, urx, ury)
        }
        _ => {
            warn!("Page {:?} has no usable MediaBox, assuming US Letter", page_id);
            PageBox::LETTER
        }
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).and_then(Object::as_dict).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_object(parent).and_then(Object::as_dict).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| ComposeError::InvalidStructure(format!("page {page_id:?}: {e}")))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ComposeError::InvalidStructure(format!("page {page_id:?}: {e}")))
}
