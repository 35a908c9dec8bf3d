//! Region data contract
//!
//! The JSON shape here is shared with the browser client and must stay
//! bit-exact:
//!
//! ```text
//! MaskRegion:  { id, pageNumber, left, top, width, height }
//! PasteRegion: { id, pageNumber, left, top, width, height, content: "data:<mime>;base64,<data>" }
//! ```

use crate::error::{ComposeError, Result};
use crate::geometry::NormalizedRect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Opaque region identifier, unique within one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh collision-free identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A normalized rectangle on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default = "RegionId::generate")]
    pub id: RegionId,
    /// 1-based page number
    pub page_number: u32,
    #[serde(flatten)]
    pub rect: NormalizedRect,
}

impl Region {
    pub fn new(id: impl Into<RegionId>, page_number: u32, rect: NormalizedRect) -> Self {
        Self {
            id: id.into(),
            page_number,
            rect,
        }
    }

    /// 0-based page index. Only meaningful once `page_number >= 1` has been
    /// validated.
    pub fn page_index(&self) -> usize {
        self.page_number.saturating_sub(1) as usize
    }

    /// Check the region against `policy`.
    ///
    /// Returns `Ok(None)` when clamping leaves nothing to draw.
    pub fn validate(&self, policy: BoundsPolicy) -> Result<Option<Region>> {
        let invalid = |reason: &str| ComposeError::InvalidRegion {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };

        if self.page_number == 0 {
            return Err(invalid("pageNumber must be 1 or greater"));
        }
        if !self.rect.is_finite() {
            return Err(invalid("coordinates must be finite numbers"));
        }
        if self.rect.width < 0.0 || self.rect.height < 0.0 {
            return Err(invalid("width and height must not be negative"));
        }

        if self.rect.is_within_page() {
            return Ok(Some(self.clone()));
        }

        match policy {
            BoundsPolicy::Reject => Err(invalid("rectangle extends outside the page")),
            BoundsPolicy::Clamp => match self.rect.clamp_to_page() {
                Some(rect) => Ok(Some(Region {
                    rect,
                    ..self.clone()
                })),
                None => {
                    warn!(
                        "Dropping region {} on page {}: nothing left inside the page",
                        self.id, self.page_number
                    );
                    Ok(None)
                }
            },
        }
    }
}

/// A region to paint opaque white.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskRegion {
    #[serde(flatten)]
    pub region: Region,
}

impl MaskRegion {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

/// A region to fill with a pasted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasteRegion {
    #[serde(flatten)]
    pub region: Region,
    /// `data:<mime>;base64,<data>`. Decoded lazily by the compositor so that a
    /// single bad payload only costs that one overlay.
    #[serde(default)]
    pub content: String,
}

impl PasteRegion {
    pub fn new(region: Region, content: impl Into<String>) -> Self {
        Self {
            region,
            content: content.into(),
        }
    }
}

/// What to do with rectangles that reach outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Intersect with the page, dropping regions with nothing left.
    #[default]
    Clamp,
    /// Fail the request as an input error.
    Reject,
}

impl FromStr for BoundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(BoundsPolicy::Clamp),
            "reject" => Ok(BoundsPolicy::Reject),
            other => Err(format!("unknown bounds policy '{other}' (expected clamp or reject)")),
        }
    }
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsPolicy::Clamp => f.write_str("clamp"),
            BoundsPolicy::Reject => f.write_str("reject"),
        }
    }
}

/// The `selectionData` payload sent with a preview or export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionData {
    pub custom_selections: Vec<MaskRegion>,
    pub pasted_selections: Vec<PasteRegion>,
}

impl SelectionData {
    /// Parse the `selectionData` field. A missing or blank field means no
    /// selections at all.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.custom_selections.is_empty() && self.pasted_selections.is_empty()
    }

    /// Validate every region, applying `policy` to out-of-page rectangles.
    pub fn validated(self, policy: BoundsPolicy) -> Result<Self> {
        let mut custom_selections = Vec::with_capacity(self.custom_selections.len());
        for mask in self.custom_selections {
            if let Some(region) = mask.region.validate(policy)? {
                custom_selections.push(MaskRegion { region });
            }
        }

        let mut pasted_selections = Vec::with_capacity(self.pasted_selections.len());
        for paste in self.pasted_selections {
            if let Some(region) = paste.region.validate(policy)? {
                pasted_selections.push(PasteRegion {
                    region,
                    content: paste.content,
                });
            }
        }

        Ok(Self {
            custom_selections,
            pasted_selections,
        })
    }
}

/// Regions grouped by 0-based page index, built fresh for every request.
/// List order within a page is preserved.
#[derive(Debug, Default)]
pub struct PageRegions<'a> {
    masks: BTreeMap<usize, Vec<&'a MaskRegion>>,
    pastes: BTreeMap<usize, Vec<&'a PasteRegion>>,
}

impl<'a> PageRegions<'a> {
    pub fn from_selection(data: &'a SelectionData) -> Self {
        let mut regions = Self::default();
        for mask in &data.custom_selections {
            regions
                .masks
                .entry(mask.region.page_index())
                .or_default()
                .push(mask);
        }
        for paste in &data.pasted_selections {
            regions
                .pastes
                .entry(paste.region.page_index())
                .or_default()
                .push(paste);
        }
        regions
    }

    pub fn masks_for(&self, page_index: usize) -> &[&'a MaskRegion] {
        self.masks.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pastes_for(&self, page_index: usize) -> &[&'a PasteRegion] {
        self.pastes.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of regions that target pages at or beyond `page_count`.
    pub fn count_beyond(&self, page_count: usize) -> usize {
        let masks: usize = self.masks.range(page_count..).map(|(_, v)| v.len()).sum();
        let pastes: usize = self.pastes.range(page_count..).map(|(_, v)| v.len()).sum();
        masks + pastes
    }
}
