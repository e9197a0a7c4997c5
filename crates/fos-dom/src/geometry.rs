//! Geometry
//!
//! Layout results attached to elements: the `offset*` box and the
//! document-space rect derived from it.

/// Axis-aligned rectangle in document coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether any part of the rect lies within the vertical band
    /// `[band_top, band_bottom]`, edges inclusive
    pub fn overlaps_band(&self, band_top: f64, band_bottom: f64) -> bool {
        self.top() <= band_bottom && self.bottom() >= band_top
    }
}

/// Element box as produced by layout
///
/// Offsets are relative to the document origin; there are no offset
/// parents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementGeometry {
    pub offset_top: f64,
    pub offset_left: f64,
    pub offset_width: f64,
    pub offset_height: f64,
}

impl ElementGeometry {
    /// A block starting at `top` on the left edge
    pub fn block(top: f64, width: f64, height: f64) -> Self {
        Self {
            offset_top: top,
            offset_left: 0.0,
            offset_width: width,
            offset_height: height,
        }
    }

    pub fn bounding_rect(&self) -> DOMRect {
        DOMRect::from_xywh(self.offset_left, self.offset_top, self.offset_width, self.offset_height)
    }
}
