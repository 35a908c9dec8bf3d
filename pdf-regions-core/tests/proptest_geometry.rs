//! Property-based tests for region geometry
//!
//! Checks the screen-to-PDF conversion and the normalization helpers across
//! arbitrary page sizes and rectangles.

use pdf_regions::{to_pdf_rect, NormalizedRect, PageBox, Point};
use proptest::prelude::*;

const EPSILON: f64 = 1e-6;

fn page_extent() -> impl Strategy<Value = f64> {
    prop_oneof![1.0..5000.0f64, Just(612.0), Just(792.0), Just(595.0), Just(842.0)]
}

// A rectangle that lies inside the unit square
prop_compose! {
    fn in_page_rect()(
        left in 0.0..1.0f64,
        top in 0.0..1.0f64,
        w in 0.0..1.0f64,
        h in 0.0..1.0f64
    ) -> NormalizedRect {
        NormalizedRect::new(left, top, w * (1.0 - left), h * (1.0 - top))
    }
}

prop_compose! {
    fn page_box()(
        x in -1000.0..1000.0f64,
        y in -1000.0..1000.0f64,
        width in page_extent(),
        height in page_extent()
    ) -> PageBox {
        PageBox::from_corners(x, y, x + width, y + height)
    }
}

proptest! {
    #[test]
    fn test_pdf_rect_matches_formula(rect in in_page_rect(), page in page_box()) {
        let pdf = to_pdf_rect(&rect, &page);

        prop_assert!((pdf.x() - (page.origin.x + rect.left * page.width)).abs() < EPSILON);
        prop_assert!(
            (pdf.y() - (page.origin.y + page.height - rect.top * page.height - rect.height * page.height)).abs()
                < EPSILON
        );
        prop_assert!((pdf.width() - rect.width * page.width).abs() < EPSILON);
        prop_assert!((pdf.height() - rect.height * page.height).abs() < EPSILON);
    }

    #[test]
    fn test_in_page_rect_stays_on_page(rect in in_page_rect(), page in page_box()) {
        let pdf = to_pdf_rect(&rect, &page);

        prop_assert!(pdf.lower_left.x >= page.origin.x - EPSILON);
        prop_assert!(pdf.lower_left.y >= page.origin.y - EPSILON);
        prop_assert!(pdf.upper_right.x <= page.origin.x + page.width + EPSILON);
        prop_assert!(pdf.upper_right.y <= page.origin.y + page.height + EPSILON);
    }

    #[test]
    fn test_larger_top_means_lower_y(
        top_a in 0.0..0.5f64,
        delta in 0.01..0.4f64,
        height in 0.0..0.1f64,
        page in page_box()
    ) {
        let upper = to_pdf_rect(&NormalizedRect::new(0.0, top_a, 0.1, height), &page);
        let lower = to_pdf_rect(&NormalizedRect::new(0.0, top_a + delta, 0.1, height), &page);
        prop_assert!(lower.y() < upper.y());
    }

    #[test]
    fn test_from_corners_is_direction_independent(
        x1 in 0.0..800.0f64,
        y1 in 0.0..600.0f64,
        x2 in 0.0..800.0f64,
        y2 in 0.0..600.0f64
    ) {
        let a = NormalizedRect::from_corners(Point::new(x1, y1), Point::new(x2, y2), 800.0, 600.0);
        let b = NormalizedRect::from_corners(Point::new(x2, y2), Point::new(x1, y1), 800.0, 600.0);

        prop_assert_eq!(a, b);
        prop_assert!(a.width >= 0.0 && a.height >= 0.0);
        prop_assert!(a.right() <= 1.0 + EPSILON && a.bottom() <= 1.0 + EPSILON);
    }

    #[test]
    fn test_clamp_to_page_result_is_inside(
        left in -2.0..2.0f64,
        top in -2.0..2.0f64,
        width in 0.0..3.0f64,
        height in 0.0..3.0f64
    ) {
        if let Some(clamped) = NormalizedRect::new(left, top, width, height).clamp_to_page() {
            prop_assert!(clamped.left >= 0.0 && clamped.top >= 0.0);
            prop_assert!(clamped.right() <= 1.0 + EPSILON);
            prop_assert!(clamped.bottom() <= 1.0 + EPSILON);
            prop_assert!(clamped.width > 0.0 && clamped.height > 0.0);
        }
    }

    #[test]
    fn test_centered_at_stays_inside(
        x in -1.0..2.0f64,
        y in -1.0..2.0f64,
        width in 0.0..1.5f64,
        height in 0.0..1.5f64
    ) {
        let rect = NormalizedRect::centered_at(x, y, width, height);
        prop_assert!(rect.is_some());
        let rect = rect.unwrap();
        prop_assert!(rect.left >= 0.0 && rect.top >= 0.0);
        prop_assert!(rect.right() <= 1.0 + EPSILON);
        prop_assert!(rect.bottom() <= 1.0 + EPSILON);
    }
}
