//! Content-stream operators for page overlays

mod color;
mod image;

pub use self::color::Color;
pub use self::image::{ColorSpace, Image};

use crate::geometry::Rectangle;
use std::fmt::Write;

/// Builds the operators of one overlay content stream.
///
/// The stream is appended after a page's original content, so every drawing
/// call leaves the graphics state as it found it.
#[derive(Clone, Debug, Default)]
pub struct OverlayContent {
    operations: String,
}

impl OverlayContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_state(&mut self) -> &mut Self {
        self.operations.push_str("q\n");
        self
    }

    pub fn restore_state(&mut self) -> &mut Self {
        self.operations.push_str("Q\n");
        self
    }

    /// Fill `rect` with an opaque `color`.
    pub fn fill_rect(&mut self, rect: &Rectangle, color: Color) -> &mut Self {
        self.save_state();
        let _ = writeln!(&mut self.operations, "{}", color.fill_operator());
        let _ = writeln!(
            &mut self.operations,
            "{:.2} {:.2} {:.2} {:.2} re",
            rect.x(),
            rect.y(),
            rect.width(),
            rect.height()
        );
        self.operations.push_str("f\n");
        self.restore_state()
    }

    /// Draw the image XObject `image_name` stretched to exactly fill `rect`.
    pub fn draw_image(&mut self, image_name: &str, rect: &Rectangle) -> &mut Self {
        self.save_state();

        // Image space is the unit square; scale it onto the target box.
        let _ = writeln!(
            &mut self.operations,
            "{:.2} 0 0 {:.2} {:.2} {:.2} cm",
            rect.width(),
            rect.height(),
            rect.x(),
            rect.y()
        );
        let _ = writeln!(&mut self.operations, "/{image_name} Do");

        self.restore_state()
    }

    /// Show a single line of ASCII text with its baseline starting at `(x, y)`.
    /// Other characters are drawn as `?`.
    pub fn draw_text(
        &mut self,
        font_name: &str,
        size: f64,
        x: f64,
        y: f64,
        text: &str,
        color: Color,
    ) -> &mut Self {
        self.save_state();
        let _ = writeln!(&mut self.operations, "{}", color.fill_operator());
        self.operations.push_str("BT\n");
        let _ = writeln!(&mut self.operations, "/{font_name} {size:.2} Tf");
        let _ = writeln!(&mut self.operations, "{x:.2} {y:.2} Td");
        let _ = writeln!(&mut self.operations, "({}) Tj", escape_text(text));
        self.operations.push_str("ET\n");
        self.restore_state()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get the operations string
    pub fn operations(&self) -> &str {
        &self.operations
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.operations.into_bytes()
    }
}

/// Escape a literal string operand.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_ascii() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_content_new() {
        let content = OverlayContent::new();
        assert!(content.is_empty());
        assert!(content.operations().is_empty());
    }

    #[test]
    fn test_fill_rect() {
        let mut content = OverlayContent::new();
        content.fill_rect(
            &Rectangle::from_position_and_size(10.0, 20.0, 30.0, 40.0),
            Color::white(),
        );

        assert_eq!(
            content.operations(),
            "q\n1.000 g\n10.00 20.00 30.00 40.00 re\nf\nQ\n"
        );
    }

    #[test]
    fn test_draw_image() {
        let mut content = OverlayContent::new();
        content.draw_image(
            "RgnIm1",
            &Rectangle::from_position_and_size(0.0, 396.0, 306.0, 396.0),
        );

        let ops = content.operations();
        assert!(ops.starts_with("q\n"));
        assert!(ops.contains("306.00 0 0 396.00 0.00 396.00 cm\n"));
        assert!(ops.contains("/RgnIm1 Do\n"));
        assert!(ops.ends_with("Q\n"));
    }

    #[test]
    fn test_draw_text() {
        let mut content = OverlayContent::new();
        content.draw_text("RgnHelv", 10.0, 100.0, 200.0, "[Masked]", Color::gray(0.7));

        let ops = content.operations();
        assert!(ops.contains("0.700 g\n"));
        assert!(ops.contains("BT\n/RgnHelv 10.00 Tf\n100.00 200.00 Td\n([Masked]) Tj\nET\n"));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_text("naïve"), "na?ve");
    }

    #[test]
    fn test_balanced_state() {
        let mut content = OverlayContent::new();
        content
            .fill_rect(&Rectangle::from_position_and_size(0.0, 0.0, 1.0, 1.0), Color::white())
            .draw_image("X", &Rectangle::from_position_and_size(0.0, 0.0, 1.0, 1.0))
            .draw_text("F", 10.0, 0.0, 0.0, "t", Color::black());

        let ops = content.operations();
        assert_eq!(ops.matches("q\n").count(), ops.matches("Q\n").count());
    }
}
