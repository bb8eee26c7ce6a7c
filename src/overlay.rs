//! Annotated overview image: every detection outlined in its class colour,
//! with a short label above the box.

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::classify::DetectionSet;
use crate::detect::{Detection, ObjectClass};

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Outline thickness in pixels, drawn inwards from the box edge.
    pub line_thickness: u32,
    /// Label glyph height in pixels.
    pub font_px: f32,
    /// Gap between the label baseline and the box top edge.
    pub label_offset: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_thickness: 2,
            font_px: 16.0,
            label_offset: 10,
        }
    }
}

#[inline]
pub const fn class_color(class: ObjectClass) -> Rgb<u8> {
    match class {
        ObjectClass::Rider => Rgb([0, 255, 0]),
        ObjectClass::Helmet => Rgb([0, 0, 255]),
        ObjectClass::Plate => Rgb([255, 0, 0]),
    }
}

pub struct OverlayRenderer {
    style: OverlayStyle,
    font: Option<FontRef<'static>>,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        let font = match FontRef::try_from_slice(FONT_DATA) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!("overlay font unavailable, labels disabled: {}", err);
                None
            }
        };
        Self { style, font }
    }

    /// Draws all detections on a copy of `image`; the source is left untouched.
    pub fn render(&self, image: &RgbImage, set: &DetectionSet) -> RgbImage {
        let mut canvas = image.clone();
        for detection in set.iter() {
            self.draw_detection(&mut canvas, detection);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let color = class_color(detection.class);
        let bbox = detection.bbox;
        let (cw, ch) = canvas.dimensions();
        // Edges beyond the canvas land one pixel outside it and stay invisible.
        let x1 = clamp_coord(bbox.x1(), cw);
        let y1 = clamp_coord(bbox.y1(), ch);
        let x2 = clamp_coord(bbox.x2(), cw);
        let y2 = clamp_coord(bbox.y2(), ch);
        let w = (x2 - x1 + 1) as u32;
        let h = (y2 - y1 + 1) as u32;

        for t in 0..self.style.line_thickness.min(w.max(h)) {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            let rect = Rect::at(x1 + t as i32, y1 + t as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        if let Some(font) = &self.font {
            let font_px = self.style.font_px as i64;
            let text_top = (bbox.y1() as i64 - self.style.label_offset as i64 - font_px)
                .clamp(-2 * font_px - 1, ch as i64) as i32;
            draw_text_mut(
                canvas,
                color,
                x1,
                text_top,
                PxScale::from(self.style.font_px),
                font,
                detection.class.display_name(),
            );
        }
    }
}

fn clamp_coord(v: i32, max: u32) -> i32 {
    (v as i64).clamp(-1, max as i64) as i32
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(class: ObjectClass, x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            class,
            confidence: 1.0,
        }
    }

    fn gray(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([128, 128, 128]))
    }

    #[test]
    fn outlines_use_class_colours() {
        let source = gray(200, 200);
        let set = DetectionSet {
            riders: vec![det(ObjectClass::Rider, 10, 40, 90, 190)],
            helmets: vec![det(ObjectClass::Helmet, 100, 40, 140, 80)],
            plates: vec![det(ObjectClass::Plate, 150, 150, 190, 170)],
        };
        let out = OverlayRenderer::default().render(&source, &set);

        assert_eq!(*out.get_pixel(10, 100), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(11, 100), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(90, 100), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(120, 80), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(170, 150), Rgb([255, 0, 0]));
        // Interior untouched.
        assert_eq!(*out.get_pixel(50, 120), Rgb([128, 128, 128]));
    }

    #[test]
    fn source_image_is_not_mutated() {
        let source = gray(64, 64);
        let set = DetectionSet {
            riders: vec![det(ObjectClass::Rider, 5, 30, 60, 60)],
            ..DetectionSet::default()
        };
        let out = OverlayRenderer::default().render(&source, &set);
        assert_ne!(out, source);
        assert!(source.pixels().all(|p| *p == Rgb([128, 128, 128])));
    }

    #[test]
    fn label_is_drawn_above_the_box() {
        let source = gray(200, 200);
        let set = DetectionSet {
            riders: vec![det(ObjectClass::Rider, 20, 100, 180, 190)],
            ..DetectionSet::default()
        };
        let out = OverlayRenderer::default().render(&source, &set);
        let label_band = (20..120).flat_map(|x| (60..92).map(move |y| (x, y)));
        let touched = label_band
            .filter(|&(x, y)| *out.get_pixel(x, y) != Rgb([128, 128, 128]))
            .count();
        assert!(touched > 0);
    }

    #[test]
    fn boxes_at_and_beyond_the_border_do_not_panic() {
        let source = gray(32, 32);
        let set = DetectionSet {
            riders: vec![det(ObjectClass::Rider, -10, -10, 50, 50)],
            helmets: vec![det(ObjectClass::Helmet, 31, 31, 31, 31)],
            plates: vec![det(ObjectClass::Plate, 100, 100, 120, 120)],
        };
        let out = OverlayRenderer::default().render(&source, &set);
        assert_eq!(out.dimensions(), (32, 32));
    }

    #[test]
    fn saturated_coordinates_are_clamped_to_the_canvas() {
        let source = gray(64, 64);
        let set = DetectionSet {
            riders: vec![det(ObjectClass::Rider, 0, 0, 50, 50)],
            helmets: vec![Detection {
                bbox: BoundingBox::from_f32(-1e10, 0.0, 1e10, 10.0),
                class: ObjectClass::Helmet,
                confidence: 0.7,
            }],
            plates: vec![det(ObjectClass::Plate, i32::MIN, i32::MIN, i32::MAX, i32::MAX)],
        };
        let out = OverlayRenderer::default().render(&source, &set);
        assert_eq!(*out.get_pixel(32, 10), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(32, 9), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(32, 30), Rgb([128, 128, 128]));
    }

    #[test]
    fn empty_set_renders_an_identical_copy() {
        let source = gray(16, 16);
        let out = OverlayRenderer::default().render(&source, &DetectionSet::default());
        assert_eq!(out, source);
    }
}
