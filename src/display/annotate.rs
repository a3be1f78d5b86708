//! Drawing detections onto images.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::model::{Rect, Record};

/// Produces the annotated copy of an image that the review panels show.
pub trait Annotate: Send + Sync {
    fn annotate(&self, image: &DynamicImage, record: &Record) -> DynamicImage;
}

/// Draws rectangle outlines around the runner, the bib and every shoe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxAnnotator {
    pub person_color: Rgba<u8>,
    pub bib_color: Rgba<u8>,
    pub shoe_color: Rgba<u8>,
    /// Outline thickness in pixels
    pub thickness: u32,
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self {
            person_color: Rgba([0, 200, 0, 255]),
            bib_color: Rgba([0, 120, 255, 255]),
            shoe_color: Rgba([255, 40, 40, 255]),
            thickness: 3,
        }
    }
}

impl BoxAnnotator {
    fn outline(&self, canvas: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
        let Some((x, y, w, h)) = rect.to_pixels(canvas.width(), canvas.height()) else {
            return;
        };
        draw_rect_outline(canvas, x, y, w, h, color, self.thickness);
    }
}

impl Annotate for BoxAnnotator {
    fn annotate(&self, image: &DynamicImage, record: &Record) -> DynamicImage {
        let mut canvas = image.to_rgba8();

        if let Some(person) = &record.person_bbox {
            self.outline(&mut canvas, person, self.person_color);
        }
        if let Some(bib) = &record.bib_detection {
            self.outline(&mut canvas, &bib.bbox, self.bib_color);
        }
        for shoe in &record.shoes {
            self.outline(&mut canvas, &shoe.bbox, self.shoe_color);
        }

        DynamicImage::ImageRgba8(canvas)
    }
}

/// Draw a rectangle outline, growing outwards by `thickness` and clipped to
/// the canvas.
fn draw_rect_outline(
    canvas: &mut RgbaImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    if w == 0 || h == 0 || canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let max_x = canvas.width() - 1;
    let max_y = canvas.height() - 1;

    let x0 = x.min(max_x);
    let y0 = y.min(max_y);
    let x1 = (x + w - 1).min(max_x);
    let y1 = (y + h - 1).min(max_y);

    for t in 0..thickness.max(1) {
        let tx0 = x0.saturating_sub(t);
        let ty0 = y0.saturating_sub(t);
        let tx1 = (x1 + t).min(max_x);
        let ty1 = (y1 + t).min(max_y);

        for xx in tx0..=tx1 {
            canvas.put_pixel(xx, ty0, color);
            canvas.put_pixel(xx, ty1, color);
        }
        for yy in ty0..=ty1 {
            canvas.put_pixel(tx0, yy, color);
            canvas.put_pixel(tx1, yy, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShoeDetection;

    #[test]
    fn test_outline_only() {
        let image = DynamicImage::new_rgba8(20, 20);
        let record = Record::new("a.jpg").with_shoe(ShoeDetection::new(
            Rect::new(5.0, 5.0, 15.0, 15.0),
            0.9,
        ));
        let annotator = BoxAnnotator {
            thickness: 1,
            ..Default::default()
        };

        let out = annotator.annotate(&image, &record).to_rgba8();
        assert_eq!(*out.get_pixel(5, 5), annotator.shoe_color);
        assert_eq!(*out.get_pixel(14, 10), annotator.shoe_color);
        assert_eq!(*out.get_pixel(10, 10), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_boxes_outside_image_are_ignored() {
        let image = DynamicImage::new_rgba8(10, 10);
        let record = Record::new("a.jpg").with_person_bbox(Rect::new(50.0, 50.0, 80.0, 80.0));

        let out = BoxAnnotator::default().annotate(&image, &record).to_rgba8();
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_thick_outline_clips_at_edges() {
        let image = DynamicImage::new_rgba8(10, 10);
        let record = Record::new("a.jpg").with_person_bbox(Rect::new(0.0, 0.0, 10.0, 10.0));
        let annotator = BoxAnnotator::default();

        let out = annotator.annotate(&image, &record).to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), annotator.person_color);
        assert_eq!(*out.get_pixel(9, 9), annotator.person_color);
    }
}
