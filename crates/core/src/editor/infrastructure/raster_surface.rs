use std::path::Path;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, Blend};
use imageproc::rect::Rect;

use crate::editor::domain::render_surface::{Color, RenderSurface};
use crate::shared::frame_image::FrameImage;
use crate::shared::geometry::{DisplayPoint, DisplayRect};

static LABEL_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");
const LABEL_SCALE: f32 = 13.0;
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Off-screen RGBA canvas drawn with `imageproc`.
///
/// Every label drawn since the last [`clear`](RenderSurface::clear) is also
/// kept in [`labels`](Self::labels) for callers that want to print it.
pub struct RasterSurface {
    canvas: Blend<RgbaImage>,
    font: Option<FontRef<'static>>,
    labels: Vec<(String, DisplayPoint)>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let font = match FontRef::try_from_slice(LABEL_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("Label font unusable, labels will not be drawn: {e}");
                None
            }
        };
        Self {
            canvas: Blend(RgbaImage::new(width, height)),
            font,
            labels: Vec::new(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas.0
    }

    pub fn labels(&self) -> &[(String, DisplayPoint)] {
        &self.labels
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.canvas.0.save_with_format(path, image::ImageFormat::Png)
    }

    /// Pixel rectangle covered by `rect`, clipped to the canvas. `None` when
    /// nothing is left to paint.
    fn pixel_rect(&self, rect: DisplayRect) -> Option<Rect> {
        let (w, h) = self.canvas.0.dimensions();
        let x0 = rect.x.round().clamp(0.0, w as f64) as u32;
        let y0 = rect.y.round().clamp(0.0, h as f64) as u32;
        let x1 = (rect.x + rect.width).round().clamp(0.0, w as f64) as u32;
        let y1 = (rect.y + rect.height).round().clamp(0.0, h as f64) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0))
    }
}

fn rgba(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}

impl RenderSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.canvas.0.dimensions()
    }

    fn clear(&mut self) {
        for px in self.canvas.0.pixels_mut() {
            *px = BACKGROUND;
        }
        self.labels.clear();
    }

    fn draw_frame(&mut self, frame: &FrameImage) {
        let Some(source) = frame.to_rgba_image() else {
            log::warn!("Frame {} has inconsistent pixel data, skipping", frame.index());
            return;
        };
        let (w, h) = self.canvas.0.dimensions();
        let scaled = if source.dimensions() == (w, h) {
            source
        } else {
            imageops::resize(&source, w, h, imageops::FilterType::Triangle)
        };
        imageops::replace(&mut self.canvas.0, &scaled, 0, 0);
    }

    /// The stroke is centred on the rectangle's edge, one nested outline per
    /// pixel of line width.
    fn stroke_rect(&mut self, rect: DisplayRect, color: Color, line_width: f64) {
        let lw = line_width.max(1.0).round();
        let half = (lw / 2.0).floor();
        for inset in 0..lw as u32 {
            let grow = half - inset as f64;
            let outline = DisplayRect::new(
                rect.x - grow,
                rect.y - grow,
                rect.width + 2.0 * grow,
                rect.height + 2.0 * grow,
            );
            if let Some(r) = self.pixel_rect(outline) {
                draw_hollow_rect_mut(&mut self.canvas, r, rgba(color));
            }
        }
    }

    fn fill_rect(&mut self, rect: DisplayRect, color: Color) {
        if let Some(r) = self.pixel_rect(rect) {
            draw_filled_rect_mut(&mut self.canvas, r, rgba(color));
        }
    }

    fn fill_text(&mut self, text: &str, at: DisplayPoint, color: Color) {
        self.labels.push((text.to_string(), at));
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(LABEL_SCALE);
        let ascent = font.as_scaled(scale).ascent() as f64;
        draw_text_mut(
            &mut self.canvas.0,
            rgba(color),
            at.x.round() as i32,
            (at.y - ascent).round() as i32,
            scale,
            font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::domain::render_surface::{DETECTED_FACE, DRAFT_FILL, FRAME_BORDER};

    fn solid_frame(w: u32, h: u32, rgba: [u8; 4]) -> FrameImage {
        let data = rgba.repeat((w * h) as usize);
        FrameImage::new(data, w, h, 7)
    }

    fn close(got: [u8; 4], want: [u8; 4]) -> bool {
        got.iter().zip(want).all(|(g, w)| g.abs_diff(w) <= 1)
    }

    #[test]
    fn test_draw_frame_scales_to_canvas() {
        let mut surface = RasterSurface::new(80, 45);
        surface.draw_frame(&solid_frame(16, 9, [10, 200, 30, 255]));

        for (x, y) in [(0, 0), (40, 22), (79, 44)] {
            let px = surface.image().get_pixel(x, y).0;
            assert!(close(px, [10, 200, 30, 255]), "pixel ({x},{y}) = {px:?}");
        }
    }

    #[test]
    fn test_stroke_rect_paints_edges_not_interior() {
        let mut surface = RasterSurface::new(100, 100);
        surface.clear();
        surface.stroke_rect(DisplayRect::new(10.0, 10.0, 50.0, 50.0), FRAME_BORDER, 2.0);

        let red = [255, 0, 0, 255];
        assert_eq!(surface.image().get_pixel(10, 10).0, red);
        assert_eq!(surface.image().get_pixel(35, 10).0, red);
        assert_eq!(surface.image().get_pixel(10, 35).0, red);
        assert_eq!(surface.image().get_pixel(60, 35).0, red);
        assert_eq!(surface.image().get_pixel(35, 60).0, red);
        assert_eq!(surface.image().get_pixel(35, 35).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_translucent_fill_blends_over_background() {
        let mut surface = RasterSurface::new(10, 10);
        surface.clear();
        surface.fill_rect(DisplayRect::new(0.0, 0.0, 10.0, 10.0), DRAFT_FILL);

        let px = surface.image().get_pixel(5, 5).0;
        assert!(close(px, [51, 31, 0, 255]), "blended pixel = {px:?}");
    }

    #[test]
    fn test_shapes_outside_canvas_are_clipped() {
        let mut surface = RasterSurface::new(20, 20);
        surface.clear();
        surface.fill_rect(DisplayRect::new(-50.0, -50.0, 10.0, 10.0), FRAME_BORDER);
        surface.fill_rect(DisplayRect::new(15.0, 15.0, 100.0, 100.0), FRAME_BORDER);

        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(19, 19).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_label_glyphs_are_rasterized() {
        let mut surface = RasterSurface::new(120, 40);
        surface.clear();
        surface.fill_text("Face 1", DisplayPoint::new(10.0, 25.0), DETECTED_FACE);

        let mut inked = 0;
        let mut bare = 0;
        for y in 10..25 {
            for x in 10..50 {
                if surface.image().get_pixel(x, y).0 == [0, 0, 0, 255] {
                    bare += 1;
                } else {
                    inked += 1;
                }
            }
        }
        // Glyph strokes leave gaps, unlike a solid block.
        assert!(inked > 0, "no label pixels drawn");
        assert!(bare > 0, "label painted as a solid block");
        assert_eq!(surface.image().get_pixel(100, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_label_ordinal_changes_the_pixels() {
        let render = |text: &str| {
            let mut surface = RasterSurface::new(120, 40);
            surface.clear();
            surface.fill_text(text, DisplayPoint::new(10.0, 25.0), DETECTED_FACE);
            surface.image().clone()
        };

        assert_ne!(render("Face 1"), render("Face 2"));
        assert_ne!(render("Face 1"), render("Manual Face 1"));
    }

    #[test]
    fn test_fill_text_records_label_and_clear_forgets_it() {
        let mut surface = RasterSurface::new(100, 50);
        surface.fill_text("Face 1", DisplayPoint::new(10.0, 20.0), FRAME_BORDER);
        assert_eq!(surface.labels().len(), 1);
        assert_eq!(surface.labels()[0].0, "Face 1");

        surface.clear();
        assert!(surface.labels().is_empty());
    }

    #[test]
    fn test_save_png_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut surface = RasterSurface::new(8, 8);
        surface.clear();

        surface.save_png(&path).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (8, 8));
    }
}
