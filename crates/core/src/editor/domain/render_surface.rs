use crate::shared::frame_image::FrameImage;
use crate::shared::geometry::{DisplayPoint, DisplayRect};

/// Straight (non-premultiplied) RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

pub const FRAME_BORDER: Color = Color::rgb(255, 0, 0);
pub const DETECTED_FACE: Color = Color::rgb(0x00, 0xff, 0x00);
pub const MANUAL_FACE: Color = Color::rgb(0xff, 0x99, 0x00);
pub const FACE_CENTER: Color = Color::rgb(0, 0, 255);
pub const DRAFT_STROKE: Color = Color::rgb(0xff, 0x99, 0x00);
/// rgba(255, 153, 0, 0.2)
pub const DRAFT_FILL: Color = Color::rgba(0xff, 0x99, 0x00, 51);

/// Fixed-size 2D drawing target in display coordinates.
///
/// Implementations only need immediate-mode primitives; the editor repaints
/// everything from its cached frame on each change.
pub trait RenderSurface: Send {
    /// Canvas size in display pixels.
    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    /// Paints the frame scaled to cover the whole canvas.
    fn draw_frame(&mut self, frame: &FrameImage);

    fn stroke_rect(&mut self, rect: DisplayRect, color: Color, line_width: f64);

    fn fill_rect(&mut self, rect: DisplayRect, color: Color);

    /// `at` is the baseline-left anchor of the text.
    fn fill_text(&mut self, text: &str, at: DisplayPoint, color: Color);
}

/// Relates a canvas to the size it is actually shown at.
///
/// Pointer events arrive in client pixels; when the canvas is stretched or
/// shrunk by the UI they must be rescaled before they mean anything in
/// display space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceLayout {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub client_width: f64,
    pub client_height: f64,
}

impl SurfaceLayout {
    pub fn new(canvas: (u32, u32), client: (f64, f64)) -> Self {
        Self {
            canvas_width: canvas.0 as f64,
            canvas_height: canvas.1 as f64,
            client_width: client.0,
            client_height: client.1,
        }
    }

    /// A canvas shown at its natural size.
    pub fn unscaled(canvas: (u32, u32)) -> Self {
        Self::new(canvas, (canvas.0 as f64, canvas.1 as f64))
    }

    pub fn to_canvas(&self, client: DisplayPoint) -> DisplayPoint {
        DisplayPoint::new(
            client.x * ratio(self.canvas_width, self.client_width),
            client.y * ratio(self.canvas_height, self.client_height),
        )
    }
}

fn ratio(canvas: f64, client: f64) -> f64 {
    if client > 0.0 && client.is_finite() {
        canvas / client
    } else {
        1.0
    }
}
