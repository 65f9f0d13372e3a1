use crate::shared::geometry::SourceRect;

/// A face box on one frame, in source-video pixels.
///
/// Regions carry no identity of their own: they are addressed by their
/// position in the frame's sequence as the service last reported it.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Added by the operator rather than the detector.
    pub manual: bool,
}

impl FaceRegion {
    pub fn detected(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            manual: false,
        }
    }

    pub fn manual(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            manual: true,
            ..Self::detected(x, y, width, height)
        }
    }

    pub fn source_rect(&self) -> SourceRect {
        SourceRect::new(
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Display label: 1-based ordinal, prefixed for operator-added boxes.
    pub fn label(&self, index: usize) -> String {
        if self.manual {
            format!("Manual Face {}", index + 1)
        } else {
            format!("Face {}", index + 1)
        }
    }
}
