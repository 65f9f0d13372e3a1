use thiserror::Error;

use crate::shared::geometry::{DisplayRect, SourceRect};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("source video size must be positive, got {width}x{height}")]
    DegenerateSource { width: f64, height: f64 },
    #[error("display surface size must be positive, got {width}x{height}")]
    DegenerateDisplay { width: f64, height: f64 },
}

/// Bidirectional transform between source-video pixels and a fixed-size
/// display surface.
///
/// Built once the source size is known. The editor takes its own copy when
/// editing begins, so in-flight drag coordinates never see a rescale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    scale_x: f64,
    scale_y: f64,
    display_width: f64,
    display_height: f64,
}

impl CoordinateMapper {
    pub fn new(
        display_width: f64,
        display_height: f64,
        source_width: f64,
        source_height: f64,
    ) -> Result<Self, MappingError> {
        if !is_positive(source_width) || !is_positive(source_height) {
            return Err(MappingError::DegenerateSource {
                width: source_width,
                height: source_height,
            });
        }
        if !is_positive(display_width) || !is_positive(display_height) {
            return Err(MappingError::DegenerateDisplay {
                width: display_width,
                height: display_height,
            });
        }
        Ok(Self {
            scale_x: display_width / source_width,
            scale_y: display_height / source_height,
            display_width,
            display_height,
        })
    }

    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    pub fn display_size(&self) -> (f64, f64) {
        (self.display_width, self.display_height)
    }

    pub fn to_display(&self, r: SourceRect) -> DisplayRect {
        DisplayRect::new(
            r.x * self.scale_x,
            r.y * self.scale_y,
            r.width * self.scale_x,
            r.height * self.scale_y,
        )
    }

    pub fn to_source(&self, r: DisplayRect) -> SourceRect {
        SourceRect::new(
            r.x / self.scale_x,
            r.y / self.scale_y,
            r.width / self.scale_x,
            r.height / self.scale_y,
        )
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
