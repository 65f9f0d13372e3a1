use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("could not decode frame {index}: {source}")]
    Image {
        index: u32,
        #[source]
        source: image::ImageError,
    },
}

/// A decoded video frame: contiguous RGBA bytes in row-major order.
///
/// The editor keeps one of these per loaded frame so the overlay can be
/// redrawn on every pointer move without asking the service again.
#[derive(Clone, Debug)]
pub struct FrameImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: u32,
}

impl FrameImage {
    pub const CHANNELS: usize = 4;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// Decodes an encoded image (JPEG, PNG, ...) as served by the frame endpoint.
    pub fn decode(bytes: &[u8], index: u32) -> Result<Self, FrameDecodeError> {
        let img = image::load_from_memory(bytes)
            .map_err(|source| FrameDecodeError::Image { index, source })?
            .into_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::new(img.into_raw(), width, height, index))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}
