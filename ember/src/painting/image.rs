use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use log::debug;

/// Tightly packed 8-bit RGBA pixels.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Turns encoded bytes into pixels. Runs on the IO context, never on UI.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage>;
}

/// The engine's handle to a decoded image, cheap to clone and share with the
/// rasterizer.
#[derive(Clone)]
pub struct CanvasImage {
    image: Arc<DecodedImage>,
}

impl CanvasImage {
    pub fn new(image: DecodedImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.image.pixels
    }

    pub fn ptr_eq(&self, other: &CanvasImage) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for CanvasImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasImage")
            .field("width", &self.image.width)
            .field("height", &self.image.height)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PngDecoder;

impl ImageDecoder for PngDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        match decode_png(bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                debug!("png decode failed: {}", err);
                None
            }
        }
    }
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, String> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(
        png::Transformations::EXPAND | png::Transformations::STRIP_16,
    );

    let mut reader = decoder
        .read_info()
        .map_err(|err| format!("png header failed: {}", err))?;

    let (color_type, _) = reader.output_color_type();
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let mut buffer =
        vec![0u8; width as usize * height as usize * color_type.samples()];

    let frame = reader
        .next_frame(&mut buffer)
        .map_err(|err| format!("png frame failed: {}", err))?;
    buffer.truncate(frame.buffer_size());

    let pixels = match frame.color_type {
        png::ColorType::Rgba => buffer,
        png::ColorType::Rgb => buffer
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
            .collect(),
        png::ColorType::GrayscaleAlpha => buffer
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        png::ColorType::Grayscale => buffer
            .iter()
            .flat_map(|&g| [g, g, g, u8::MAX])
            .collect(),
        png::ColorType::Indexed => {
            return Err("indexed png was not expanded".to_string());
        }
    };

    Ok(DecodedImage {
        width: frame.width,
        height: frame.height,
        pixels,
    })
}
