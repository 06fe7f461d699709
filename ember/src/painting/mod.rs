pub mod image;
pub mod image_decoding;
pub mod scene;

pub use image::{CanvasImage, DecodedImage, ImageDecoder, PngDecoder};
pub use image_decoding::decode_image_from_list;
pub use scene::{DisplayItem, Scene, SceneBuilder};
