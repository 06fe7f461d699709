use log::debug;

use super::image::CanvasImage;
use crate::isolate::{Continuation, IsolateState};
use crate::pipeline::run_on_io_then_ui;

/// Decodes `bytes` on IO with the isolate's decoder and hands the resulting
/// image, or `None`, to `continuation` on UI.
///
/// Empty input never reaches the decoder but is still delivered
/// asynchronously through the same path.
pub fn decode_image_from_list(
    state: &IsolateState,
    bytes: Vec<u8>,
    continuation: Continuation<Option<CanvasImage>>,
) {
    let decoder = state.decoder().clone();

    run_on_io_then_ui(
        state.runners(),
        bytes,
        move |bytes: Vec<u8>| {
            if bytes.is_empty() {
                return None;
            }
            let len = bytes.len();
            let image = decoder.decode(&bytes).map(CanvasImage::new);
            if image.is_none() {
                debug!("could not decode {} byte image", len);
            }
            image
        },
        continuation,
    );
}
