use std::sync::Arc;
use std::time::Instant;

use ember::prelude::*;

/// Answers every platform message by echoing its payload.
pub struct EchoPlatform;

impl PlatformDelegate for EchoPlatform {
    fn handle_platform_message(&self, message: PlatformMessage) {
        info!(
            "platform received {} byte(s) on '{}'",
            message.data().len(),
            message.channel()
        );
        if let Some(response) = message.response() {
            response.complete(message.data().to_vec());
        }
    }
}

pub struct LoggingRasterizer;

impl Rasterizer for LoggingRasterizer {
    fn draw(&self, frame: RasterFrame) {
        debug!(
            "rasterized frame {} with {} item(s)",
            frame.frame_number,
            frame.scene.items().len()
        );
    }
}

/// Animates a square across the viewport, drawing a decoded image beside it
/// once it arrives.
pub struct DemoLogic {
    frames: usize,
    max_frames: usize,
    size: (f64, f64),
    image: Arc<parking_lot::Mutex<Option<CanvasImage>>>,
}

impl DemoLogic {
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: 0,
            max_frames,
            size: (0.0, 0.0),
            image: Arc::default(),
        }
    }
}

impl LogicContext for DemoLogic {
    fn on_create(&mut self, scope: &mut WindowScope<'_>) {
        info!("demo running as {}", scope.isolate_id());

        scope.send_platform_message_with_reply(
            "ember/echo",
            b"hello from the demo".to_vec(),
            |_, reply| match reply {
                Some(bytes) => {
                    info!("echo replied: {}", String::from_utf8_lossy(&bytes));
                }
                None => warn!("echo replied empty"),
            },
        );

        let slot = self.image.clone();
        scope.decode_image_from_list(checkerboard_png(), move |_, image| {
            match &image {
                Some(image) => {
                    info!("decoded {}x{} image", image.width(), image.height())
                }
                None => warn!("demo image failed to decode"),
            }
            *slot.lock() = image;
        });

        scope.schedule_frame();
    }

    fn on_viewport_change(
        &mut self,
        _scope: &mut WindowScope<'_>,
        metrics: &ViewportMetrics,
    ) {
        self.size = (metrics.physical_width, metrics.physical_height);
    }

    fn on_platform_message(
        &mut self,
        scope: &mut WindowScope<'_>,
        channel: &str,
        data: &[u8],
        handle: ResponseHandle,
    ) {
        debug!("message on '{}' ({} bytes)", channel, data.len());
        if let Err(err) = scope.respond_to_platform_message(handle, data.to_vec())
        {
            warn!("{}", err);
        }
    }

    fn on_pointer_data_packet(
        &mut self,
        _scope: &mut WindowScope<'_>,
        packet: &PointerDataPacket,
    ) {
        for datum in packet.data() {
            info!(
                "pointer {:?} at ({}, {}) buttons={}",
                datum.change, datum.physical_x, datum.physical_y, datum.buttons
            );
        }
    }

    fn on_begin_frame(&mut self, scope: &mut WindowScope<'_>, _t: Instant) {
        self.frames += 1;

        let progress = self.frames as f32 / self.max_frames.max(1) as f32;
        let x = progress * (self.size.0 as f32 - 32.0).max(0.0);
        let mut scene = Scene::builder()
            .clear([0.1, 0.1, 0.1, 1.0])
            .rect([x, 16.0, 32.0, 32.0], [1.0, 0.5, 0.0, 1.0]);
        if let Some(image) = self.image.lock().clone() {
            scene = scene.image(image, [x, 64.0]);
        }
        scope.render(scene.build());

        if self.frames < self.max_frames {
            scope.schedule_frame();
        }
    }
}

fn checkerboard_png() -> Vec<u8> {
    const SIZE: u32 = 8;
    let pixels = (0..SIZE * SIZE)
        .flat_map(|i| {
            let on = (i % SIZE + i / SIZE) % 2 == 0;
            if on { [255, 255, 255, 255] } else { [0, 0, 0, 255] }
        })
        .collect::<Vec<u8>>();

    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, SIZE, SIZE);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let written = encoder
            .write_header()
            .and_then(|mut writer| writer.write_image_data(&pixels));
        if let Err(err) = written {
            error!("failed to encode demo image: {}", err);
        }
    }
    bytes
}
