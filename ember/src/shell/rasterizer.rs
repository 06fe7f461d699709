use std::time::Instant;

use crate::painting::scene::Scene;

/// A rendered frame travelling from UI to GPU.
#[derive(Clone, Debug)]
pub struct RasterFrame {
    pub frame_number: u64,
    pub frame_time: Instant,
    pub scene: Scene,
}

/// GPU-side consumer of frames. Always called on the GPU context.
pub trait Rasterizer: Send + Sync {
    fn draw(&self, frame: RasterFrame);
}

/// Drops every frame. Used when nothing is attached to the GPU context.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRasterizer;

impl Rasterizer for NullRasterizer {
    fn draw(&self, _frame: RasterFrame) {}
}
