use std::sync::Arc;

use super::image::CanvasImage;

#[derive(Clone, Debug)]
pub enum DisplayItem {
    Clear {
        color: [f32; 4],
    },
    Rect {
        rect: [f32; 4],
        color: [f32; 4],
    },
    Image {
        image: CanvasImage,
        origin: [f32; 2],
    },
}

/// Immutable display list handed from UI to the rasterizer on GPU.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    items: Arc<[DisplayItem]>,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Default)]
pub struct SceneBuilder {
    items: Vec<DisplayItem>,
}

impl SceneBuilder {
    pub fn clear(mut self, color: [f32; 4]) -> Self {
        self.items.push(DisplayItem::Clear { color });
        self
    }

    pub fn rect(mut self, rect: [f32; 4], color: [f32; 4]) -> Self {
        self.items.push(DisplayItem::Rect { rect, color });
        self
    }

    pub fn image(mut self, image: CanvasImage, origin: [f32; 2]) -> Self {
        self.items.push(DisplayItem::Image { image, origin });
        self
    }

    pub fn build(self) -> Scene {
        Scene {
            items: self.items.into(),
        }
    }
}
