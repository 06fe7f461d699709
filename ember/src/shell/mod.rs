pub mod animator;
pub mod engine;
pub mod platform_view;
pub mod rasterizer;
#[allow(clippy::module_inception)]
pub mod shell;

pub use animator::{Animator, AnimatorDelegate};
pub use engine::{
    Engine, EngineParts, NullPlatformDelegate, PlatformDelegate, SharedEngine,
};
pub use platform_view::{
    ButtonAction, PlatformEvent, PlatformEventSource, PlatformView,
};
pub use rasterizer::{NullRasterizer, RasterFrame, Rasterizer};
pub use shell::{Shell, ShellParts};
