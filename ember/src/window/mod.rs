pub mod platform_message;
pub mod pointer_data;
pub mod response;
pub mod semantics;
pub mod viewport_metrics;
#[allow(clippy::module_inception)]
pub mod window;

pub use platform_message::{
    CallbackResponse, PlatformMessage, PlatformMessageResponse,
};
pub use pointer_data::{
    PointerChange, PointerData, PointerDataPacket, PointerDeviceKind,
};
pub use response::{HandleState, ResponseCorrelator, ResponseHandle};
pub use semantics::{SemanticsAction, SemanticsNode, SemanticsUpdate};
pub use viewport_metrics::{Locale, ViewportMetrics};
pub use window::{LogicContext, Window, WindowClient, WindowScope};
