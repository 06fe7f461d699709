pub use crate::error::{
    CorrelationError, NativeError, RuntimeError, SettingsError,
};
pub use crate::framework::logging::{debug, error, info, trace, warn};
pub use crate::framework::logging::{init_logger, init_logger_with_filter};
pub use crate::isolate::{
    Continuation, IsolateId, IsolateRegistry, NativeClosure, NativeTable,
    NativeValue,
};
pub use crate::painting::{
    CanvasImage, DecodedImage, DisplayItem, ImageDecoder, PngDecoder, Scene,
    SceneBuilder,
};
pub use crate::runtime::events::{
    EngineEvent, EngineEventReceiver, EngineEventSender, event_channel,
};
pub use crate::runtime::settings::{EngineSettings, load_or_default};
pub use crate::runtime::vsync_waiter::{
    DisplayVsyncWaiter, FallbackVsyncWaiter, VsyncPulse, VsyncWaiter,
};
pub use crate::runtime::{EngineRuntime, ExecutionContext, TaskRunners};
pub use crate::shell::{
    ButtonAction, NullPlatformDelegate, NullRasterizer, PlatformDelegate,
    PlatformEvent, PlatformEventSource, RasterFrame, Rasterizer, Shell,
    ShellParts,
};
pub use crate::window::{
    CallbackResponse, Locale, LogicContext, PlatformMessage,
    PlatformMessageResponse, PointerChange, PointerData, PointerDataPacket,
    PointerDeviceKind, ResponseHandle, SemanticsAction, SemanticsNode,
    SemanticsUpdate, ViewportMetrics, WindowScope,
};
