use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use log::{debug, info, warn};

use super::engine::{
    Engine, EngineParts, NullPlatformDelegate, PlatformDelegate, SharedEngine,
};
use super::platform_view::{PlatformEventSource, PlatformView};
use super::rasterizer::{NullRasterizer, Rasterizer};
use crate::error::RuntimeError;
use crate::isolate::NativeTable;
use crate::painting::image::{ImageDecoder, PngDecoder};
use crate::runtime::events::EngineEventSender;
use crate::runtime::settings::EngineSettings;
use crate::runtime::vsync_waiter::{FallbackVsyncWaiter, VsyncWaiter};
use crate::runtime::{EngineRuntime, ExecutionContext, TaskRunners};
use crate::window::{
    Locale, LogicContext, PlatformMessage, PointerDataPacket, SemanticsAction,
    ViewportMetrics,
};

/// Collaborators plugged into a [`Shell`]. Everything defaults to a headless
/// stand-in.
pub struct ShellParts {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub platform: Arc<dyn PlatformDelegate>,
    pub decoder: Arc<dyn ImageDecoder>,
    /// `None` paces frames with a clock at the configured refresh rate.
    pub waiter: Option<Arc<dyn VsyncWaiter>>,
    pub natives: NativeTable,
    pub events: Option<EngineEventSender>,
}

impl Default for ShellParts {
    fn default() -> Self {
        Self {
            rasterizer: Arc::new(NullRasterizer),
            platform: Arc::new(NullPlatformDelegate),
            decoder: Arc::new(PngDecoder),
            waiter: None,
            natives: NativeTable::standard(),
            events: None,
        }
    }
}

/// Owns the runtime and everything running on it.
///
/// All engine state is touched on UI only: every method here posts a task
/// and returns immediately, except [`Shell::with_engine`] and
/// [`Shell::flush`] which wait for UI.
pub struct Shell {
    engine: SharedEngine,
    platform_view: Arc<PlatformView>,
    event_source: PlatformEventSource,
    torn_down: AtomicBool,
    runtime: EngineRuntime,
}

impl Shell {
    pub fn new(
        settings: &EngineSettings,
        parts: ShellParts,
    ) -> Result<Self, RuntimeError> {
        let runtime = EngineRuntime::new(settings)?;
        let runners = runtime.runners().clone();

        let waiter: Arc<dyn VsyncWaiter> = match parts.waiter {
            Some(waiter) => waiter,
            None => Arc::new(FallbackVsyncWaiter::with_thread_name(
                settings.refresh_rate(),
                format!("{}.vsync", settings.thread_prefix),
            )?),
        };

        let engine = Engine::create(EngineParts {
            runners: runners.clone(),
            waiter,
            rasterizer: parts.rasterizer,
            platform: parts.platform,
            decoder: parts.decoder,
            natives: Arc::new(parts.natives),
            events: parts.events,
        });

        let (platform_view, event_source) = PlatformView::new(
            runners,
            Arc::downgrade(&engine),
            settings.platform_event_capacity(),
        );

        info!("shell ready");

        Ok(Self {
            engine,
            platform_view,
            event_source,
            torn_down: AtomicBool::new(false),
            runtime,
        })
    }

    pub fn runners(&self) -> &TaskRunners {
        self.runtime.runners()
    }

    pub fn event_source(&self) -> PlatformEventSource {
        self.event_source.clone()
    }

    pub fn platform_view(&self) -> &Arc<PlatformView> {
        &self.platform_view
    }

    fn post_to_engine<F>(&self, f: F)
    where
        F: FnOnce(&mut Engine) + Send + 'static,
    {
        let engine = self.engine.clone();
        let posted = self.runners().ui().try_post(move || f(&mut engine.lock()));
        if posted.is_err() {
            warn!("engine task dropped: UI shut down");
        }
    }

    pub fn run_logic<L>(&self, logic: L)
    where
        L: LogicContext + 'static,
    {
        self.post_to_engine(move |engine| {
            engine.run(Box::new(logic));
        });
    }

    pub fn shutdown_isolate(&self) {
        self.post_to_engine(|engine| {
            engine.shutdown_isolate();
        });
    }

    pub fn set_viewport_metrics(&self, metrics: ViewportMetrics) {
        self.post_to_engine(move |engine| engine.set_viewport_metrics(metrics));
    }

    pub fn set_locale(&self, locale: Locale) {
        self.post_to_engine(move |engine| engine.set_locale(locale));
    }

    pub fn set_semantics_enabled(&self, enabled: bool) {
        self.post_to_engine(move |engine| engine.set_semantics_enabled(enabled));
    }

    pub fn dispatch_platform_message(&self, message: PlatformMessage) {
        self.post_to_engine(move |engine| {
            engine.dispatch_platform_message(message)
        });
    }

    pub fn dispatch_pointer_data_packet(&self, packet: PointerDataPacket) {
        self.post_to_engine(move |engine| {
            engine.dispatch_pointer_data_packet(&packet)
        });
    }

    pub fn dispatch_semantics_action(&self, id: i32, action: SemanticsAction) {
        self.post_to_engine(move |engine| {
            engine.dispatch_semantics_action(id, action)
        });
    }

    /// Runs `f` against the engine on UI and waits for the result. Returns
    /// `None` when called from UI itself or after shutdown.
    pub fn with_engine<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Engine) -> R + Send + 'static,
    {
        let ui = self.runners().ui();
        if ui.runs_tasks_on_current_thread() {
            warn!("with_engine called from UI; refusing to wait on itself");
            return None;
        }

        let (tx, rx) = mpsc::channel();
        let engine = self.engine.clone();
        ui.try_post(move || {
            let _ = tx.send(f(&mut engine.lock()));
        })
        .ok()?;
        rx.recv().ok()
    }

    pub fn flush(&self, context: ExecutionContext) -> bool {
        self.runners().flush(context)
    }

    /// Tears the isolate down on UI, discarding pending replies, waits for UI
    /// to reach that point, then drains and joins every context.
    pub fn shutdown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let engine = self.engine.clone();
        let posted = self.runners().ui().try_post(move || {
            engine.lock().shutdown_isolate();
        });
        if posted.is_err() {
            debug!("UI already closed during shell shutdown");
        } else {
            // Work queued on UI ahead of the teardown may still post to IO.
            self.runners().flush(ExecutionContext::Ui);
        }

        self.runtime.shutdown();
        info!("shell shut down");
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.shutdown();
    }
}
