use std::sync::{Arc, Weak};
use std::time::Instant;

use log::{debug, info, trace};
use parking_lot::Mutex;

use super::animator::{Animator, AnimatorDelegate};
use super::rasterizer::Rasterizer;
use crate::error::NativeError;
use crate::isolate::{
    IsolateHost, IsolateId, IsolateRegistry, IsolateState, NativeTable,
    NativeValue, ScopeFn,
};
use crate::painting::image::ImageDecoder;
use crate::painting::scene::Scene;
use crate::runtime::TaskRunners;
use crate::runtime::events::{EngineEvent, EngineEventSender, emit};
use crate::runtime::vsync_waiter::VsyncWaiter;
use crate::window::{
    Locale, LogicContext, PlatformMessage, PointerDataPacket, SemanticsAction,
    SemanticsUpdate, ViewportMetrics, Window, WindowClient,
};

/// Native side of the platform channel. Called on the Platform context.
pub trait PlatformDelegate: Send + Sync {
    fn handle_platform_message(&self, message: PlatformMessage);

    fn update_semantics(&self, _update: SemanticsUpdate) {}
}

/// Answers every message with an empty reply.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPlatformDelegate;

impl PlatformDelegate for NullPlatformDelegate {
    fn handle_platform_message(&self, message: PlatformMessage) {
        if let Some(response) = message.response() {
            response.complete_empty();
        }
    }
}

pub type SharedEngine = Arc<Mutex<Engine>>;

pub struct EngineParts {
    pub runners: TaskRunners,
    pub waiter: Arc<dyn VsyncWaiter>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub platform: Arc<dyn PlatformDelegate>,
    pub decoder: Arc<dyn ImageDecoder>,
    pub natives: Arc<NativeTable>,
    pub events: Option<EngineEventSender>,
}

struct EngineClient {
    runners: TaskRunners,
    animator: Arc<Animator>,
    platform: Arc<dyn PlatformDelegate>,
}

impl WindowClient for EngineClient {
    fn schedule_frame(&self) {
        self.animator.request_frame();
    }

    fn render(&self, scene: Scene) {
        self.animator.render(scene);
    }

    fn update_semantics(&self, update: SemanticsUpdate) {
        let platform = self.platform.clone();
        let posted = self
            .runners
            .platform()
            .try_post(move || platform.update_semantics(update));
        if posted.is_err() {
            debug!("semantics update dropped: platform shut down");
        }
    }

    fn handle_platform_message(&self, message: PlatformMessage) {
        let platform = self.platform.clone();
        let channel = message.channel().to_string();
        let posted = self
            .runners
            .platform()
            .try_post(move || platform.handle_platform_message(message));
        if posted.is_err() {
            debug!("message on '{}' dropped: platform shut down", channel);
        }
    }
}

/// UI-side owner of the window and the running isolate.
///
/// Lives behind a [`SharedEngine`] mutex that is only ever locked by tasks
/// running on UI. Continuations and vsync callbacks reach it through posted
/// tasks, never from inside a locked section.
pub struct Engine {
    runners: TaskRunners,
    registry: Arc<IsolateRegistry>,
    animator: Arc<Animator>,
    decoder: Arc<dyn ImageDecoder>,
    natives: Arc<NativeTable>,
    events: Option<EngineEventSender>,
    host: Weak<Mutex<Engine>>,
    window: Window,
}

impl Engine {
    pub fn create(parts: EngineParts) -> SharedEngine {
        let EngineParts {
            runners,
            waiter,
            rasterizer,
            platform,
            decoder,
            natives,
            events,
        } = parts;

        Arc::new_cyclic(|weak: &Weak<Mutex<Engine>>| {
            let delegate: Weak<dyn AnimatorDelegate> = weak.clone();
            let animator = Animator::new(
                runners.clone(),
                waiter,
                rasterizer,
                delegate,
                events.clone(),
            );
            let client = EngineClient {
                runners: runners.clone(),
                animator: animator.clone(),
                platform,
            };

            Mutex::new(Engine {
                runners,
                registry: IsolateRegistry::new(),
                animator,
                decoder,
                natives,
                events,
                host: weak.clone(),
                window: Window::new(Box::new(client)),
            })
        })
    }

    pub fn runners(&self) -> &TaskRunners {
        &self.runners
    }

    pub fn registry(&self) -> &Arc<IsolateRegistry> {
        &self.registry
    }

    pub fn animator(&self) -> &Arc<Animator> {
        &self.animator
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn isolate_id(&self) -> Option<IsolateId> {
        self.window.isolate_id()
    }

    /// Starts `logic` as a new isolate, replacing any running one.
    pub fn run(&mut self, logic: Box<dyn LogicContext>) -> IsolateId {
        if self.window.has_isolate() {
            self.shutdown_isolate();
        }

        let host: Weak<dyn IsolateHost> = self.host.clone();
        let id = self.registry.register(host);
        let state = IsolateState::new(
            id,
            self.registry.clone(),
            self.runners.clone(),
            self.decoder.clone(),
            self.natives.clone(),
        );

        self.window.did_create_isolate(logic, state);
        info!("{} running", id);
        emit(self.events.as_ref(), EngineEvent::IsolateReady(id));
        id
    }

    pub fn shutdown_isolate(&mut self) -> Option<IsolateId> {
        let id = self.window.shutdown_isolate()?;
        info!("{} torn down", id);
        emit(self.events.as_ref(), EngineEvent::IsolateShutdown(id));
        Some(id)
    }

    pub fn set_viewport_metrics(&mut self, metrics: ViewportMetrics) {
        self.window.update_window_metrics(metrics);
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.window.update_locale(locale);
    }

    pub fn set_semantics_enabled(&mut self, enabled: bool) {
        self.window.update_semantics_enabled(enabled);
    }

    pub fn dispatch_platform_message(&mut self, message: PlatformMessage) {
        self.window.dispatch_platform_message(message);
    }

    pub fn dispatch_pointer_data_packet(&mut self, packet: &PointerDataPacket) {
        self.window.dispatch_pointer_data_packet(packet);
    }

    pub fn dispatch_semantics_action(
        &mut self,
        id: i32,
        action: SemanticsAction,
    ) {
        self.window.dispatch_semantics_action(id, action);
    }

    pub fn begin_frame(&mut self, frame_time: Instant) {
        if !self.window.begin_frame(frame_time) {
            trace!("frame began without an isolate");
        }
    }

    pub fn call_native(
        &mut self,
        name: &str,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, NativeError> {
        self.window.call_native(name, args)
    }
}

impl IsolateHost for Mutex<Engine> {
    fn enter(&self, id: IsolateId, f: ScopeFn<'_>) -> bool {
        self.lock().window.enter(id, f)
    }
}

impl AnimatorDelegate for Mutex<Engine> {
    fn on_animator_begin_frame(&self, frame_time: Instant, frame_number: u64) {
        trace!("begin frame {}", frame_number);
        self.lock().begin_frame(frame_time);
    }
}
