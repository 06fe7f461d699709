use std::time::Instant;

use log::{debug, trace, warn};

use super::platform_message::{CallbackResponse, PlatformMessage};
use super::pointer_data::PointerDataPacket;
use super::response::{ResponseCorrelator, ResponseHandle};
use super::semantics::{SemanticsAction, SemanticsUpdate};
use super::viewport_metrics::{Locale, ViewportMetrics};
use crate::error::{CorrelationError, NativeError};
use crate::isolate::{Continuation, IsolateId, IsolateState, NativeValue, ScopeFn};
use crate::painting::image::CanvasImage;
use crate::painting::image_decoding;
use crate::painting::scene::Scene;
use crate::runtime::TaskRunners;

/// Requests flowing from the logic context out to the engine. Calls arrive on
/// UI and must not block.
pub trait WindowClient: Send + Sync {
    fn schedule_frame(&self);

    fn render(&self, scene: Scene);

    fn update_semantics(&self, update: SemanticsUpdate);

    fn handle_platform_message(&self, message: PlatformMessage);
}

/// The logic context's entry points. Every hook runs on UI with a scope that
/// reaches back into the engine; all of them default to doing nothing.
#[allow(unused_variables)]
pub trait LogicContext: Send {
    fn on_create(&mut self, scope: &mut WindowScope<'_>) {}

    fn on_viewport_change(
        &mut self,
        scope: &mut WindowScope<'_>,
        metrics: &ViewportMetrics,
    ) {
    }

    fn on_locale_change(&mut self, scope: &mut WindowScope<'_>, locale: &Locale) {}

    fn on_semantics_enabled_change(
        &mut self,
        scope: &mut WindowScope<'_>,
        enabled: bool,
    ) {
    }

    /// `handle` is [`ResponseHandle::NONE`] when the sender expects no reply.
    fn on_platform_message(
        &mut self,
        scope: &mut WindowScope<'_>,
        channel: &str,
        data: &[u8],
        handle: ResponseHandle,
    ) {
    }

    fn on_pointer_data_packet(
        &mut self,
        scope: &mut WindowScope<'_>,
        packet: &PointerDataPacket,
    ) {
    }

    fn on_semantics_action(
        &mut self,
        scope: &mut WindowScope<'_>,
        id: i32,
        action: SemanticsAction,
    ) {
    }

    fn on_begin_frame(&mut self, scope: &mut WindowScope<'_>, frame_time: Instant) {}
}

/// What a running isolate can do to the engine while one of its hooks or
/// continuations runs.
pub struct WindowScope<'a> {
    client: &'a dyn WindowClient,
    responses: &'a mut ResponseCorrelator,
    state: &'a IsolateState,
}

impl WindowScope<'_> {
    pub fn isolate_id(&self) -> IsolateId {
        self.state.id()
    }

    pub fn runners(&self) -> &TaskRunners {
        self.state.runners()
    }

    pub fn schedule_frame(&mut self) {
        self.client.schedule_frame();
    }

    pub fn render(&mut self, scene: Scene) {
        self.client.render(scene);
    }

    pub fn update_semantics(&mut self, update: SemanticsUpdate) {
        self.client.update_semantics(update);
    }

    pub fn send_platform_message(
        &mut self,
        channel: impl Into<String>,
        data: Vec<u8>,
    ) {
        let message = PlatformMessage::fire_and_forget(channel, data);
        self.client.handle_platform_message(message);
    }

    /// Sends a message whose reply, `None` when empty, is delivered to
    /// `callback` on UI while this isolate is still alive.
    pub fn send_platform_message_with_reply<F>(
        &mut self,
        channel: impl Into<String>,
        data: Vec<u8>,
        callback: F,
    ) where
        F: FnOnce(&mut WindowScope<'_>, Option<Vec<u8>>) + Send + 'static,
    {
        let continuation = self.state.continuation(callback);
        let ui = self.state.runners().ui().clone();

        let response = CallbackResponse::new(move |reply| {
            let owner = continuation.owner();
            if ui.try_post(move || {
                continuation.invoke(reply);
            })
            .is_err()
            {
                debug!("platform reply for {} arrived after shutdown", owner);
            }
        });

        self.client.handle_platform_message(PlatformMessage::new(
            channel,
            data,
            Some(response),
        ));
    }

    pub fn respond_to_platform_message(
        &mut self,
        handle: ResponseHandle,
        data: Vec<u8>,
    ) -> Result<(), CorrelationError> {
        self.responses.complete(handle, data).inspect_err(|err| {
            warn!("{}", err);
        })
    }

    pub fn decode_image_from_list<F>(&mut self, bytes: Vec<u8>, callback: F)
    where
        F: FnOnce(&mut WindowScope<'_>, Option<CanvasImage>) + Send + 'static,
    {
        let continuation = self.state.continuation(callback);
        image_decoding::decode_image_from_list(self.state, bytes, continuation);
    }

    pub fn continuation<T, F>(&self, callback: F) -> Continuation<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut WindowScope<'_>, T) + Send + 'static,
    {
        self.state.continuation(callback)
    }

    pub fn call_native(
        &mut self,
        name: &str,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, NativeError> {
        let natives = self.state.natives().clone();
        natives.call(name, self, args)
    }
}

struct RunningIsolate {
    logic: Box<dyn LogicContext>,
    state: IsolateState,
}

/// Per-session router between native events and the logic context. Owned by
/// the engine and only touched on UI.
///
/// Metrics, locale and semantics state are cached so an isolate created later
/// still starts from the current values.
pub struct Window {
    client: Box<dyn WindowClient>,
    isolate: Option<RunningIsolate>,
    responses: ResponseCorrelator,
    viewport_metrics: ViewportMetrics,
    locale: Option<Locale>,
    semantics_enabled: bool,
}

impl Window {
    pub fn new(client: Box<dyn WindowClient>) -> Self {
        Self {
            client,
            isolate: None,
            responses: ResponseCorrelator::new(),
            viewport_metrics: ViewportMetrics::default(),
            locale: None,
            semantics_enabled: false,
        }
    }

    pub fn isolate_id(&self) -> Option<IsolateId> {
        self.isolate.as_ref().map(|isolate| isolate.state.id())
    }

    pub fn has_isolate(&self) -> bool {
        self.isolate.is_some()
    }

    pub fn viewport_metrics(&self) -> &ViewportMetrics {
        &self.viewport_metrics
    }

    pub fn responses(&self) -> &ResponseCorrelator {
        &self.responses
    }

    fn with_logic<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut dyn LogicContext, &mut WindowScope<'_>),
    {
        let Some(isolate) = self.isolate.as_mut() else {
            return false;
        };
        let mut scope = WindowScope {
            client: &*self.client,
            responses: &mut self.responses,
            state: &isolate.state,
        };
        f(&mut *isolate.logic, &mut scope);
        true
    }

    /// Binds `logic` to this window and replays the cached presentation
    /// state into it. Fails, leaving the running isolate untouched, when one
    /// is already bound.
    pub fn did_create_isolate(
        &mut self,
        logic: Box<dyn LogicContext>,
        state: IsolateState,
    ) -> bool {
        if let Some(running) = &self.isolate {
            warn!(
                "{} is already running; ignoring {}",
                running.state.id(),
                state.id()
            );
            return false;
        }

        debug!("{} created", state.id());
        self.isolate = Some(RunningIsolate { logic, state });

        let metrics = self.viewport_metrics;
        let locale = self.locale.clone();
        let semantics_enabled = self.semantics_enabled;
        self.with_logic(|logic, scope| {
            logic.on_create(scope);
            logic.on_viewport_change(scope, &metrics);
            if let Some(locale) = &locale {
                logic.on_locale_change(scope, locale);
            }
            logic.on_semantics_enabled_change(scope, semantics_enabled);
        });
        true
    }

    pub fn update_window_metrics(&mut self, metrics: ViewportMetrics) {
        self.viewport_metrics = metrics;
        self.with_logic(|logic, scope| logic.on_viewport_change(scope, &metrics));
    }

    pub fn update_locale(&mut self, locale: Locale) {
        self.locale = Some(locale.clone());
        self.with_logic(|logic, scope| logic.on_locale_change(scope, &locale));
    }

    pub fn update_semantics_enabled(&mut self, enabled: bool) {
        self.semantics_enabled = enabled;
        self.with_logic(|logic, scope| {
            logic.on_semantics_enabled_change(scope, enabled)
        });
    }

    /// Routes an inbound message. A reply slot is allocated before the logic
    /// context sees the message; without an isolate the reply is completed
    /// empty right away.
    pub fn dispatch_platform_message(&mut self, message: PlatformMessage) {
        if self.isolate.is_none() {
            trace!(
                "no isolate for message on '{}'; replying empty",
                message.channel()
            );
            if let Some(response) = message.response() {
                response.complete_empty();
            }
            return;
        }

        let handle = match message.response() {
            Some(response) => self.responses.allocate(response.clone()),
            None => ResponseHandle::NONE,
        };

        self.with_logic(|logic, scope| {
            logic.on_platform_message(
                scope,
                message.channel(),
                message.data(),
                handle,
            )
        });
    }

    pub fn dispatch_pointer_data_packet(&mut self, packet: &PointerDataPacket) {
        self.with_logic(|logic, scope| logic.on_pointer_data_packet(scope, packet));
    }

    pub fn dispatch_semantics_action(&mut self, id: i32, action: SemanticsAction) {
        self.with_logic(|logic, scope| {
            logic.on_semantics_action(scope, id, action)
        });
    }

    pub fn begin_frame(&mut self, frame_time: Instant) -> bool {
        self.with_logic(|logic, scope| logic.on_begin_frame(scope, frame_time))
    }

    pub fn complete_platform_message_response(
        &mut self,
        handle: ResponseHandle,
        data: Vec<u8>,
    ) -> Result<(), CorrelationError> {
        self.responses.complete(handle, data)
    }

    /// Runs `f` in the scope of isolate `id`. Returns `false` if a different
    /// isolate, or none, is bound.
    pub fn enter(&mut self, id: IsolateId, f: ScopeFn<'_>) -> bool {
        let Some(isolate) = self.isolate.as_ref() else {
            return false;
        };
        if isolate.state.id() != id {
            return false;
        }
        let mut scope = WindowScope {
            client: &*self.client,
            responses: &mut self.responses,
            state: &isolate.state,
        };
        f(&mut scope);
        true
    }

    pub fn call_native(
        &mut self,
        name: &str,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, NativeError> {
        let Some(isolate) = self.isolate.as_ref() else {
            return Err(NativeError::NoIsolate);
        };
        let mut scope = WindowScope {
            client: &*self.client,
            responses: &mut self.responses,
            state: &isolate.state,
        };
        scope.call_native(name, args)
    }

    /// Unbinds the isolate. Pending replies are discarded and the id is
    /// retired so outstanding continuations become no-ops.
    pub fn shutdown_isolate(&mut self) -> Option<IsolateId> {
        let isolate = self.isolate.take()?;
        let id = isolate.state.id();

        let discarded = self.responses.discard_all();
        isolate.state.registry().unregister(id);
        debug!("{} shut down, {} reply slot(s) discarded", id, discarded);
        Some(id)
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.shutdown_isolate();
    }
}
