use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Weak};
use std::time::Instant;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use super::engine::Engine;
use crate::framework::util::micros_since;
use crate::runtime::TaskRunners;
use crate::window::{PointerChange, PointerData, PointerDataPacket, ViewportMetrics};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonAction {
    Press,
    Release,
}

/// Raw input as reported by the windowing toolkit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlatformEvent {
    WindowSizeChanged { width: u32, height: u32 },
    /// `button` 0 is the primary button.
    MouseButton { button: u8, action: ButtonAction },
    CursorMoved { x: f64, y: f64 },
    Key { key: u32, action: ButtonAction },
}

enum ViewUpdate {
    Metrics(ViewportMetrics),
    Pointer(PointerData),
}

#[derive(Default)]
struct InputState {
    buttons: i64,
    tracking: bool,
    cursor: (f64, f64),
}

/// Converts native input into engine events on the Platform context.
pub struct PlatformView {
    runners: TaskRunners,
    engine: Weak<Mutex<Engine>>,
    receiver: Mutex<Receiver<PlatformEvent>>,
    input: Mutex<InputState>,
    pump_scheduled: AtomicBool,
    origin: Instant,
}

/// Handed to native callbacks. Pushing never blocks; when the queue is full
/// the event is dropped.
#[derive(Clone)]
pub struct PlatformEventSource {
    sender: SyncSender<PlatformEvent>,
    view: Weak<PlatformView>,
}

impl PlatformView {
    pub fn new(
        runners: TaskRunners,
        engine: Weak<Mutex<Engine>>,
        capacity: usize,
    ) -> (Arc<Self>, PlatformEventSource) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let view = Arc::new(Self {
            runners,
            engine,
            receiver: Mutex::new(receiver),
            input: Mutex::new(InputState::default()),
            pump_scheduled: AtomicBool::new(false),
            origin: Instant::now(),
        });
        let source = PlatformEventSource {
            sender,
            view: Arc::downgrade(&view),
        };
        (view, source)
    }

    /// Drains queued events and forwards the results to UI in arrival
    /// order. Runs on Platform.
    pub fn pump(&self) {
        self.pump_scheduled.store(false, Ordering::Release);

        let mut updates = Vec::new();
        {
            let receiver = self.receiver.lock();
            let mut input = self.input.lock();
            while let Ok(event) = receiver.try_recv() {
                if let Some(update) = self.translate(&mut input, event) {
                    updates.push(update);
                }
            }
        }

        if updates.is_empty() {
            return;
        }

        let engine = self.engine.clone();
        let posted = self.runners.ui().try_post(move || {
            let Some(engine) = engine.upgrade() else {
                trace!("engine gone; dropping platform input");
                return;
            };
            let mut engine = engine.lock();
            let mut pending = Vec::new();
            for update in updates {
                match update {
                    ViewUpdate::Pointer(datum) => pending.push(datum),
                    ViewUpdate::Metrics(metrics) => {
                        flush_pointers(&mut engine, &mut pending);
                        engine.set_viewport_metrics(metrics);
                    }
                }
            }
            flush_pointers(&mut engine, &mut pending);
        });
        if posted.is_err() {
            debug!("platform input dropped: UI shut down");
        }
    }

    fn translate(
        &self,
        input: &mut InputState,
        event: PlatformEvent,
    ) -> Option<ViewUpdate> {
        match event {
            PlatformEvent::WindowSizeChanged { width, height } => {
                Some(ViewUpdate::Metrics(ViewportMetrics::with_size(
                    f64::from(width),
                    f64::from(height),
                )))
            }
            PlatformEvent::MouseButton { button, action } => {
                let Some(mask) = 1i64.checked_shl(u32::from(button)) else {
                    warn!("ignoring mouse button {}", button);
                    return None;
                };
                let change = match action {
                    ButtonAction::Press => {
                        let change = if input.buttons == 0 {
                            input.tracking = true;
                            PointerChange::Down
                        } else {
                            PointerChange::Move
                        };
                        input.buttons |= mask;
                        change
                    }
                    ButtonAction::Release => {
                        input.buttons &= !mask;
                        if input.buttons == 0 {
                            input.tracking = false;
                            PointerChange::Up
                        } else {
                            PointerChange::Move
                        }
                    }
                };
                Some(ViewUpdate::Pointer(self.sample(input, change)))
            }
            PlatformEvent::CursorMoved { x, y } => {
                input.cursor = (x, y);
                if !input.tracking {
                    return None;
                }
                Some(ViewUpdate::Pointer(self.sample(input, PointerChange::Move)))
            }
            PlatformEvent::Key { .. } => None,
        }
    }

    fn sample(&self, input: &InputState, change: PointerChange) -> PointerData {
        let (x, y) = input.cursor;
        PointerData::mouse(
            micros_since(self.origin, Instant::now()),
            change,
            x,
            y,
            input.buttons,
        )
    }
}

fn flush_pointers(engine: &mut Engine, pending: &mut Vec<PointerData>) {
    if pending.is_empty() {
        return;
    }
    let packet = PointerDataPacket::new(std::mem::take(pending));
    engine.dispatch_pointer_data_packet(&packet);
}

impl PlatformEventSource {
    /// Queues `event` and schedules a pump on Platform. Returns `false` when
    /// the event was dropped.
    pub fn try_push(&self, event: PlatformEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("platform event queue full; dropping {:?}", event);
                return false;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }

        let Some(view) = self.view.upgrade() else {
            return false;
        };
        if view.pump_scheduled.swap(true, Ordering::AcqRel) {
            return true;
        }

        let pump_view = Arc::downgrade(&view);
        let posted = view.runners.platform().try_post(move || {
            if let Some(view) = pump_view.upgrade() {
                view.pump();
            }
        });
        if posted.is_err() {
            debug!("platform shut down; event will not be delivered");
            return false;
        }
        true
    }
}
