use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};

use crate::isolate::IsolateId;

/// Lifecycle notifications published by the engine for observers such as the
/// shell binary or integration tests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineEvent {
    IsolateReady(IsolateId),
    FrameScheduled,
    FrameBegun(u64),
    FrameRasterized(u64),
    IsolateShutdown(IsolateId),
}

pub type EngineEventSender = Sender<EngineEvent>;
pub type EngineEventReceiver = Receiver<EngineEvent>;

pub fn event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::channel()
}

/// Sends to a dropped receiver are ignored; observers are optional.
pub(crate) fn emit(sender: Option<&EngineEventSender>, event: EngineEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}
