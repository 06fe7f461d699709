mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use ember::prelude::*;
use parking_lot::Mutex;
use support::{Observed, RecordingLogic};

#[derive(Default)]
struct CountingDecoder {
    calls: AtomicUsize,
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PngDecoder.decode(bytes)
    }
}

/// Blocks on IO until the test releases it.
struct GatedDecoder {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl ImageDecoder for GatedDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        let _ = self.gate.lock().recv_timeout(support::TIMEOUT);
        PngDecoder.decode(bytes)
    }
}

fn decode_on_create(journal: &support::Journal, bytes: Vec<u8>) -> RecordingLogic {
    let sink = journal.clone();
    let mut bytes = Some(bytes);
    RecordingLogic::new(journal).on_create(move |scope| {
        let Some(bytes) = bytes.take() else {
            return;
        };
        let done = sink.clone();
        scope.decode_image_from_list(bytes, move |scope, image| {
            assert_eq!(scope.runners().current(), Some(ExecutionContext::Ui));
            done.lock().push(Observed::Decoded(
                image.map(|image| (image.width(), image.height())),
            ));
        });
        sink.lock().push(Observed::Note("requested"));
    })
}

#[test]
fn empty_input_delivers_none_without_decoding() {
    let journal = support::journal();
    let decoder = Arc::new(CountingDecoder::default());
    let shell = support::shell(
        "decode-empty",
        ShellParts {
            decoder: decoder.clone(),
            ..ShellParts::default()
        },
    );

    shell.run_logic(decode_on_create(&journal, Vec::new()));
    support::settle(&shell);

    assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
    let journal = journal.lock();
    assert_eq!(
        &journal[journal.len() - 2..],
        [Observed::Note("requested"), Observed::Decoded(None)]
    );
}

#[test]
fn decoded_image_is_delivered_after_the_request_returns() {
    let journal = support::journal();
    let rgba = [10, 20, 30, 255, 40, 50, 60, 255, 70, 80, 90, 255];
    let bytes = support::encode_png(3, 1, &rgba);
    let shell = support::shell("decode-png", ShellParts::default());

    shell.run_logic(decode_on_create(&journal, bytes));
    support::settle(&shell);

    let journal = journal.lock();
    let requested = journal
        .iter()
        .position(|seen| *seen == Observed::Note("requested"));
    let decoded = journal
        .iter()
        .position(|seen| *seen == Observed::Decoded(Some((3, 1))));
    assert!(requested.is_some() && decoded.is_some());
    assert!(requested < decoded);
}

#[test]
fn garbage_input_delivers_none() {
    let journal = support::journal();
    let shell = support::shell("decode-garbage", ShellParts::default());

    shell.run_logic(decode_on_create(&journal, b"not an image".to_vec()));
    support::settle(&shell);

    assert_eq!(support::count(&journal, &Observed::Decoded(None)), 1);
}

#[test]
fn requester_torn_down_mid_decode_is_never_called_back() {
    let journal = support::journal();
    let (release, gate) = mpsc::channel();
    let shell = support::shell(
        "decode-teardown",
        ShellParts {
            decoder: Arc::new(GatedDecoder {
                gate: Mutex::new(gate),
            }),
            ..ShellParts::default()
        },
    );

    let bytes = support::encode_png(1, 1, &[1, 2, 3, 4]);
    shell.run_logic(decode_on_create(&journal, bytes));
    shell.flush(ExecutionContext::Ui);

    shell.shutdown_isolate();
    shell.flush(ExecutionContext::Ui);
    release.send(()).expect("release decoder");
    support::settle(&shell);

    assert!(
        !journal
            .lock()
            .iter()
            .any(|seen| matches!(seen, Observed::Decoded(_)))
    );
}

#[test]
fn replacement_isolate_does_not_receive_stale_results() {
    let journal = support::journal();
    let (release, gate) = mpsc::channel();
    let shell = support::shell(
        "decode-replace",
        ShellParts {
            decoder: Arc::new(GatedDecoder {
                gate: Mutex::new(gate),
            }),
            ..ShellParts::default()
        },
    );

    let bytes = support::encode_png(1, 1, &[1, 2, 3, 4]);
    shell.run_logic(decode_on_create(&journal, bytes));
    shell.flush(ExecutionContext::Ui);

    let second = support::journal();
    shell.run_logic(RecordingLogic::new(&second));
    shell.flush(ExecutionContext::Ui);
    release.send(()).expect("release decoder");
    support::settle(&shell);

    let ids = shell
        .with_engine(|engine| engine.isolate_id().map(|id| id.get()))
        .expect("engine");
    assert_eq!(ids, Some(2));
    assert_eq!(support::count(&journal, &Observed::Decoded(Some((1, 1)))), 0);
    assert_eq!(support::count(&second, &Observed::Decoded(Some((1, 1)))), 0);
}

#[test]
fn native_decode_wraps_the_image() {
    let journal = support::journal();
    let shell = support::shell("decode-native", ShellParts::default());
    let bytes = support::encode_png(2, 2, &[255; 16]);

    let sink = journal.clone();
    let mut bytes = Some(bytes);
    shell.run_logic(RecordingLogic::new(&journal).on_create(move |scope| {
        let Some(bytes) = bytes.take() else {
            return;
        };
        let sink = sink.clone();
        let result = scope.call_native(
            "decodeImageFromList",
            vec![
                NativeValue::Bytes(bytes),
                NativeValue::Closure(NativeClosure::new(move |_, value| {
                    let size = match value {
                        NativeValue::Image(image) => {
                            Some((image.width(), image.height()))
                        }
                        _ => None,
                    };
                    sink.lock().push(Observed::Decoded(size));
                })),
            ],
        );
        assert!(result.is_ok());
    }));
    support::settle(&shell);

    assert_eq!(support::count(&journal, &Observed::Decoded(Some((2, 2)))), 1);
}

/// Requests a decode for every platform message it receives.
struct DecodeOnMessage {
    journal: support::Journal,
    bytes: Vec<u8>,
}

impl LogicContext for DecodeOnMessage {
    fn on_platform_message(
        &mut self,
        scope: &mut WindowScope<'_>,
        _channel: &str,
        _data: &[u8],
        _handle: ResponseHandle,
    ) {
        let done = self.journal.clone();
        scope.decode_image_from_list(self.bytes.clone(), move |_, image| {
            done.lock().push(Observed::Decoded(
                image.map(|image| (image.width(), image.height())),
            ));
        });
        self.journal.lock().push(Observed::Note("requested"));
    }
}

#[test]
fn decode_requested_while_shutting_down_still_tears_the_isolate_down() {
    let journal = support::journal();
    let (event_tx, event_rx) = event_channel();
    let shell = support::shell(
        "decode-shutdown",
        ShellParts {
            events: Some(event_tx),
            ..ShellParts::default()
        },
    );
    shell.run_logic(DecodeOnMessage {
        journal: journal.clone(),
        bytes: support::encode_png(1, 1, &[1, 2, 3, 4]),
    });

    shell.runners().post(ExecutionContext::Ui, || {
        std::thread::sleep(std::time::Duration::from_millis(200));
    });
    shell.dispatch_platform_message(PlatformMessage::fire_and_forget(
        "ember/lifecycle",
        b"detached".to_vec(),
    ));
    shell.shutdown();

    assert_eq!(support::count(&journal, &Observed::Note("requested")), 1);
    assert!(
        event_rx
            .try_iter()
            .any(|event| matches!(event, EngineEvent::IsolateShutdown(_)))
    );
}
