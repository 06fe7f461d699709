#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use ember::prelude::*;
use parking_lot::Mutex;

pub const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq)]
pub enum Observed {
    Created,
    Viewport(f64, f64),
    Message {
        channel: String,
        data: Vec<u8>,
        handle: ResponseHandle,
    },
    Pointer(Vec<PointerChange>),
    SemanticsAction(i32, SemanticsAction),
    Frame,
    Reply(Option<Vec<u8>>),
    Decoded(Option<(u32, u32)>),
    Note(&'static str),
}

pub type Journal = Arc<Mutex<Vec<Observed>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count(journal: &Journal, wanted: &Observed) -> usize {
    journal.lock().iter().filter(|seen| *seen == wanted).count()
}

type Hook = Box<dyn FnMut(&mut WindowScope<'_>) + Send>;

/// Logic context that journals every hook it receives.
pub struct RecordingLogic {
    journal: Journal,
    on_create: Option<Hook>,
    on_frame: Option<Hook>,
}

impl RecordingLogic {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            on_create: None,
            on_frame: None,
        }
    }

    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut WindowScope<'_>) + Send + 'static,
    {
        self.on_create = Some(Box::new(hook));
        self
    }

    pub fn on_frame<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut WindowScope<'_>) + Send + 'static,
    {
        self.on_frame = Some(Box::new(hook));
        self
    }
}

impl LogicContext for RecordingLogic {
    fn on_create(&mut self, scope: &mut WindowScope<'_>) {
        self.journal.lock().push(Observed::Created);
        if let Some(hook) = self.on_create.as_mut() {
            hook(scope);
        }
    }

    fn on_viewport_change(
        &mut self,
        _scope: &mut WindowScope<'_>,
        metrics: &ViewportMetrics,
    ) {
        self.journal.lock().push(Observed::Viewport(
            metrics.physical_width,
            metrics.physical_height,
        ));
    }

    fn on_platform_message(
        &mut self,
        _scope: &mut WindowScope<'_>,
        channel: &str,
        data: &[u8],
        handle: ResponseHandle,
    ) {
        self.journal.lock().push(Observed::Message {
            channel: channel.to_string(),
            data: data.to_vec(),
            handle,
        });
    }

    fn on_pointer_data_packet(
        &mut self,
        _scope: &mut WindowScope<'_>,
        packet: &PointerDataPacket,
    ) {
        let changes = packet.data().iter().map(|datum| datum.change).collect();
        self.journal.lock().push(Observed::Pointer(changes));
    }

    fn on_semantics_action(
        &mut self,
        _scope: &mut WindowScope<'_>,
        id: i32,
        action: SemanticsAction,
    ) {
        self.journal
            .lock()
            .push(Observed::SemanticsAction(id, action));
    }

    fn on_begin_frame(&mut self, scope: &mut WindowScope<'_>, _t: Instant) {
        self.journal.lock().push(Observed::Frame);
        if let Some(hook) = self.on_frame.as_mut() {
            hook(scope);
        }
    }
}

#[derive(Default)]
pub struct RecordingRasterizer {
    pub frames: Mutex<Vec<(u64, Option<ExecutionContext>)>>,
    pub runners: Mutex<Option<TaskRunners>>,
}

impl Rasterizer for RecordingRasterizer {
    fn draw(&self, frame: RasterFrame) {
        let context = self
            .runners
            .lock()
            .as_ref()
            .and_then(|runners| runners.current());
        self.frames.lock().push((frame.frame_number, context));
    }
}

/// Platform side that either answers every message with `reply` or holds
/// the messages for the test to answer later.
#[derive(Default)]
pub struct RecordingPlatform {
    pub reply: Option<Vec<u8>>,
    pub held: Mutex<Vec<PlatformMessage>>,
}

impl RecordingPlatform {
    pub fn replying(reply: &[u8]) -> Self {
        Self {
            reply: Some(reply.to_vec()),
            held: Mutex::new(Vec::new()),
        }
    }
}

impl PlatformDelegate for RecordingPlatform {
    fn handle_platform_message(&self, message: PlatformMessage) {
        match (&self.reply, message.response()) {
            (Some(reply), Some(response)) => response.complete(reply.clone()),
            _ => self.held.lock().push(message),
        }
    }
}

pub fn settings(prefix: &str) -> EngineSettings {
    EngineSettings {
        thread_prefix: prefix.to_string(),
        ..EngineSettings::default()
    }
}

pub fn shell(prefix: &str, parts: ShellParts) -> Shell {
    Shell::new(&settings(prefix), parts).expect("start shell")
}

/// Flushes every context a few times so short IO -> UI -> GPU chains finish.
pub fn settle(shell: &Shell) {
    for _ in 0..3 {
        for context in [
            ExecutionContext::Io,
            ExecutionContext::Platform,
            ExecutionContext::Ui,
            ExecutionContext::Gpu,
        ] {
            assert!(shell.flush(context), "flush {}", context);
        }
    }
}

pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("png header");
        writer.write_image_data(rgba).expect("png data");
    }
    bytes
}
